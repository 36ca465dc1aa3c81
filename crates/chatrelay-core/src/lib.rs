//! Chatrelay core — error taxonomy and environment configuration.

pub mod config;
pub mod error;

pub use config::{ProviderCredentials, RelayConfig};
pub use error::{Error, Result};
