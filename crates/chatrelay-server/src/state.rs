//! Shared application state.

use chatrelay_core::RelayConfig;

/// State accessible from all route handlers.
///
/// The relay holds no cross-request mutable state; the only shared resource
/// is the outbound HTTP client, which pools connections internally. Provider
/// handles are still constructed per request (they are a clone of this
/// client plus a few strings).
pub struct AppState {
    pub config: RelayConfig,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}
