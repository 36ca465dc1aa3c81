//! Environment-driven configuration.
//!
//! Credentials are read once at startup but stay optional until a request
//! actually selects the provider that needs them: a relay with only an
//! OpenAI key configured still serves OpenAI traffic.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const GOOGLE_API_KEY_VAR: &str = "GOOGLE_GEN_AI_API_KEY";

const DEFAULT_PORT: u16 = 3000;

/// API credentials for the upstream providers, one env var per provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderCredentials {
    pub openai_api_key: Option<String>,
    pub google_api_key: Option<String>,
}

impl ProviderCredentials {
    /// Read credentials from the process environment.
    pub fn from_env() -> Self {
        Self {
            openai_api_key: non_empty_var(OPENAI_API_KEY_VAR),
            google_api_key: non_empty_var(GOOGLE_API_KEY_VAR),
        }
    }

    /// The OpenAI key, or `MissingCredential` when unset.
    pub fn require_openai(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .ok_or(Error::MissingCredential(OPENAI_API_KEY_VAR))
    }

    /// The Google Generative AI key, or `MissingCredential` when unset.
    pub fn require_google(&self) -> Result<&str> {
        self.google_api_key
            .as_deref()
            .ok_or(Error::MissingCredential(GOOGLE_API_KEY_VAR))
    }
}

/// Top-level relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// HTTP server port.
    pub port: u16,
    /// Upstream provider credentials.
    pub credentials: ProviderCredentials,
}

impl RelayConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env() -> Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("invalid PORT value: {raw}")))?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            port,
            credentials: ProviderCredentials::from_env(),
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_a_credential_error() {
        let creds = ProviderCredentials::default();
        assert!(matches!(
            creds.require_openai(),
            Err(Error::MissingCredential(OPENAI_API_KEY_VAR))
        ));
        assert!(matches!(
            creds.require_google(),
            Err(Error::MissingCredential(GOOGLE_API_KEY_VAR))
        ));
    }

    #[test]
    fn present_key_is_returned() {
        let creds = ProviderCredentials {
            openai_api_key: Some("sk-test".into()),
            google_api_key: None,
        };
        assert_eq!(creds.require_openai().unwrap(), "sk-test");
    }
}
