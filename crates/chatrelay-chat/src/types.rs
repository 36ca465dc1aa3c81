//! Wire types shared between the relay endpoints and the chat client.

use serde::{Deserialize, Serialize};

use chatrelay_core::{Error, Result};

/// First character of the final frame of an abnormally terminated stream.
/// The unit separator never occurs in model output, so a client seeing it
/// knows the turn was truncated; everything after it is the error text.
pub const STREAM_ERROR_SENTINEL: char = '\u{1F}';

/// Chat message in conversation history.
///
/// The client resends the full ordered transcript on every turn; the server
/// accumulates nothing between requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

/// Incoming relay request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TurnRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Base64 data URL of an uploaded document (document variant only).
    #[serde(default)]
    pub file: Option<String>,
    /// Declared MIME type of the uploaded document.
    #[serde(default, rename = "fileType")]
    pub file_type: Option<String>,
}

/// Upstream provider identifier, parsed from the `modelType` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Gemini,
}

impl ProviderKind {
    /// Provider used when the query parameter is absent.
    pub const DEFAULT: Self = Self::OpenAi;

    /// Parse the `modelType` selector. An absent or empty selector falls
    /// back to the default; unknown values are rejected here, before any
    /// upstream call is attempted.
    pub fn from_selector(selector: Option<&str>) -> Result<Self> {
        match selector {
            None | Some("") => Ok(Self::DEFAULT),
            Some("openai") => Ok(Self::OpenAi),
            Some("gemini") => Ok(Self::Gemini),
            Some(other) => Err(Error::UnsupportedModel(other.to_string())),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Gemini => write!(f, "gemini"),
        }
    }
}
