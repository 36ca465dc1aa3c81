//! Error types for the chat relay.
//!
//! Everything in this taxonomy except `StreamInterrupted` occurs before any
//! response bytes are sent and can still become a JSON error envelope. A
//! `StreamInterrupted` happens after the client already holds a 200 status
//! and partial body, so it can only end the stream early.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unsupported model type: {0}")]
    UnsupportedModel(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Missing credential: {0} is not set")]
    MissingCredential(&'static str),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
