//! Chat data model and streaming LLM providers (OpenAI/Gemini).
//!
//! Prompt construction is plain placeholder substitution; provider calls go
//! to external APIs and stream token fragments back in arrival order.

pub mod prompt;
pub mod providers;
pub mod template;
pub mod types;

pub use providers::{BoxedTokenStream, GenerationSettings, TextGenerationProvider, TokenChunk};
pub use types::{ChatMessage, ProviderKind, TurnRequest, STREAM_ERROR_SENTINEL};
