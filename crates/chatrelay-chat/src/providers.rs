//! External LLM provider streaming implementations.
//!
//! Both providers stream tokens via SSE from their respective APIs. OpenAI
//! uses the chat-completions delta format with a `[DONE]` marker; Gemini uses
//! `streamGenerateContent` with `alt=sse` and JSON-only events.

use std::pin::Pin;

use futures::Stream;
use reqwest::Client;
use serde_json::json;
use tokio_stream::StreamExt;
use tracing::debug;

use chatrelay_core::{ProviderCredentials, Result};

use crate::types::ProviderKind;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Boxed stream type for returning different stream implementations.
pub type BoxedTokenStream = Pin<Box<dyn Stream<Item = TokenChunk> + Send>>;

/// A single streamed fragment, clean termination, or mid-stream failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenChunk {
    Text(String),
    Done,
    Error(String),
}

/// Sampling settings bound to an endpoint variant at request time.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f64,
}

/// A hosted text-generation model reachable in streaming mode.
///
/// Adding a provider means adding an implementation and a `build` arm, not
/// growing a switch inside the relay.
pub trait TextGenerationProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Start streaming a completion for one rendered prompt. The returned
    /// sequence is ordered and finite; it ends with `Done` on success or
    /// `Error` on failure, never both.
    fn stream_generate(&self, prompt: String) -> BoxedTokenStream;
}

/// Construct a provider handle for one request.
///
/// Handles are deliberately per-request (cheap: they hold a clone of the
/// shared HTTP client plus strings); connection pooling lives inside
/// `reqwest::Client`.
pub fn build(
    kind: ProviderKind,
    settings: GenerationSettings,
    credentials: &ProviderCredentials,
    http: &Client,
) -> Result<Box<dyn TextGenerationProvider>> {
    match kind {
        ProviderKind::OpenAi => Ok(Box::new(OpenAiProvider {
            http: http.clone(),
            api_key: credentials.require_openai()?.to_string(),
            settings,
        })),
        ProviderKind::Gemini => Ok(Box::new(GeminiProvider {
            http: http.clone(),
            api_key: credentials.require_google()?.to_string(),
            settings,
        })),
    }
}

// ---------------------------------------------------------------
// OpenAI
// ---------------------------------------------------------------

pub struct OpenAiProvider {
    http: Client,
    api_key: String,
    settings: GenerationSettings,
}

impl TextGenerationProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn stream_generate(&self, prompt: String) -> BoxedTokenStream {
        let http = self.http.clone();
        let api_key = self.api_key.clone();
        let settings = self.settings.clone();

        Box::pin(async_stream::stream! {
            let body = json!({
                "model": settings.model,
                "messages": [{"role": "user", "content": prompt}],
                "temperature": settings.temperature,
                "stream": true,
            });

            debug!("Streaming from OpenAI with model {}", settings.model);

            let response = match http
                .post(OPENAI_CHAT_URL)
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    yield TokenChunk::Error(format!("Request failed: {}", e));
                    return;
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                yield TokenChunk::Error(format!("API error {}: {}", status, body));
                return;
            }

            let mut stream = response.bytes_stream();
            let mut lines = LineBuffer::new();

            while let Some(chunk) = stream.next().await {
                let bytes = match chunk {
                    Ok(b) => b,
                    Err(e) => {
                        yield TokenChunk::Error(format!("Stream read error: {}", e));
                        return;
                    }
                };

                for line in lines.push(&bytes) {
                    let Some(data) = sse_data(&line) else { continue };

                    if data.trim() == "[DONE]" {
                        yield TokenChunk::Done;
                        return;
                    }

                    if let Some(content) = openai_delta(data) {
                        yield TokenChunk::Text(content);
                    }
                }
            }

            yield TokenChunk::Done;
        })
    }
}

/// Extract the delta content from one OpenAI SSE data payload.
fn openai_delta(data: &str) -> Option<String> {
    let parsed: serde_json::Value = serde_json::from_str(data).ok()?;
    let content = parsed["choices"][0]["delta"]["content"].as_str()?;
    if content.is_empty() {
        None
    } else {
        Some(content.to_string())
    }
}

// ---------------------------------------------------------------
// Gemini
// ---------------------------------------------------------------

pub struct GeminiProvider {
    http: Client,
    api_key: String,
    settings: GenerationSettings,
}

impl TextGenerationProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn stream_generate(&self, prompt: String) -> BoxedTokenStream {
        let http = self.http.clone();
        let api_key = self.api_key.clone();
        let settings = self.settings.clone();

        Box::pin(async_stream::stream! {
            // alt=sse turns the default JSON-array response into SSE events.
            let url = format!(
                "{}/{}:streamGenerateContent?alt=sse&key={}",
                GEMINI_API_BASE, settings.model, api_key,
            );

            let body = json!({
                "contents": [{"role": "user", "parts": [{"text": prompt}]}],
                "generationConfig": {"temperature": settings.temperature},
            });

            debug!("Streaming from Gemini with model {}", settings.model);

            let response = match http
                .post(&url)
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    yield TokenChunk::Error(format!("Request failed: {}", e));
                    return;
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                yield TokenChunk::Error(format!("API error {}: {}", status, body));
                return;
            }

            let mut stream = response.bytes_stream();
            let mut lines = LineBuffer::new();

            while let Some(chunk) = stream.next().await {
                let bytes = match chunk {
                    Ok(b) => b,
                    Err(e) => {
                        yield TokenChunk::Error(format!("Stream read error: {}", e));
                        return;
                    }
                };

                for line in lines.push(&bytes) {
                    let Some(data) = sse_data(&line) else { continue };

                    if let Some(text) = gemini_text(data) {
                        yield TokenChunk::Text(text);
                    }
                }
            }

            // Gemini has no [DONE] marker; the event stream simply ends.
            yield TokenChunk::Done;
        })
    }
}

/// Concatenate the text parts of the first candidate in one Gemini SSE
/// payload. Events without text (safety metadata, usage) yield nothing.
fn gemini_text(data: &str) -> Option<String> {
    let parsed: serde_json::Value = serde_json::from_str(data).ok()?;
    let parts = parsed["candidates"][0]["content"]["parts"].as_array()?;

    let mut out = String::new();
    for part in parts {
        if let Some(text) = part["text"].as_str() {
            out.push_str(text);
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

// ---------------------------------------------------------------
// SSE line handling
// ---------------------------------------------------------------

/// Accumulates raw network bytes and drains complete, trimmed lines.
///
/// Buffering stays in bytes: a multi-byte UTF-8 character can arrive split
/// across two network chunks, so decoding happens only once a newline has
/// closed the line.
struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Append a chunk and return every complete line it closed, in order.
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(line_end) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=line_end).collect();
            lines.push(String::from_utf8_lossy(&line).trim().to_string());
        }
        lines
    }
}

/// The payload of a `data:` SSE line; comments and other fields are skipped.
fn sse_data(line: &str) -> Option<&str> {
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    let rest = line.strip_prefix("data:")?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_buffer_splits_across_chunks() {
        let mut buf = LineBuffer::new();
        assert!(buf.push(b"data: par").is_empty());
        let lines = buf.push(b"tial\ndata: next\n");
        assert_eq!(lines, vec!["data: partial", "data: next"]);
    }

    #[test]
    fn line_buffer_preserves_order() {
        let mut buf = LineBuffer::new();
        let lines = buf.push(b"a\nb\nc\n");
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[test]
    fn line_buffer_reassembles_multibyte_utf8_split_across_chunks() {
        // "café" with the é split mid-sequence between two network reads.
        let mut buf = LineBuffer::new();
        assert!(buf.push(b"data: caf\xc3").is_empty());
        let lines = buf.push(b"\xa9\n");
        assert_eq!(lines, vec!["data: café"]);
    }

    #[test]
    fn sse_data_strips_prefix_and_skips_comments() {
        assert_eq!(sse_data("data: {\"x\":1}"), Some("{\"x\":1}"));
        assert_eq!(sse_data("data:{\"x\":1}"), Some("{\"x\":1}"));
        assert_eq!(sse_data(": keepalive"), None);
        assert_eq!(sse_data("event: ping"), None);
        assert_eq!(sse_data(""), None);
    }

    #[test]
    fn openai_delta_extracts_content() {
        let data = r#"{"choices":[{"delta":{"content":"Hel"}}]}"#;
        assert_eq!(openai_delta(data), Some("Hel".to_string()));
    }

    #[test]
    fn openai_delta_skips_role_and_empty_chunks() {
        assert_eq!(openai_delta(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#), None);
        assert_eq!(openai_delta(r#"{"choices":[{"delta":{"content":""}}]}"#), None);
        assert_eq!(openai_delta("not json"), None);
    }

    #[test]
    fn gemini_text_concatenates_parts() {
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"there"}]}}]}"#;
        assert_eq!(gemini_text(data), Some("Hello there".to_string()));
    }

    #[test]
    fn gemini_text_skips_metadata_events() {
        let data = r#"{"candidates":[{"finishReason":"STOP"}]}"#;
        assert_eq!(gemini_text(data), None);
    }

    #[test]
    fn build_requires_a_credential() {
        let creds = ProviderCredentials::default();
        let http = Client::new();
        let settings = GenerationSettings {
            model: "gpt-4o-mini".into(),
            temperature: 0.8,
        };
        let err = build(ProviderKind::OpenAi, settings, &creds, &http)
            .err()
            .unwrap();
        assert!(matches!(err, chatrelay_core::Error::MissingCredential(_)));
    }

    #[test]
    fn build_returns_the_selected_provider() {
        let creds = ProviderCredentials {
            openai_api_key: Some("sk-test".into()),
            google_api_key: Some("g-test".into()),
        };
        let http = Client::new();
        let settings = GenerationSettings {
            model: "gemini-1.5-flash".into(),
            temperature: 0.8,
        };
        let provider =
            build(ProviderKind::Gemini, settings, &creds, &http).unwrap();
        assert_eq!(provider.name(), "gemini");
    }
}
