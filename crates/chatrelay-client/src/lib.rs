//! Chat client for the relay.
//!
//! One `ChatSession` is one conversation. Each turn moves through
//! Idle → Awaiting (request in flight) → Streaming (fragments arriving,
//! appended to the trailing assistant message) → Idle. Errors while
//! awaiting or streaming return the session to Idle and keep whatever
//! assistant text already arrived; nothing is rolled back.

use serde_json::json;
use tokio_stream::StreamExt;
use tracing::debug;

use chatrelay_chat::{ChatMessage, STREAM_ERROR_SENTINEL};
use chatrelay_core::{Error, Result};

/// Per-conversation request state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Awaiting,
    Streaming,
}

/// How a completed turn ended. `Truncated` means the relay appended the
/// error sentinel before closing the stream; the partial text stays in the
/// transcript and the caller may offer a retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Complete,
    Truncated { error: String },
}

/// An uploaded document, already encoded as a base64 data URL. Client-only
/// state; it never outlives a variant switch.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub data_url: String,
    pub mime: String,
}

pub struct ChatSession {
    http: reqwest::Client,
    base_url: String,
    variant: String,
    model_type: Option<String>,
    attachment: Option<Attachment>,
    transcript: Vec<ChatMessage>,
    phase: Phase,
}

impl ChatSession {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            variant: variant.into(),
            model_type: None,
            attachment: None,
            transcript: Vec::new(),
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    /// Switch the active endpoint variant. File selection is reset whenever
    /// the variant changes.
    pub fn select_variant(&mut self, variant: impl Into<String>) {
        let variant = variant.into();
        if variant != self.variant {
            self.variant = variant;
            self.attachment = None;
        }
    }

    /// Set the `modelType` selector sent with each turn (None = server
    /// default).
    pub fn set_model_type(&mut self, model_type: Option<String>) {
        self.model_type = model_type;
    }

    pub fn set_attachment(&mut self, attachment: Option<Attachment>) {
        self.attachment = attachment;
    }

    /// Send one user turn and stream the reply into the transcript.
    pub async fn send(&mut self, content: impl Into<String>) -> Result<TurnOutcome> {
        self.send_with(content, |_| {}).await
    }

    /// Like [`send`](Self::send), invoking `on_delta` for each fragment as
    /// it arrives so a UI can render incrementally.
    pub async fn send_with(
        &mut self,
        content: impl Into<String>,
        mut on_delta: impl FnMut(&str),
    ) -> Result<TurnOutcome> {
        if self.phase != Phase::Idle {
            return Err(Error::BadRequest("a request is already in flight".into()));
        }

        self.transcript.push(ChatMessage::user(content.into()));
        self.phase = Phase::Awaiting;

        let result = self.stream_turn(&mut on_delta).await;

        // Back to Idle on every exit path; partial assistant text stays.
        self.phase = Phase::Idle;
        result
    }

    async fn stream_turn(&mut self, on_delta: &mut impl FnMut(&str)) -> Result<TurnOutcome> {
        let mut url = format!("{}/api/chat/{}", self.base_url, self.variant);
        if let Some(model_type) = &self.model_type {
            url.push_str("?modelType=");
            url.push_str(model_type);
        }

        let mut body = json!({ "messages": self.transcript });
        if let Some(attachment) = &self.attachment {
            body["file"] = json!(attachment.data_url);
            body["fileType"] = json!(attachment.mime);
        }

        debug!("Sending turn to {}", url);

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v["error"].as_str().map(String::from))
                .unwrap_or(text);
            return Err(Error::Provider(format!("relay error {status}: {message}")));
        }

        self.transcript.push(ChatMessage::assistant(""));

        let mut stream = response.bytes_stream();
        let mut scanner = BodyScanner::new();
        let mut decoder = Utf8Decoder::new();

        while let Some(chunk) = stream.next().await {
            let bytes =
                chunk.map_err(|e| Error::StreamInterrupted(format!("stream read error: {e}")))?;
            self.phase = Phase::Streaming;

            let text = decoder.push(&bytes);
            let visible = scanner.push(&text);
            if !visible.is_empty() {
                self.append_assistant_delta(visible);
                on_delta(visible);
            }
        }

        Ok(scanner.outcome())
    }

    fn append_assistant_delta(&mut self, delta: &str) {
        if let Some(last) = self.transcript.last_mut() {
            last.content.push_str(delta);
        }
    }
}

/// Incremental UTF-8 decoder: a multi-byte character can be split across
/// two network chunks, so an incomplete trailing sequence is held back
/// until the next chunk completes it. Truly invalid bytes become U+FFFD.
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    // The prefix is valid, so this decode is lossless.
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(len) => {
                            out.push('\u{FFFD}');
                            self.pending.drain(..valid + len);
                        }
                        None => {
                            // Incomplete trailing sequence: keep for later.
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }
        out
    }
}

/// Incremental decoder for a relay response body: splits visible text from
/// the error-sentinel frame, which may itself span several network chunks.
struct BodyScanner {
    truncation: Option<String>,
}

impl BodyScanner {
    fn new() -> Self {
        Self { truncation: None }
    }

    /// Feed one chunk; returns the portion that belongs in the transcript.
    fn push<'a>(&mut self, chunk: &'a str) -> &'a str {
        if let Some(error) = &mut self.truncation {
            error.push_str(chunk);
            return "";
        }

        match chunk.find(STREAM_ERROR_SENTINEL) {
            Some(pos) => {
                let after = &chunk[pos + STREAM_ERROR_SENTINEL.len_utf8()..];
                self.truncation = Some(after.to_string());
                &chunk[..pos]
            }
            None => chunk,
        }
    }

    fn outcome(self) -> TurnOutcome {
        match self.truncation {
            Some(error) => TurnOutcome::Truncated { error },
            None => TurnOutcome::Complete,
        }
    }
}
