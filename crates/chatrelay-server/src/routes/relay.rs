//! The streaming relay handler — one parameterized handler for all chat
//! endpoint variants.
//!
//! Everything that can fail is attempted before the first response byte is
//! written, so upfront failures become a single JSON error envelope. Once
//! streaming has begun the 200 status is already on the wire; a mid-stream
//! provider failure can only end the body early, preceded by a sentinel
//! frame (U+001F plus the error text) so clients can detect truncation.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::Stream;
use serde::Deserialize;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use chatrelay_chat::{
    prompt, providers, template, BoxedTokenStream, ProviderKind, TokenChunk, TurnRequest,
    STREAM_ERROR_SENTINEL,
};
use chatrelay_core::Result;

use crate::state::AppState;
use crate::variants::ChatVariant;

#[derive(Debug, Default, Deserialize)]
pub struct RelayParams {
    #[serde(rename = "modelType")]
    pub model_type: Option<String>,
}

pub async fn handle(
    variant: &'static ChatVariant,
    State(state): State<Arc<AppState>>,
    Query(params): Query<RelayParams>,
    Json(req): Json<TurnRequest>,
) -> Response {
    match start_stream(variant, &state, &params, &req) {
        Ok(tokens) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(Body::from_stream(text_stream(tokens)))
            // Infallible: the status and header are statically valid.
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Err(e) => {
            warn!("Relay request to /chat/{} failed: {}", variant.name, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Validate the request, assemble the prompt, and open the upstream stream.
/// Nothing here writes to the client connection.
fn start_stream(
    variant: &'static ChatVariant,
    state: &AppState,
    params: &RelayParams,
    req: &TurnRequest,
) -> Result<BoxedTokenStream> {
    let (history, current) = prompt::split_turn(&req.messages)?;
    let chat_history = prompt::format_history(history);

    let context = if variant.uses_document {
        Some(document_context(req)?)
    } else {
        None
    };

    let kind = variant.resolve_provider(params.model_type.as_deref())?;
    let rendered = render_prompt(variant, &chat_history, &current.content, context.as_deref(), kind);

    debug!(
        "Relaying /chat/{} turn via {} ({} history messages)",
        variant.name,
        kind,
        history.len(),
    );

    let provider = providers::build(
        kind,
        variant.settings_for(kind),
        &state.config.credentials,
        &state.http,
    )?;

    Ok(provider.stream_generate(rendered))
}

/// Decode and extract the uploaded document into one flattened context string.
fn document_context(req: &TurnRequest) -> Result<String> {
    let file = req.file.as_deref().ok_or_else(|| {
        chatrelay_core::Error::BadRequest("file is required for this endpoint".into())
    })?;
    let mime = req.file_type.as_deref().ok_or_else(|| {
        chatrelay_core::Error::BadRequest("fileType is required for this endpoint".into())
    })?;

    let bytes = chatrelay_extract::decode_base64_file(file)?;
    let segments = chatrelay_extract::extract_segments(&bytes, mime)?;
    Ok(chatrelay_extract::flatten_segments(&segments))
}

/// Fill the variant template. All placeholder names used across the variants
/// are always offered; templates pick the ones they mention.
fn render_prompt(
    variant: &ChatVariant,
    chat_history: &str,
    current: &str,
    context: Option<&str>,
    kind: ProviderKind,
) -> String {
    let model = kind.to_string();
    template::fill(
        variant.template,
        &[
            ("message", current),
            ("input", current),
            ("question", current),
            ("chat_history", chat_history),
            ("context", context.unwrap_or_default()),
            ("model", &model),
        ],
    )
}

/// Forward provider fragments to the client as chunked body bytes, in
/// arrival order and without buffering. `Done` ends the body; `Error`
/// appends the sentinel frame and ends it.
fn text_stream(
    mut tokens: BoxedTokenStream,
) -> impl Stream<Item = std::result::Result<Bytes, Infallible>> {
    async_stream::stream! {
        while let Some(chunk) = tokens.next().await {
            match chunk {
                TokenChunk::Text(text) => {
                    yield Ok(Bytes::from(text));
                }
                TokenChunk::Done => {
                    return;
                }
                TokenChunk::Error(message) => {
                    warn!("Upstream stream interrupted: {}", message);
                    yield Ok(Bytes::from(format!("{STREAM_ERROR_SENTINEL}{message}")));
                    return;
                }
            }
        }
    }
}
