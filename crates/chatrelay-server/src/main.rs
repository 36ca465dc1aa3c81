//! chatrelay — streams LLM responses from hosted providers to browser
//! clients, one upstream call per request.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use chatrelay_server::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = chatrelay_core::RelayConfig::from_env()?;
    let port = config.port;

    if config.credentials.openai_api_key.is_none() && config.credentials.google_api_key.is_none() {
        tracing::warn!(
            "No provider credentials configured; every chat request will fail \
             until OPENAI_API_KEY or GOOGLE_GEN_AI_API_KEY is set"
        );
    }

    let state = Arc::new(AppState::new(config));
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("chatrelay listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
