//! HTTP route wiring.

pub mod relay;

use std::sync::Arc;

use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::state::AppState;
use crate::variants;

/// Build the main Axum router: one POST route per chat variant, all served
/// by the same parameterized relay handler.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    let mut router = Router::new();
    for &variant in variants::ALL {
        router = router.route(
            &format!("/chat/{}", variant.name),
            post(move |state, query, body| relay::handle(variant, state, query, body)),
        );
    }
    router
}
