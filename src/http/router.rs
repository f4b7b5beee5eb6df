// =============================================================================
// ROUTER - HTTP route table
// =============================================================================

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::http::routes::{chat, chat_stream, embed, knowledge};
use crate::http::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    // The config and script endpoints are meant to be fetched from any page
    // that embeds the widget, so they get an open CORS policy. The streaming
    // endpoint enforces its own origin allow-list instead.
    let public = Router::new()
        .route("/api/embed/config", get(embed::config))
        .route("/embed.js", get(embed::script))
        .layer(CorsLayer::permissive());

    Router::new()
        .route("/api/chat", post(chat::chat))
        .route("/api/chat/stream", post(chat_stream::chat_stream))
        .route(
            "/api/embed/stream",
            post(embed::stream).options(embed::preflight),
        )
        .route(
            "/api/knowledge",
            get(knowledge::initialize)
                .post(knowledge::update)
                .options(knowledge::list),
        )
        .merge(public)
        .with_state(state)
}
