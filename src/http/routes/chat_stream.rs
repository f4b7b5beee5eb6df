// POST /api/chat/stream - SSE chat completion.
//
// Validation and rate limiting mirror /api/chat; after that point failures
// travel in-band as error frames so the client never sees a broken stream.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde_json::Value;

use crate::http::error::ApiError;
use crate::http::sse::sse_response;
use crate::http::state::AppState;

use super::{check_rate_limit, parse_messages};

pub async fn chat_stream(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let messages = parse_messages(&body)?;

    check_rate_limit(&state.limiter, |wait| {
        format!(
            "I need to rest for {wait}. This helps me stay within my free usage \
             limits. Please try again after that time."
        )
    })?;

    tracing::info!(count = messages.len(), "processing streaming chat request");

    let remaining = state.limiter.remaining_requests();
    let events = state.chat.stream(messages, remaining);
    Ok(sse_response(events, None))
}
