// =============================================================================
// SSE FRAMING - ChatEvent to text/event-stream
// =============================================================================
//
// Widget clients parse exactly two frame shapes plus the terminal sentinel:
//
//   data: {"text":"..."}\n\n
//   data: {"error":true,"message":"..."}\n\n
//   data: [DONE]\n\n
//
// Resource blocks and quota warnings travel as ordinary text frames, so the
// client needs no extra handling for them.

use std::convert::Infallible;

use axum::body::Body;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use futures::{Stream, StreamExt};
use serde_json::json;

use crate::core::chat::ChatEvent;

/// Renders one event as a complete SSE frame, trailing blank line included.
pub fn frame(event: &ChatEvent) -> String {
    match event {
        ChatEvent::TextDelta(text) | ChatEvent::ResourceBlock(text) | ChatEvent::Warning(text) => {
            format!("data: {}\n\n", json!({ "text": text }))
        }
        ChatEvent::Error { message } => {
            format!("data: {}\n\n", json!({ "error": true, "message": message }))
        }
        ChatEvent::Done => "data: [DONE]\n\n".to_string(),
    }
}

/// Wraps a chat event stream as a streaming SSE response. When `origin` is
/// set the embed CORS headers are attached as well.
pub fn sse_response(
    events: impl Stream<Item = ChatEvent> + Send + 'static,
    origin: Option<String>,
) -> Response {
    let body = Body::from_stream(events.map(|event| Ok::<_, Infallible>(frame(&event))));

    let mut response = (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache, no-transform"),
            (header::CONNECTION, "keep-alive"),
        ],
        body,
    )
        .into_response();

    if let Some(origin) = origin {
        let headers = response.headers_mut();
        if let Ok(value) = origin.parse() {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            header::HeaderValue::from_static("POST"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            header::HeaderValue::from_static("Content-Type"),
        );
    }

    response
}
