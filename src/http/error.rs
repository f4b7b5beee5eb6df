// =============================================================================
// API ERROR - HTTP error mapping
// =============================================================================
//
// All chat/embed handlers funnel failures through this enum. The wire shape
// is `{error, message}` plus `timeToWait` (milliseconds) for rate limiting.
// Upstream/internal details are logged server-side; clients only ever see
// the apologetic generic text.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request format")]
    BadRequest { message: String },

    #[error("Invalid embed key")]
    Unauthorized { message: String },

    #[error("Unauthorized origin")]
    Forbidden { message: String },

    #[error("Rate limit exceeded")]
    RateLimited { time_to_wait_ms: u64, message: String },

    #[error("Failed to get response from AI")]
    Upstream { detail: String },

    #[error("Internal server error")]
    Internal { detail: String },
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream { .. } | ApiError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn client_message(&self) -> String {
        match self {
            ApiError::BadRequest { message }
            | ApiError::Unauthorized { message }
            | ApiError::Forbidden { message }
            | ApiError::RateLimited { message, .. } => message.clone(),
            ApiError::Upstream { .. } => {
                "I encountered an error while processing your request. Please try again."
                    .to_string()
            }
            ApiError::Internal { .. } => {
                "Something went wrong. Please try again later.".to_string()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Upstream { detail } => tracing::error!("upstream failure: {detail}"),
            ApiError::Internal { detail } => tracing::error!("internal error: {detail}"),
            _ => {}
        }

        let mut body = json!({
            "error": self.to_string(),
            "message": self.client_message(),
        });
        if let ApiError::RateLimited { time_to_wait_ms, .. } = &self {
            body["timeToWait"] = json!(time_to_wait_ms);
        }

        (self.status(), Json(body)).into_response()
    }
}
