pub mod chat;
pub mod chat_stream;
pub mod embed;
pub mod knowledge;

use serde_json::Value;

use crate::core::ai::AiMessage;
use crate::core::ratelimit::RateLimiter;
use crate::http::error::ApiError;

/// Pulls `messages` out of a request body, rejecting anything that is not an
/// array of `{role, content}` objects.
pub(crate) fn parse_messages(body: &Value) -> Result<Vec<AiMessage>, ApiError> {
    let invalid = || ApiError::BadRequest {
        message: "Invalid message format".to_string(),
    };

    let messages = body.get("messages").and_then(Value::as_array).ok_or_else(invalid)?;
    serde_json::from_value(Value::Array(messages.clone())).map_err(|_| invalid())
}

/// Consumes one rate-limit slot, mapping a rejection to 429 with the
/// caller-supplied message built from the formatted wait time.
pub(crate) fn check_rate_limit(
    limiter: &RateLimiter,
    message: impl FnOnce(&str) -> String,
) -> Result<(), ApiError> {
    let decision = limiter.check();
    if decision.can_proceed {
        return Ok(());
    }

    let formatted = RateLimiter::format_time_to_wait(decision.time_to_wait);
    Err(ApiError::RateLimited {
        time_to_wait_ms: decision.time_to_wait.as_millis() as u64,
        message: message(&formatted),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_messages_accepts_role_content_array() {
        let body = json!({"messages": [{"role": "user", "content": "hi"}]});
        let messages = parse_messages(&body).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
    }

    #[test]
    fn test_parse_messages_rejects_missing_or_non_array() {
        assert!(parse_messages(&json!({})).is_err());
        assert!(parse_messages(&json!({"messages": "not an array"})).is_err());
        assert!(parse_messages(&json!({"messages": [{"role": 1}]})).is_err());
    }
}
