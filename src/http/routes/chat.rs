// POST /api/chat - single-shot chat completion.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::core::chat::low_quota_note;
use crate::http::error::ApiError;
use crate::http::state::AppState;

use super::{check_rate_limit, parse_messages};

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let messages = parse_messages(&body)?;
    let data_collection = body
        .get("dataCollectionEnabled")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    check_rate_limit(&state.limiter, |wait| {
        format!(
            "I need to rest for {wait}. This helps me stay within my free usage \
             limits. Please try again after that time."
        )
    })?;

    tracing::info!(
        count = messages.len(),
        data_collection,
        "processing chat request"
    );

    let mut response = state
        .chat
        .respond(&messages)
        .await
        .map_err(|err| ApiError::Upstream {
            detail: err.to_string(),
        })?;

    let remaining = state.limiter.remaining_requests();
    if let Some(note) = low_quota_note(remaining) {
        response.push_str(&note);
    }

    Ok(Json(json!({
        "response": response,
        "remainingRequests": remaining,
        "dataCollected": data_collection,
    })))
}

#[cfg(test)]
mod tests {
    use std::error::Error;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::core::ai::{AiConfig, AiMessage, AiProvider, ContentExtractor, EmbeddingProvider, TokenStream};
    use crate::core::chat::{ChatService, KeywordSignalDetector, DEFAULT_SYSTEM_PROMPT};
    use crate::core::rag::{
        ChunkingConfig, DocChunk, KnowledgeAccess, KnowledgeService, LinearScanIndex, SearchConfig,
    };
    use crate::core::rag::knowledge_service::test_support::{StubEmbedder, StubExtractor};
    use crate::core::ratelimit::{RateLimitConfig, RateLimiter};
    use crate::http::router::build_router;
    use crate::http::state::{AppSettings, Environment};
    use crate::infra::uploads::DiskUploadStore;

    struct CannedProvider(&'static str);

    #[async_trait]
    impl AiProvider for CannedProvider {
        async fn chat_complete(
            &self,
            _messages: &[AiMessage],
            _config: &AiConfig,
        ) -> Result<String, Box<dyn Error + Send + Sync>> {
            Ok(self.0.to_string())
        }

        async fn chat_stream(
            &self,
            _messages: &[AiMessage],
            _config: &AiConfig,
        ) -> Result<TokenStream, Box<dyn Error + Send + Sync>> {
            Ok(Box::pin(futures::stream::empty()))
        }
    }

    struct NullKnowledge;

    #[async_trait]
    impl KnowledgeAccess for NullKnowledge {
        async fn enhance_prompt(&self, query: &str) -> String {
            query.to_string()
        }

        async fn query(&self, _text: &str, _k: usize) -> Vec<DocChunk> {
            Vec::new()
        }
    }

    fn test_state(max_requests: u32) -> Arc<AppState> {
        let chat = Arc::new(ChatService::new(
            Arc::new(CannedProvider(
                "Broadband is a fast, always-on internet connection.",
            )) as Arc<dyn AiProvider>,
            AiConfig::default(),
            DEFAULT_SYSTEM_PROMPT.to_string(),
            Arc::new(NullKnowledge),
            Box::new(KeywordSignalDetector),
        ));

        // Not exercised by the chat routes; present only to satisfy AppState.
        let knowledge = Arc::new(KnowledgeService::new(
            Arc::new(StubEmbedder { vector: None }) as Arc<dyn EmbeddingProvider>,
            Arc::new(StubExtractor {
                text: String::new(),
            }) as Arc<dyn ContentExtractor>,
            DiskUploadStore::new(std::env::temp_dir().join("navigator-chat-route-tests")),
            Box::new(LinearScanIndex::new()),
            ChunkingConfig::default(),
            SearchConfig::default(),
        ));

        let limiter = Arc::new(RateLimiter::new(RateLimitConfig {
            window: Duration::from_millis(60 * 60 * 1000),
            max_requests,
        }));

        Arc::new(AppState {
            chat,
            knowledge,
            limiter,
            settings: AppSettings {
                environment: Environment::Development,
                port: 3000,
                embed_api_key: "test-key".to_string(),
                public_base_url: "http://localhost:3000".to_string(),
            },
        })
    }

    fn chat_request() -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "messages": [{"role": "user", "content": "What is broadband?"}]
                })
                .to_string(),
            ))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_chat_returns_response_envelope() {
        let app = build_router(test_state(60));

        let response = app.oneshot(chat_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let text = body["response"].as_str().unwrap();
        assert!(text.contains("Broadband is a fast"));
        assert!(body["remainingRequests"].as_u64().unwrap() <= 60);
        assert_eq!(body["dataCollected"], json!(false));
    }

    #[tokio::test]
    async fn test_chat_over_limit_returns_429_with_time_to_wait() {
        let app = build_router(test_state(1));

        let first = app.clone().oneshot(chat_request()).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app.oneshot(chat_request()).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        let body = body_json(second).await;
        assert!(body["timeToWait"].as_u64().unwrap() > 0);
        assert!(body["message"].as_str().unwrap().contains("I need to rest"));
    }

    #[tokio::test]
    async fn test_chat_rejects_malformed_body() {
        let app = build_router(test_state(60));

        let request = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(json!({"messages": "nope"}).to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
