// This is the entry point of the Digital Navigator service.
//
// **Architecture Overview:**
// - `core/` = Business logic (transport-agnostic)
// - `infra/` = Implementations of core traits (Gemini API, disk storage)
// - `http/` = Axum server surface (routes, SSE framing, error envelopes)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Build the router and start the server

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "http/http_layer.rs"]
mod http;
#[path = "infra/infra_layer.rs"]
mod infra;

use std::sync::Arc;

use crate::core::ai::{AiConfig, AiProvider, ContentExtractor, EmbeddingProvider};
use crate::core::chat::{ChatService, KeywordSignalDetector, DEFAULT_SYSTEM_PROMPT};
use crate::core::rag::{ChunkingConfig, KnowledgeAccess, KnowledgeService, LinearScanIndex, SearchConfig};
use crate::core::ratelimit::{RateLimitConfig, RateLimiter};
use crate::http::router::build_router;
use crate::http::state::{AppSettings, AppState, Environment};
use crate::infra::ai::GeminiClient;
use crate::infra::uploads::DiskUploadStore;

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let gemini_api_key = std::env::var("GEMINI_API_KEY")
        .expect("Missing GEMINI_API_KEY environment variable! Create a .env file with your key.");

    let environment = Environment::from_env_value(
        &std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
    );
    let port = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(3000);
    let embed_api_key = std::env::var("EMBED_API_KEY").unwrap_or_default();
    if embed_api_key.is_empty() {
        tracing::warn!("EMBED_API_KEY is not set; the embed widget endpoint will reject all keys");
    }
    let public_base_url = std::env::var("PUBLIC_BASE_URL")
        .unwrap_or_else(|_| format!("http://localhost:{port}"));
    let uploads_dir = std::env::var("UPLOADS_DIR").unwrap_or_else(|_| "uploads".to_string());

    // An operator can swap the persona without recompiling.
    let system_prompt = if let Ok(path) = std::env::var("SYSTEM_PROMPT_FILE") {
        std::fs::read_to_string(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to read system prompt file at {}: {}", path, e);
            DEFAULT_SYSTEM_PROMPT.to_string()
        })
    } else {
        DEFAULT_SYSTEM_PROMPT.to_string()
    };

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let gemini = Arc::new(GeminiClient::new(gemini_api_key));

    let knowledge = Arc::new(KnowledgeService::new(
        Arc::clone(&gemini) as Arc<dyn EmbeddingProvider>,
        Arc::clone(&gemini) as Arc<dyn ContentExtractor>,
        DiskUploadStore::new(&uploads_dir),
        Box::new(LinearScanIndex::new()),
        ChunkingConfig::default(),
        SearchConfig::default(),
    ));

    let chat = Arc::new(ChatService::new(
        Arc::clone(&gemini) as Arc<dyn AiProvider>,
        AiConfig::default(),
        system_prompt,
        Arc::clone(&knowledge) as Arc<dyn KnowledgeAccess>,
        Box::new(KeywordSignalDetector),
    ));

    let limiter = Arc::new(RateLimiter::new(RateLimitConfig::default()));

    let settings = AppSettings {
        environment,
        port,
        embed_api_key,
        public_base_url,
    };

    // Seed the knowledge base up front so the first query already has
    // context. Failures are non-fatal; /api/knowledge can retry later.
    if let Err(err) = knowledge.initialize().await {
        tracing::warn!("initial knowledge base load failed: {err}");
    }

    let state = Arc::new(AppState {
        chat,
        knowledge,
        limiter,
        settings,
    });

    // ========================================================================
    // SERVER SETUP
    // ========================================================================

    let app = build_router(Arc::clone(&state));

    let addr = state.settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind server address");

    tracing::info!(%addr, env = ?state.settings.environment, "Digital Navigator is ready");

    axum::serve(listener, app)
        .await
        .expect("Error running server");
}
