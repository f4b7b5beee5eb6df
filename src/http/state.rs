// =============================================================================
// APP STATE - Shared services injected into every handler
// =============================================================================

use std::sync::Arc;

use crate::core::ai::{AiProvider, ContentExtractor, EmbeddingProvider};
use crate::core::chat::ChatService;
use crate::core::rag::KnowledgeService;
use crate::core::ratelimit::RateLimiter;
use crate::infra::uploads::DiskUploadStore;

/// Service types behind the provider seams. The composition root hands the
/// same Gemini client to all three; handler tests substitute stubs.
pub type Chat = ChatService<Arc<dyn AiProvider>>;
pub type Knowledge =
    KnowledgeService<Arc<dyn EmbeddingProvider>, Arc<dyn ContentExtractor>, DiskUploadStore>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parses the `APP_ENV` value; anything but "production" is development.
    pub fn from_env_value(value: &str) -> Self {
        if value.eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub environment: Environment,
    pub port: u16,
    /// Key embed widgets must present on /api/embed/stream.
    pub embed_api_key: String,
    /// Base URL inlined into the widget config and script.
    pub public_base_url: String,
}

impl AppSettings {
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    pub fn embed_stream_endpoint(&self) -> String {
        format!("{}/api/embed/stream", self.public_base_url)
    }

    pub fn embed_config_endpoint(&self) -> String {
        format!("{}/api/embed/config", self.public_base_url)
    }
}

pub struct AppState {
    pub chat: Arc<Chat>,
    pub knowledge: Arc<Knowledge>,
    pub limiter: Arc<RateLimiter>,
    pub settings: AppSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            Environment::from_env_value("production"),
            Environment::Production
        );
        assert_eq!(
            Environment::from_env_value("Production"),
            Environment::Production
        );
        assert!(Environment::from_env_value("development").is_development());
        assert!(Environment::from_env_value("").is_development());
    }

    #[test]
    fn test_endpoint_building() {
        let settings = AppSettings {
            environment: Environment::Production,
            port: 3000,
            embed_api_key: "k".to_string(),
            public_base_url: "https://az-1.info".to_string(),
        };
        assert_eq!(
            settings.embed_stream_endpoint(),
            "https://az-1.info/api/embed/stream"
        );
        assert_eq!(settings.bind_address(), "0.0.0.0:3000");
    }
}
