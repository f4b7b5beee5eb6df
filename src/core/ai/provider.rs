// =============================================================================
// PROVIDER TRAITS - Seams between business logic and the Gemini API
// =============================================================================
//
// The chat service, knowledge base and recommender only ever see these
// traits; the concrete Gemini client lives in `infra/ai`. Tests substitute
// mock implementations.

use std::error::Error;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;

use super::models::{AiConfig, AiMessage};

/// Incremental text deltas from a streaming completion.
pub type TokenStream =
    Pin<Box<dyn Stream<Item = Result<String, Box<dyn Error + Send + Sync>>> + Send>>;

/// A generative chat model.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Single-shot completion; returns the full response text.
    async fn chat_complete(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<String, Box<dyn Error + Send + Sync>>;

    /// Streaming completion; yields text deltas as the model produces them.
    async fn chat_stream(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<TokenStream, Box<dyn Error + Send + Sync>>;
}

/// Text-to-vector embedding.
///
/// Callers treat any failure as "unembedded" (empty vector) and fall back to
/// keyword matching; errors never propagate past the knowledge service.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, Box<dyn Error + Send + Sync>>;
}

/// Document/content extraction through the generative model itself: PDFs go
/// in as inline data, websites as a URL the model is asked to summarize.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract_pdf(&self, data: &[u8]) -> Result<String, Box<dyn Error + Send + Sync>>;

    async fn extract_website(&self, url: &str) -> Result<String, Box<dyn Error + Send + Sync>>;
}

// Blanket impls so a single Arc<GeminiClient> can be handed to every service
// that needs one of these capabilities.

#[async_trait]
impl<P: AiProvider + ?Sized> AiProvider for Arc<P> {
    async fn chat_complete(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        (**self).chat_complete(messages, config).await
    }

    async fn chat_stream(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<TokenStream, Box<dyn Error + Send + Sync>> {
        (**self).chat_stream(messages, config).await
    }
}

#[async_trait]
impl<E: EmbeddingProvider + ?Sized> EmbeddingProvider for Arc<E> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, Box<dyn Error + Send + Sync>> {
        (**self).embed(text).await
    }
}

#[async_trait]
impl<X: ContentExtractor + ?Sized> ContentExtractor for Arc<X> {
    async fn extract_pdf(&self, data: &[u8]) -> Result<String, Box<dyn Error + Send + Sync>> {
        (**self).extract_pdf(data).await
    }

    async fn extract_website(&self, url: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
        (**self).extract_website(url).await
    }
}
