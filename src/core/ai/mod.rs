pub mod models;
pub mod provider;

pub use models::{AiConfig, AiMessage};
pub use provider::{AiProvider, ContentExtractor, EmbeddingProvider, TokenStream};
