use serde::{Deserialize, Serialize};

/// One turn of conversation, provider-agnostic.
///
/// Roles are "user", "assistant" or "system"; providers translate to their
/// own vocabulary (Gemini renames "assistant" to "model" and lifts "system"
/// out of the history entirely).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiMessage {
    pub role: String,
    pub content: String,
}

impl AiMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Generation parameters passed through to the model.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            temperature: 0.7,
            max_tokens: Some(1200),
            top_p: None,
        }
    }
}
