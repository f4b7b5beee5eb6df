// =============================================================================
// GEMINI CLIENT - Google AI Studio API Integration
// =============================================================================
//
// Implements the three core AI traits against Google's Generative Language
// API (https://ai.google.dev/gemini-api/docs):
//
// - `AiProvider`: generateContent for single-shot chat, and
//   streamGenerateContent with `alt=sse` for the token stream.
// - `EmbeddingProvider`: embedContent against the embedding model.
// - `ContentExtractor`: PDFs are sent as inline base64 data, websites as a
//   URL the model is asked to read; both return extracted text for the
//   knowledge base.
//
// **API quirks worth knowing:**
// - Authentication: API key is passed as a query parameter (`?key=API_KEY`)
//   rather than a Bearer token in the Authorization header.
// - Request format: Uses `contents[]` with nested `parts`, and
//   `systemInstruction` is a separate top-level field (not a message with
//   role "system").
// - Response format: Content is at `candidates[0].content.parts[0].text`.
// - Roles: "assistant" must be sent as "model".
//
// **Environment Variables:**
// - `GEMINI_API_KEY` - Your API key from https://aistudio.google.com/apikey

use std::error::Error;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::ai::{
    AiConfig, AiMessage, AiProvider, ContentExtractor, EmbeddingProvider, TokenStream,
};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Model used for content extraction (PDF and website ingestion).
const EXTRACTION_MODEL: &str = "gemini-2.0-flash";

/// Model used for text embeddings.
const EMBEDDING_MODEL: &str = "embedding-001";

/// Extraction prompt tuned for the AZ-1 Content Catalog: row-level resource
/// directories must come through complete, not summarized, or the chunker's
/// catalog pass has nothing to split on.
const PDF_EXTRACTION_PROMPT: &str = "Extract ALL information from this document in a structured format. \n\n\
If this appears to be a content catalog or resource directory:\n\
- Extract EVERY single resource entry, program, or service listed\n\
- Include ALL details for each entry: title, description, URL, category, audience, contact info\n\
- Preserve the structure and organization\n\
- Don't summarize - include complete information for every row/entry\n\n\
If this is another type of document:\n\
- Extract all key information, main content, and important details\n\
- Maintain document structure and organization\n\n\
Format the output clearly with headers and organize related information together.";

// =============================================================================
// GEMINI API DATA STRUCTURES
// =============================================================================
//
// These structs model the Gemini API request/response format.
// See: https://ai.google.dev/api/generate-content

/// A single part of content. Gemini uses a "parts" array to support
/// multimodal content; we use text and inline data (for PDF uploads).
#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

/// Base64-encoded file content embedded directly in the request.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

/// A message in the conversation. Maps to our `AiMessage` but uses Gemini's
/// expected format with a `parts` array.
#[derive(Debug, Serialize, Deserialize)]
struct Content {
    /// Role: "user" or "model" (Gemini uses "model" instead of "assistant").
    /// Optional in responses, so it defaults to empty when absent.
    #[serde(default)]
    role: String,
    parts: Vec<Part>,
}

/// Generation parameters. See:
/// https://ai.google.dev/api/generate-content#generationconfig
#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

/// Request body for generateContent / streamGenerateContent.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,

    /// System instruction (optional). This is separate from the conversation.
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Content,

    /// Why the model stopped generating (e.g., "STOP", "MAX_TOKENS").
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    /// List of candidate responses. Usually just one.
    candidates: Option<Vec<Candidate>>,
}

/// Request body for the embedContent endpoint.
#[derive(Debug, Serialize)]
struct EmbedContentRequest {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Error response from the Gemini API.
#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
    #[allow(dead_code)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorDetail,
}

// =============================================================================
// GEMINI CLIENT IMPLEMENTATION
// =============================================================================

/// Client for interacting with Google's Gemini API.
///
/// A single instance serves as chat provider, embedder and content extractor;
/// the composition root hands out `Arc` clones to each service.
pub struct GeminiClient {
    client: Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }

    fn text_part(text: String) -> Part {
        Part {
            text: Some(text),
            inline_data: None,
        }
    }

    /// Converts our generic `AiMessage` to Gemini's `Content` format.
    ///
    /// Key transformations:
    /// - "assistant" role → "model" (Gemini's terminology)
    /// - "system" messages are filtered out by the caller (handled separately)
    fn convert_message(msg: &AiMessage) -> Content {
        let role = match msg.role.as_str() {
            "assistant" => "model".to_string(),
            other => other.to_string(),
        };

        Content {
            role,
            parts: vec![Self::text_part(msg.content.clone())],
        }
    }

    /// Builds the common request body: system messages become
    /// `systemInstruction`, everything else joins `contents` in order.
    fn build_request(messages: &[AiMessage], config: &AiConfig) -> GenerateContentRequest {
        let system_instruction = messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| Content {
                // System instruction uses "user" role internally
                role: "user".to_string(),
                parts: vec![Self::text_part(m.content.clone())],
            });

        let contents: Vec<Content> = messages
            .iter()
            .filter(|m| m.role != "system")
            .map(Self::convert_message)
            .collect();

        GenerateContentRequest {
            contents,
            system_instruction,
            generation_config: Some(GenerationConfig {
                temperature: Some(config.temperature),
                max_output_tokens: config.max_tokens,
                top_p: config.top_p,
            }),
        }
    }

    /// Formats a non-2xx response into an error, preferring the structured
    /// Gemini error message when the body parses.
    fn api_error(status: reqwest::StatusCode, body: &str) -> Box<dyn Error + Send + Sync> {
        if let Ok(parsed) = serde_json::from_str::<GeminiErrorResponse>(body) {
            return format!("Gemini API error ({}): {}", status, parsed.error.message).into();
        }
        format!("Gemini API error: {} - {}", status, body).into()
    }

    /// Joins the text parts of the first candidate.
    fn response_text(response: &GenerateContentResponse) -> Option<String> {
        let candidate = response.candidates.as_ref()?.first()?;
        let text: String = candidate
            .content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        Some(text)
    }

    /// Shared single-shot generation path used by chat and extraction.
    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        let url = format!("{API_BASE}/{model}:generateContent?key={}", self.api_key);

        tracing::debug!(model, turns = request.contents.len(), "Gemini generateContent");
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            return Err(Self::api_error(status, &body));
        }

        let parsed: GenerateContentResponse = response.json().await?;
        Self::response_text(&parsed).ok_or_else(|| {
            "No content in Gemini response - the model may have been blocked by safety filters"
                .into()
        })
    }
}

/// Extracts the text delta carried by one SSE line of a
/// streamGenerateContent response. Returns None for blank lines, non-data
/// lines and frames without candidate text.
fn delta_from_sse_line(line: &str) -> Option<String> {
    let data = line.strip_prefix("data:")?.trim_start();
    if data.is_empty() {
        return None;
    }
    let frame: GenerateContentResponse = serde_json::from_str(data).ok()?;
    GeminiClient::response_text(&frame).filter(|t| !t.is_empty())
}

#[async_trait]
impl AiProvider for GeminiClient {
    async fn chat_complete(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        let request = Self::build_request(messages, config);
        self.generate(&config.model, &request).await
    }

    /// Streams deltas via streamGenerateContent with `alt=sse`. Each SSE
    /// `data:` line carries a full GenerateContentResponse frame whose
    /// candidate text is one increment of the answer.
    async fn chat_stream(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<TokenStream, Box<dyn Error + Send + Sync>> {
        let url = format!(
            "{API_BASE}/{}:streamGenerateContent?alt=sse&key={}",
            config.model, self.api_key
        );
        let request = Self::build_request(messages, config);

        tracing::debug!(
            model = %config.model,
            turns = request.contents.len(),
            "Gemini streamGenerateContent"
        );
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            return Err(Self::api_error(status, &body));
        }

        let mut bytes = response.bytes_stream();
        let stream = async_stream::stream! {
            let mut buffer = String::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        yield Err(Box::new(err) as Box<dyn Error + Send + Sync>);
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // SSE frames are newline-delimited; keep any partial line in
                // the buffer until the rest of it arrives.
                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim_end_matches('\r').to_string();
                    buffer.drain(..=pos);
                    if let Some(text) = delta_from_sse_line(&line) {
                        yield Ok(text);
                    }
                }
            }

            if let Some(text) = delta_from_sse_line(buffer.trim_end()) {
                yield Ok(text);
            }
        };

        Ok(Box::pin(stream))
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, Box<dyn Error + Send + Sync>> {
        let url = format!(
            "{API_BASE}/{EMBEDDING_MODEL}:embedContent?key={}",
            self.api_key
        );

        let request = EmbedContentRequest {
            content: Content {
                role: "user".to_string(),
                parts: vec![Self::text_part(text.to_string())],
            },
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            return Err(Self::api_error(status, &body));
        }

        let parsed: EmbedContentResponse = response.json().await?;
        Ok(parsed.embedding.values)
    }
}

#[async_trait]
impl ContentExtractor for GeminiClient {
    /// Sends the PDF bytes inline (base64) together with the extraction
    /// prompt. Gemini reads the document natively, no local PDF parsing.
    async fn extract_pdf(&self, data: &[u8]) -> Result<String, Box<dyn Error + Send + Sync>> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: "application/pdf".to_string(),
                            data: BASE64.encode(data),
                        }),
                    },
                    Self::text_part(PDF_EXTRACTION_PROMPT.to_string()),
                ],
            }],
            system_instruction: None,
            generation_config: None,
        };

        self.generate(EXTRACTION_MODEL, &request).await
    }

    async fn extract_website(&self, url: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Self::text_part(format!(
                    "Extract the main content and important information from this website: {url}"
                ))],
            }],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                temperature: Some(0.2),
                max_output_tokens: Some(2048),
                top_p: None,
            }),
        };

        self.generate(EXTRACTION_MODEL, &request).await
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_message_user() {
        let msg = AiMessage::user("Hello!");
        let content = GeminiClient::convert_message(&msg);

        assert_eq!(content.role, "user");
        assert_eq!(content.parts.len(), 1);
        assert_eq!(content.parts[0].text, Some("Hello!".to_string()));
    }

    #[test]
    fn test_convert_message_assistant_to_model() {
        let msg = AiMessage::assistant("Hi there!");
        let content = GeminiClient::convert_message(&msg);

        // Gemini uses "model" instead of "assistant"
        assert_eq!(content.role, "model");
        assert_eq!(content.parts[0].text, Some("Hi there!".to_string()));
    }

    #[test]
    fn test_system_message_becomes_system_instruction() {
        let messages = vec![
            AiMessage {
                role: "system".to_string(),
                content: "be terse".to_string(),
            },
            AiMessage::user("hello"),
        ];
        let request = GeminiClient::build_request(&messages, &AiConfig::default());

        assert_eq!(request.contents.len(), 1);
        let system = request.system_instruction.unwrap();
        assert_eq!(system.parts[0].text, Some("be terse".to_string()));
    }

    #[test]
    fn test_generation_config_serialization() {
        let config = GenerationConfig {
            temperature: Some(0.7),
            max_output_tokens: Some(1200),
            top_p: None,
        };
        let json = serde_json::to_string(&config).unwrap();

        // Check camelCase serialization and skip-if-none
        assert!(json.contains("\"temperature\""));
        assert!(json.contains("\"maxOutputTokens\""));
        assert!(!json.contains("topP"));
    }

    #[test]
    fn test_inline_data_serialization() {
        let part = Part {
            text: None,
            inline_data: Some(InlineData {
                mime_type: "application/pdf".to_string(),
                data: "QUJD".to_string(),
            }),
        };
        let json = serde_json::to_string(&part).unwrap();

        assert!(json.contains("\"inlineData\""));
        assert!(json.contains("\"mimeType\":\"application/pdf\""));
        assert!(!json.contains("\"text\""));
    }

    #[test]
    fn test_delta_from_sse_line_extracts_text() {
        let line = r#"data: {"candidates":[{"content":{"role":"model","parts":[{"text":"Hello"}]}}]}"#;
        assert_eq!(delta_from_sse_line(line), Some("Hello".to_string()));
    }

    #[test]
    fn test_delta_from_sse_line_skips_noise() {
        assert_eq!(delta_from_sse_line(""), None);
        assert_eq!(delta_from_sse_line("data:"), None);
        assert_eq!(delta_from_sse_line(": keep-alive comment"), None);
        assert_eq!(delta_from_sse_line("data: not json"), None);
    }

    #[test]
    fn test_embed_request_shape() {
        let request = EmbedContentRequest {
            content: Content {
                role: "user".to_string(),
                parts: vec![GeminiClient::text_part("vectorize me".to_string())],
            },
        };
        let json = serde_json::to_string(&request).unwrap();

        assert!(json.contains("\"content\""));
        assert!(json.contains("\"vectorize me\""));
    }

    #[test]
    fn test_embed_response_parsing() {
        let body = r#"{"embedding":{"values":[0.1,0.2,0.3]}}"#;
        let parsed: EmbedContentResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.embedding.values, vec![0.1, 0.2, 0.3]);
    }
}
