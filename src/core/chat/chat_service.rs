// =============================================================================
// CHAT SERVICE - Prompt assembly and response generation
// =============================================================================
//
// Owns everything between "raw message list from the client" and "text the
// user reads": persona priming, conversation history trimming, RAG
// enhancement of the last user message, contextual metadata for the model,
// and resource recommendations appended to the answer.
//
// Two delivery paths share the same prompt assembly: `respond` does a single
// completion call, `stream` relays the provider's token stream as ChatEvents.

use std::error::Error;
use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};

use crate::core::ai::{AiConfig, AiMessage, AiProvider};
use crate::core::rag::KnowledgeAccess;
use crate::core::resources::{recommend_with_catalog, Resource};

use super::events::ChatEvent;
use super::signals::{MessageSignals, SignalDetector};

/// Conversation turns kept when building the model prompt.
const HISTORY_WINDOW: usize = 6;
/// Resources appended to an answer when the model ignored them.
const RESOURCE_BLOCK_TOP: usize = 3;
/// Remaining-request count below which users get a heads-up.
const LOW_QUOTA_THRESHOLD: u32 = 10;

/// Returned for requests that contain no user message at all.
const GREETING: &str = "I'm here to help you with questions about broadband, \
digital literacy, and technology. What would you like to learn about today?";

/// The model's scripted acknowledgment of the persona priming turn.
const PRIMING_ACK: &str = "I understand my role as a digital navigator and will \
provide patient, helpful support for users at any skill level. I'm ready to help \
with broadband, digital literacy, and technology questions.";

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"Chatbot Persona:

Role: Humble, helpful digital navigator and broadband equity specialist for the az-1.info website. You are an educational assistant helping anyone learn about broadband and digital equity, with a special focus on serving people who may have little to no knowledge of computers, technology, or how the internet works.

Tone:
- Extra patient, thoughtful, and respectful
- Use simple, clear language avoiding technical jargon
- Never assume technical knowledge
- Explain concepts step-by-step when needed
- If users get upset or frustrated, remain kind and respectful - they may not know how to communicate with AI
- Be humble about your capabilities while being maximally helpful

Core Knowledge Areas:

1. NDIA Digital Navigator Framework: Use the National Digital Inclusion Alliance's digital navigator learning methodology to:
   - Assess digital skills through gentle questioning
   - Provide personalized guidance based on skill level
   - Break down complex digital concepts into manageable steps
   - Support users at any point in their digital journey

2. AZ-1 Arizona Broadband Information:
   - General broadband availability and access questions
   - Digital equity issues and solutions
   - Educational resources for understanding internet and technology
   - Eventually will include geospatial data about Arizona broadband maps

3. Global Knowledge Support:
   - Not limited to just AZ-1 content
   - Can answer general questions about digital literacy, internet basics, technology
   - Educational approach to help anyone understand broadband and digital equity concepts

4. Resource Interpretation: When you have access to content catalog responses:
   - Interpret content to provide relevant resource links
   - Respond with organized lists of resources including:
     * Title of resource
     * Description of what it offers
     * Direct link to the resource
   - Match resources to user's specific needs and skill level

Response Guidelines:

For Beginners/Non-Technical Users:
- Start with the basics and check understanding
- Use analogies and simple comparisons
- Offer to explain technical terms
- Break complex processes into small steps
- Validate their questions and concerns

For Frustrated/Upset Users:
- Acknowledge their feelings with empathy
- Don't take criticism personally
- Focus on how you can help solve their problem
- Offer alternative approaches if first attempts don't work
- Be patient and encouraging

For Resource Requests:
- Provide curated lists of relevant resources
- Include brief descriptions of what each resource offers
- Prioritize resources based on user's expressed skill level
- Include direct links when available
- Suggest next steps after reviewing resources

Digital Skills Assessment Approach:
- Ask gentle, non-judgmental questions about comfort level
- Provide appropriate resources based on responses
- Offer to explain concepts at different levels of detail
- Support progressive learning and skill building

Remember: You're helping build digital equity by making technology accessible to everyone, regardless of their starting point. Every question is valid and deserves a thoughtful, respectful response."#;

/// Usage warning appended to answers (and emitted as a stream event) when
/// the hourly quota is nearly exhausted.
pub fn low_quota_note(remaining: u32) -> Option<String> {
    if remaining < LOW_QUOTA_THRESHOLD {
        Some(format!(
            "\n\n_Note: I'm getting tired. Only {remaining} requests remaining in this \
             hour. I might need to rest soon to stay within my free usage limits._"
        ))
    } else {
        None
    }
}

struct PreparedConversation {
    messages: Vec<AiMessage>,
    resources: Vec<Resource>,
}

pub struct ChatService<P: AiProvider> {
    provider: P,
    config: AiConfig,
    system_prompt: String,
    knowledge: Arc<dyn KnowledgeAccess>,
    detector: Box<dyn SignalDetector>,
}

impl<P: AiProvider> ChatService<P> {
    pub fn new(
        provider: P,
        config: AiConfig,
        system_prompt: String,
        knowledge: Arc<dyn KnowledgeAccess>,
        detector: Box<dyn SignalDetector>,
    ) -> Self {
        Self {
            provider,
            config,
            system_prompt,
            knowledge,
            detector,
        }
    }

    /// Single-shot completion. Short-circuits to the canned greeting when no
    /// user message is present.
    pub async fn respond(
        &self,
        messages: &[AiMessage],
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        let Some(prepared) = self.prepare(messages).await else {
            return Ok(GREETING.to_string());
        };

        tracing::debug!(
            turns = prepared.messages.len(),
            "sending conversation to provider"
        );
        let mut response = self
            .provider
            .chat_complete(&prepared.messages, &self.config)
            .await?;

        if let Some(block) = resource_block_if_missing(&response, &prepared.resources) {
            response.push_str(&block);
        }
        Ok(response)
    }

    /// Streaming completion. The returned stream always terminates with
    /// `ChatEvent::Done`; provider failures surface as an in-band
    /// `ChatEvent::Error` rather than killing the connection abruptly.
    pub fn stream(
        self: &Arc<Self>,
        messages: Vec<AiMessage>,
        remaining_requests: u32,
    ) -> Pin<Box<dyn Stream<Item = ChatEvent> + Send>>
    where
        P: 'static,
    {
        let service = Arc::clone(self);

        Box::pin(async_stream::stream! {
            let Some(prepared) = service.prepare(&messages).await else {
                yield ChatEvent::TextDelta(GREETING.to_string());
                yield ChatEvent::Done;
                return;
            };

            let mut tokens = match service
                .provider
                .chat_stream(&prepared.messages, &service.config)
                .await
            {
                Ok(stream) => stream,
                Err(err) => {
                    tracing::error!("provider refused stream: {err}");
                    yield ChatEvent::Error {
                        message: "I encountered an error while processing your request. \
                                  Please try again."
                            .to_string(),
                    };
                    yield ChatEvent::Done;
                    return;
                }
            };

            let mut full_response = String::new();
            while let Some(delta) = tokens.next().await {
                match delta {
                    Ok(text) => {
                        full_response.push_str(&text);
                        yield ChatEvent::TextDelta(text);
                    }
                    Err(err) => {
                        tracing::error!("provider stream failed mid-response: {err}");
                        yield ChatEvent::Error {
                            message: "I encountered an error while processing your \
                                      request. Please try again."
                                .to_string(),
                        };
                        yield ChatEvent::Done;
                        return;
                    }
                }
            }

            if let Some(block) = resource_block_if_missing(&full_response, &prepared.resources) {
                yield ChatEvent::ResourceBlock(block);
            }
            if let Some(note) = low_quota_note(remaining_requests) {
                yield ChatEvent::Warning(note);
            }
            yield ChatEvent::Done;
        })
    }

    /// Assembles the provider conversation: persona priming pair, trimmed
    /// history, and the RAG-enhanced last user message annotated with the
    /// detected signals. Returns None when there is no user message.
    async fn prepare(&self, messages: &[AiMessage]) -> Option<PreparedConversation> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.clone())?;

        let signals = self.detector.analyze(&last_user);
        let resources =
            recommend_with_catalog(&last_user, signals.skill_level, self.knowledge.as_ref()).await;

        let enhanced = self.knowledge.enhance_prompt(&last_user).await;
        if enhanced != last_user {
            tracing::debug!("enhanced prompt with retrieved context");
        }

        let mut conversation = vec![
            AiMessage::user(&self.system_prompt),
            AiMessage::assistant(PRIMING_ACK),
        ];

        // Recent history, excluding the final message (it is sent enhanced).
        let recent = &messages[messages.len().saturating_sub(HISTORY_WINDOW)..];
        for message in recent.iter().take(recent.len().saturating_sub(1)) {
            if message.role == "user" || message.role == "assistant" {
                conversation.push(message.clone());
            }
        }

        let prompt = format!(
            "{enhanced}{}",
            contextual_info(&signals, &resources)
        );
        conversation.push(AiMessage::user(&prompt));

        Some(PreparedConversation {
            messages: conversation,
            resources,
        })
    }
}

/// Context block appended to the final user turn so the model can adapt its
/// register without the client sending any of this explicitly.
fn contextual_info(signals: &MessageSignals, resources: &[Resource]) -> String {
    let mut info = String::from("\n\nContext for this response:");
    info.push_str(&format!(
        "\n- User skill level appears to be: {}",
        signals.skill_level.as_str()
    ));
    if signals.frustrated {
        info.push_str("\n- User may be frustrated - respond with extra patience and empathy");
    }

    if !resources.is_empty() {
        info.push_str("\n- Relevant resources available to recommend:");
        for resource in resources {
            info.push_str(&format!(
                "\n  * {}: {} ({})",
                resource.title, resource.description, resource.url
            ));
        }
        info.push_str("\n- Please include these resources in your response when relevant");
    }

    if signals.search_intent {
        info.push_str(
            "\n- This appears to be a search or resource request - provide specific \
             resource links and guidance",
        );
    }
    info
}

/// Fallback: if the model's answer mentions none of the recommended URLs,
/// append a formatted block with the top few so users still see them.
fn resource_block_if_missing(response: &str, resources: &[Resource]) -> Option<String> {
    if resources.is_empty() || resources.iter().any(|r| response.contains(&r.url)) {
        return None;
    }

    let mut block = String::from("\n\n**Helpful Resources:**\n");
    for resource in resources.iter().take(RESOURCE_BLOCK_TOP) {
        block.push_str(&format!("\n\u{1F4DA} **{}**\n", resource.title));
        block.push_str(&format!("{}\n", resource.description));
        block.push_str(&format!("\u{1F517} [Visit Resource]({})\n", resource.url));
    }
    Some(block)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use futures::stream;

    use super::*;
    use crate::core::ai::TokenStream;
    use crate::core::chat::signals::KeywordSignalDetector;
    use crate::core::rag::DocChunk;

    /// Knowledge stub with no stored content: queries return nothing and
    /// enhancement is the identity.
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

    /// Provider that returns a canned reply / delta script and records the
    /// conversations it was given.
    struct MockProvider {
        reply: String,
        deltas: Vec<Result<String, String>>,
        seen: Mutex<Vec<Vec<AiMessage>>>,
    }

    impl MockProvider {
        fn new(reply: &str, deltas: &[Result<&str, &str>]) -> Self {
            Self {
                reply: reply.to_string(),
                deltas: deltas
                    .iter()
                    .map(|d| match d {
                        Ok(t) => Ok((*t).to_string()),
                        Err(e) => Err((*e).to_string()),
                    })
                    .collect(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AiProvider for MockProvider {
        async fn chat_complete(
            &self,
            messages: &[AiMessage],
            _config: &AiConfig,
        ) -> Result<String, Box<dyn Error + Send + Sync>> {
            self.seen.lock().unwrap().push(messages.to_vec());
            Ok(self.reply.clone())
        }

        async fn chat_stream(
            &self,
            messages: &[AiMessage],
            _config: &AiConfig,
        ) -> Result<TokenStream, Box<dyn Error + Send + Sync>> {
            self.seen.lock().unwrap().push(messages.to_vec());
            let items: Vec<Result<String, Box<dyn Error + Send + Sync>>> = self
                .deltas
                .iter()
                .map(|d| match d {
                    Ok(t) => Ok(t.clone()),
                    Err(e) => Err(e.clone().into()),
                })
                .collect();
            Ok(Box::pin(stream::iter(items)))
        }
    }

    fn service(provider: MockProvider) -> Arc<ChatService<MockProvider>> {
        Arc::new(ChatService::new(
            provider,
            AiConfig::default(),
            DEFAULT_SYSTEM_PROMPT.to_string(),
            Arc::new(NullKnowledge),
            Box::new(KeywordSignalDetector),
        ))
    }

    #[tokio::test]
    async fn test_empty_messages_return_greeting() {
        let svc = service(MockProvider::new("unused", &[]));
        let reply = svc.respond(&[]).await.unwrap();
        assert!(reply.contains("broadband, digital literacy, and technology"));
    }

    #[tokio::test]
    async fn test_resource_block_appended_when_urls_missing() {
        let svc = service(MockProvider::new("Fiber is one option.", &[]));
        let reply = svc
            .respond(&[AiMessage::user("what internet speed do I need?")])
            .await
            .unwrap();
        assert!(reply.contains("**Helpful Resources:**"));
        assert!(reply.contains("\u{1F517} [Visit Resource]"));
    }

    #[tokio::test]
    async fn test_resource_block_skipped_when_model_cited_a_url() {
        let svc = service(MockProvider::new(
            "See https://www.fcc.gov/consumers/guides/getting-broadband for details.",
            &[],
        ));
        let reply = svc
            .respond(&[AiMessage::user("what internet speed do I need?")])
            .await
            .unwrap();
        assert!(!reply.contains("**Helpful Resources:**"));
    }

    #[tokio::test]
    async fn test_history_is_trimmed_and_primed() {
        let svc = service(MockProvider::new("ok", &[]));
        let mut messages = Vec::new();
        for i in 0..10 {
            messages.push(AiMessage::user(&format!("question {i}")));
            messages.push(AiMessage::assistant(&format!("answer {i}")));
        }
        // 20 messages; the window keeps the last 6 and drops the final one,
        // leaving question 7 .. question 9 as history.
        svc.respond(&messages).await.unwrap();

        let seen = svc.provider.seen.lock().unwrap();
        let conversation = &seen[0];
        // 2 priming + 5 history + 1 current
        assert_eq!(conversation.len(), 8);
        assert!(conversation[0].content.starts_with("Chatbot Persona:"));
        assert_eq!(conversation[1].content, PRIMING_ACK);
        assert_eq!(conversation[2].content, "question 7");
        assert!(conversation[7].content.contains("Context for this response:"));
    }

    #[tokio::test]
    async fn test_stream_relays_deltas_and_terminates() {
        let svc = service(MockProvider::new("", &[Ok("Hel"), Ok("lo")]));
        let events: Vec<ChatEvent> = svc
            .stream(vec![AiMessage::user("tell me a short story")], 50)
            .collect()
            .await;

        assert_eq!(
            events,
            vec![
                ChatEvent::TextDelta("Hel".to_string()),
                ChatEvent::TextDelta("lo".to_string()),
                ChatEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_warns_on_low_quota() {
        let svc = service(MockProvider::new("", &[Ok("hi")]));
        let events: Vec<ChatEvent> = svc
            .stream(vec![AiMessage::user("tell me a short story")], 3)
            .collect()
            .await;

        assert!(matches!(events[events.len() - 2], ChatEvent::Warning(_)));
        assert_eq!(events.last(), Some(&ChatEvent::Done));
    }

    #[tokio::test]
    async fn test_stream_error_is_in_band_and_terminal() {
        let svc = service(MockProvider::new("", &[Ok("partial"), Err("quota blown")]));
        let events: Vec<ChatEvent> = svc
            .stream(vec![AiMessage::user("tell me a short story")], 50)
            .collect()
            .await;

        assert_eq!(events.len(), 3);
        assert_eq!(events[0], ChatEvent::TextDelta("partial".to_string()));
        assert!(matches!(events[1], ChatEvent::Error { .. }));
        assert_eq!(events[2], ChatEvent::Done);
    }

    #[tokio::test]
    async fn test_stream_greeting_for_empty_conversation() {
        let svc = service(MockProvider::new("", &[]));
        let events: Vec<ChatEvent> = svc.stream(Vec::new(), 50).collect().await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ChatEvent::TextDelta(_)));
        assert_eq!(events[1], ChatEvent::Done);
    }

    #[test]
    fn test_low_quota_note_threshold() {
        assert!(low_quota_note(10).is_none());
        let note = low_quota_note(9).unwrap();
        assert!(note.contains("Only 9 requests remaining"));
    }
}
