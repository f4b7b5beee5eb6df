pub mod chat_service;
pub mod events;
pub mod signals;

pub use chat_service::{low_quota_note, ChatService, DEFAULT_SYSTEM_PROMPT};
pub use events::ChatEvent;
pub use signals::{KeywordSignalDetector, MessageSignals, SignalDetector, SkillLevel};
