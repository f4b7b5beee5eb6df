// =============================================================================
// MESSAGE SIGNALS - Skill level, frustration and search-intent detection
// =============================================================================
//
// Keyword heuristics over the user's last message. Behind a trait so a real
// classifier can replace the phrase lists without touching the chat service.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl SkillLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillLevel::Beginner => "beginner",
            SkillLevel::Intermediate => "intermediate",
            SkillLevel::Advanced => "advanced",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MessageSignals {
    pub skill_level: SkillLevel,
    pub frustrated: bool,
    pub search_intent: bool,
}

pub trait SignalDetector: Send + Sync {
    fn analyze(&self, message: &str) -> MessageSignals;
}

const BEGINNER_PHRASES: &[&str] = &[
    "new to",
    "don't know",
    "never used",
    "first time",
    "beginner",
    "don't understand",
    "confused",
    "help me start",
    "what is",
    "how do i",
    "i'm not good with",
    "not familiar",
];

const ADVANCED_PHRASES: &[&str] = &[
    "configure",
    "settings",
    "troubleshoot",
    "optimize",
    "technical",
    "specifications",
    "bandwidth",
    "latency",
    "protocols",
];

const FRUSTRATION_PHRASES: &[&str] = &[
    "frustrated",
    "angry",
    "mad",
    "upset",
    "annoying",
    "stupid",
    "hate",
    "terrible",
    "awful",
    "useless",
    "doesn't work",
    "broken",
    "give up",
    "can't figure",
    "too hard",
];

const SEARCH_PHRASES: &[&str] = &[
    "search",
    "az-1.info",
    "find information",
    "website",
    "resource",
];

/// Default detector: case-insensitive substring matching against fixed
/// phrase lists. Beginner phrases win over advanced ones.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordSignalDetector;

impl KeywordSignalDetector {
    fn contains_any(content: &str, phrases: &[&str]) -> bool {
        phrases.iter().any(|phrase| content.contains(phrase))
    }
}

impl SignalDetector for KeywordSignalDetector {
    fn analyze(&self, message: &str) -> MessageSignals {
        let content = message.to_lowercase();

        let skill_level = if Self::contains_any(&content, BEGINNER_PHRASES) {
            SkillLevel::Beginner
        } else if Self::contains_any(&content, ADVANCED_PHRASES) {
            SkillLevel::Advanced
        } else {
            SkillLevel::Intermediate
        };

        MessageSignals {
            skill_level,
            frustrated: Self::contains_any(&content, FRUSTRATION_PHRASES),
            search_intent: Self::contains_any(&content, SEARCH_PHRASES),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beginner_phrases_detected() {
        let signals = KeywordSignalDetector.analyze("I'm new to computers, what is WiFi?");
        assert_eq!(signals.skill_level, SkillLevel::Beginner);
    }

    #[test]
    fn test_beginner_wins_over_advanced() {
        // "what is" and "bandwidth" both present
        let signals = KeywordSignalDetector.analyze("What is bandwidth?");
        assert_eq!(signals.skill_level, SkillLevel::Beginner);
    }

    #[test]
    fn test_advanced_phrases_detected() {
        let signals = KeywordSignalDetector.analyze("Need to optimize my router latency");
        assert_eq!(signals.skill_level, SkillLevel::Advanced);
    }

    #[test]
    fn test_neutral_message_is_intermediate() {
        let signals = KeywordSignalDetector.analyze("Tell me about fiber in Pima county");
        assert_eq!(signals.skill_level, SkillLevel::Intermediate);
        assert!(!signals.frustrated);
    }

    #[test]
    fn test_frustration_case_insensitive() {
        let signals = KeywordSignalDetector.analyze("This is USELESS and BROKEN");
        assert!(signals.frustrated);
    }

    #[test]
    fn test_search_intent() {
        let signals = KeywordSignalDetector.analyze("Can you search az-1.info for maps?");
        assert!(signals.search_intent);
    }
}
