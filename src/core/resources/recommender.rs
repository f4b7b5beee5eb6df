// =============================================================================
// RESOURCE RECOMMENDER - Topic-driven resource selection
// =============================================================================

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::chat::SkillLevel;
use crate::core::rag::KnowledgeAccess;

use super::catalog::{Audience, Category, Resource, RESOURCES};

/// Cap for the static recommendation path.
const MAX_RECOMMENDATIONS: usize = 6;
/// Cap once catalog-derived entries are merged in.
const MAX_ENHANCED_RECOMMENDATIONS: usize = 5;
/// Chunks pulled from the knowledge index per catalog lookup.
const CATALOG_QUERY_K: usize = 3;

struct TopicPatterns {
    broadband: Regex,
    affordability: Regex,
    devices: Regex,
    basics: Regex,
    troubleshoot: Regex,
    arizona: Regex,
}

static TOPICS: Lazy<TopicPatterns> = Lazy::new(|| TopicPatterns {
    broadband: Regex::new(r"(?i)broadband|internet|connection|speed|provider").unwrap(),
    affordability: Regex::new(r"(?i)afford|cheap|low.?cost|money|expensive|budget").unwrap(),
    devices: Regex::new(r"(?i)phone|tablet|computer|device|laptop").unwrap(),
    basics: Regex::new(r"(?i)learn|start|begin|basic|how.?to|don.?t.?know").unwrap(),
    troubleshoot: Regex::new(r"(?i)problem|not.?working|fix|trouble|broken").unwrap(),
    arizona: Regex::new(r"(?i)arizona|az|county|local").unwrap(),
});

static CATALOG_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:title|resource|program):\s*([^\n.]+)").unwrap());
static FIRST_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://[^\s]+").unwrap());

fn by_category(category: Category, audience: Option<Audience>) -> Vec<Resource> {
    RESOURCES
        .iter()
        .filter(|r| r.category == category)
        .filter(|r| match audience {
            Some(a) => r.audience == a || r.audience == Audience::Everyone,
            None => true,
        })
        .cloned()
        .collect()
}

/// Featured entries for users who are just getting started.
fn beginner_resources() -> Vec<Resource> {
    RESOURCES
        .iter()
        .filter(|r| {
            r.audience == Audience::Beginner
                || (r.audience == Audience::Everyone && r.has_tag("basics"))
        })
        .take(4)
        .cloned()
        .collect()
}

/// Selects catalog entries matching the topics detected in the user message.
/// Duplicates are dropped by id and the result is capped at six entries.
pub fn recommend(message: &str, skill_level: SkillLevel) -> Vec<Resource> {
    let beginner_filter = if skill_level == SkillLevel::Beginner {
        Some(Audience::Beginner)
    } else {
        None
    };

    let mut recommendations = Vec::new();

    if TOPICS.broadband.is_match(message) {
        recommendations.extend(by_category(Category::Broadband, beginner_filter));
    }
    if TOPICS.affordability.is_match(message) {
        recommendations.extend(by_category(Category::Affordability, None));
    }
    if TOPICS.devices.is_match(message) {
        recommendations.extend(by_category(Category::Devices, beginner_filter));
    }
    if TOPICS.basics.is_match(message) || skill_level == SkillLevel::Beginner {
        recommendations.extend(beginner_resources());
    }
    if TOPICS.troubleshoot.is_match(message) {
        recommendations.extend(by_category(Category::TechnicalSupport, None));
    }
    if TOPICS.arizona.is_match(message) {
        recommendations.extend(RESOURCES.iter().filter(|r| r.has_tag("arizona")).cloned());
    }

    let mut unique: Vec<Resource> = Vec::new();
    for resource in recommendations {
        if !unique.iter().any(|r| r.id == resource.id) {
            unique.push(resource);
        }
    }
    unique.truncate(MAX_RECOMMENDATIONS);
    unique
}

/// Turns chunks retrieved from the AZ-1 Content Catalog into ad-hoc resource
/// entries. Titles come from a `Title:`/`Resource:`/`Program:` line, the URL
/// is the first one found in the chunk, and the description is the first 150
/// characters of content.
async fn catalog_resources(query: &str, knowledge: &dyn KnowledgeAccess) -> Vec<Resource> {
    let chunks = knowledge.query(query, CATALOG_QUERY_K).await;

    chunks
        .into_iter()
        .filter(|chunk| {
            chunk.metadata.source.contains("Content Catalog")
                || chunk.metadata.filename.contains("Content Catalog")
        })
        .enumerate()
        .map(|(index, chunk)| {
            let title = CATALOG_TITLE
                .captures(&chunk.content)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_else(|| "Content Catalog Resource".to_string());

            let url = FIRST_URL
                .find(&chunk.content)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| "https://az-1.info".to_string());

            let description: String = chunk.content.chars().take(150).collect::<String>() + "...";

            Resource {
                id: format!("catalog-{index}"),
                title,
                description,
                url,
                category: Category::Broadband,
                audience: Audience::Everyone,
                tags: vec![
                    "content-catalog".to_string(),
                    "arizona".to_string(),
                    "broadband".to_string(),
                ],
                source: "AZ-1 Content Catalog".to_string(),
            }
        })
        .collect()
}

/// Static recommendations merged with entries parsed out of the content
/// catalog. Catalog entries take priority; static ones that duplicate a
/// catalog title or URL are dropped. Capped at five.
pub async fn recommend_with_catalog(
    message: &str,
    skill_level: SkillLevel,
    knowledge: &dyn KnowledgeAccess,
) -> Vec<Resource> {
    let standard = recommend(message, skill_level);
    let mut combined = catalog_resources(message, knowledge).await;

    for resource in standard {
        if !combined
            .iter()
            .any(|r| r.title == resource.title || r.url == resource.url)
        {
            combined.push(resource);
        }
    }

    combined.truncate(MAX_ENHANCED_RECOMMENDATIONS);
    combined
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadband_topic_selects_broadband_resources() {
        let results = recommend("what internet speed do I need?", SkillLevel::Intermediate);
        assert!(results.iter().any(|r| r.category == Category::Broadband));
    }

    #[test]
    fn test_affordability_topic() {
        let results = recommend("internet is too expensive for me", SkillLevel::Intermediate);
        assert!(results.iter().any(|r| r.id == "aff-acp-1"));
    }

    #[test]
    fn test_beginner_skill_adds_featured_basics() {
        let results = recommend("hello there", SkillLevel::Beginner);
        assert!(results.iter().any(|r| r.id == "dl-basics-1"));
    }

    #[test]
    fn test_results_capped_and_deduplicated() {
        // Touches every topic at once
        let results = recommend(
            "my cheap arizona internet tablet is broken, how to learn basics",
            SkillLevel::Beginner,
        );
        assert!(results.len() <= 6);
        let mut ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), results.len());
    }

    #[test]
    fn test_no_topics_no_recommendations() {
        let results = recommend("tell me a story", SkillLevel::Advanced);
        assert!(results.is_empty());
    }

    #[test]
    fn test_catalog_title_pattern() {
        let caps = CATALOG_TITLE
            .captures("Resource: Device Lending Library\nBorrow laptops for free.")
            .unwrap();
        assert_eq!(caps.get(1).unwrap().as_str().trim(), "Device Lending Library");
    }
}
