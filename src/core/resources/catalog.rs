// =============================================================================
// RESOURCE CATALOG - Curated digital equity resources
// =============================================================================
//
// Hand-maintained list shown to users alongside chat answers. In production
// this would come from a CMS; for now the recommender filters this static set
// and optionally merges in entries parsed out of the AZ-1 Content Catalog.

use once_cell::sync::Lazy;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    DigitalLiteracy,
    Broadband,
    Affordability,
    Devices,
    TechnicalSupport,
    Mapping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Beginner,
    Intermediate,
    Advanced,
    Everyone,
}

#[derive(Debug, Clone, Serialize)]
pub struct Resource {
    pub id: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub category: Category,
    pub audience: Audience,
    pub tags: Vec<String>,
    pub source: String,
}

impl Resource {
    fn new(
        id: &str,
        title: &str,
        description: &str,
        url: &str,
        category: Category,
        audience: Audience,
        tags: &[&str],
        source: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            url: url.to_string(),
            category,
            audience,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            source: source.to_string(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

pub static RESOURCES: Lazy<Vec<Resource>> = Lazy::new(|| {
    vec![
        // Digital literacy, beginner level
        Resource::new(
            "dl-basics-1",
            "Internet Basics for Beginners",
            "Learn what the internet is and how it works in simple terms. Perfect for those who are just getting started.",
            "https://digitallearn.org/courses/internet-basics",
            Category::DigitalLiteracy,
            Audience::Beginner,
            &["internet", "basics", "getting-started"],
            "DigitalLearn.org",
        ),
        Resource::new(
            "dl-basics-2",
            "Computer Basics for Seniors",
            "Step-by-step guide to using computers, designed specifically for older adults who are new to technology.",
            "https://seniorplanet.org/computer-basics/",
            Category::DigitalLiteracy,
            Audience::Beginner,
            &["computer", "seniors", "basics"],
            "Senior Planet",
        ),
        // Broadband information
        Resource::new(
            "bb-what-is-1",
            "What is Broadband Internet?",
            "Clear explanation of broadband internet, different types of connections, and what speeds mean for everyday use.",
            "https://www.fcc.gov/consumers/guides/getting-broadband",
            Category::Broadband,
            Audience::Everyone,
            &["broadband", "explanation", "types", "speeds"],
            "FCC",
        ),
        Resource::new(
            "bb-check-availability",
            "Check Broadband Availability",
            "Find out what internet services are available in your area and compare options.",
            "https://broadbandmap.fcc.gov/",
            Category::Broadband,
            Audience::Everyone,
            &["availability", "map", "providers", "arizona"],
            "FCC Broadband Map",
        ),
        // Affordability programs
        Resource::new(
            "aff-acp-1",
            "Affordable Connectivity Program (ACP)",
            "Learn about the federal program that helps eligible households save on broadband internet service.",
            "https://www.fcc.gov/acp",
            Category::Affordability,
            Audience::Everyone,
            &["affordable", "program", "federal", "subsidy"],
            "FCC",
        ),
        Resource::new(
            "aff-lowcost-1",
            "Low-Cost Internet Programs",
            "Directory of internet service providers offering discounted rates for qualifying households.",
            "https://www.internetessentials.com/",
            Category::Affordability,
            Audience::Everyone,
            &["low-cost", "discount", "qualifying"],
            "Internet Essentials",
        ),
        // Device help
        Resource::new(
            "dev-tablets-1",
            "Getting Started with Tablets",
            "Learn how to use tablets (iPad, Android) for internet browsing, email, and basic apps.",
            "https://digitallearn.org/courses/tablets",
            Category::Devices,
            Audience::Beginner,
            &["tablet", "ipad", "android", "mobile"],
            "DigitalLearn.org",
        ),
        Resource::new(
            "dev-smartphone-1",
            "Smartphone Basics",
            "Master the fundamentals of using smartphones for calls, texts, internet, and apps.",
            "https://digitallearn.org/courses/smartphone-basics",
            Category::Devices,
            Audience::Beginner,
            &["smartphone", "mobile", "apps", "basics"],
            "DigitalLearn.org",
        ),
        // Technical support
        Resource::new(
            "tech-troubleshoot-1",
            "Basic Internet Troubleshooting",
            "Simple steps to fix common internet connection problems at home.",
            "https://www.wikihow.com/Fix-Your-Internet-Connection",
            Category::TechnicalSupport,
            Audience::Intermediate,
            &["troubleshooting", "wifi", "connection", "problems"],
            "WikiHow",
        ),
        // Arizona specific
        Resource::new(
            "az-broadband-1",
            "Arizona Broadband Map",
            "Interactive map showing broadband availability and speeds across Arizona counties.",
            "https://az-1.info",
            Category::Mapping,
            Audience::Everyone,
            &["arizona", "map", "availability", "counties"],
            "AZ-1.info",
        ),
        Resource::new(
            "az-digital-equity",
            "Arizona Digital Equity Resources",
            "State-specific programs and resources for improving digital access and literacy in Arizona.",
            "https://azcommerce.com/broadband/",
            Category::DigitalLiteracy,
            Audience::Everyone,
            &["arizona", "digital-equity", "state-programs"],
            "Arizona Commerce Authority",
        ),
    ]
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_entries_are_unique_by_id() {
        let mut ids: Vec<&str> = RESOURCES.iter().map(|r| r.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), RESOURCES.len());
    }

    #[test]
    fn test_category_serializes_kebab_case() {
        let json = serde_json::to_string(&Category::DigitalLiteracy).unwrap();
        assert_eq!(json, "\"digital-literacy\"");
    }
}
