//! Closed set of content categories.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypesError;

/// A content subject area. Every topic belongs to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    AiAutomation,
    WebDevelopment,
    DigitalMarketing,
    BusinessGrowth,
}

impl Category {
    /// Public name, as accepted by `FromStr` and shown to operators.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::AiAutomation => "ai-automation",
            Category::WebDevelopment => "web-development",
            Category::DigitalMarketing => "digital-marketing",
            Category::BusinessGrowth => "business-growth",
        }
    }

    /// Short code for storage keys.
    pub fn code(&self) -> &'static str {
        match self {
            Category::AiAutomation => "ai",
            Category::WebDevelopment => "web",
            Category::DigitalMarketing => "mkt",
            Category::BusinessGrowth => "biz",
        }
    }

    /// Parse from storage code.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::all().iter().copied().find(|c| c.code() == code)
    }

    /// Get all categories.
    pub fn all() -> &'static [Category] {
        &[
            Category::AiAutomation,
            Category::WebDevelopment,
            Category::DigitalMarketing,
            Category::BusinessGrowth,
        ]
    }

    /// Human-readable description used when prompting for new topics.
    pub fn description(&self) -> &'static str {
        match self {
            Category::AiAutomation => {
                "AI tooling, workflow automation and applied machine learning"
            }
            Category::WebDevelopment => "building, shipping and operating modern web applications",
            Category::DigitalMarketing => "content marketing, SEO, social media and analytics",
            Category::BusinessGrowth => {
                "freelancing, client acquisition and growing a small business"
            }
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::all()
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::all().iter().map(|c| c.as_str()).collect();
                TypesError::invalid(
                    "category",
                    format!("unknown category '{}' (expected one of {})", s, known.join(", ")),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_categories() {
        assert_eq!("ai-automation".parse::<Category>().unwrap(), Category::AiAutomation);
        assert_eq!("Web_Development".parse::<Category>().unwrap(), Category::WebDevelopment);
        assert_eq!(" digital-marketing ".parse::<Category>().unwrap(), Category::DigitalMarketing);
    }

    #[test]
    fn test_parse_unknown_category_names_parameter() {
        let err = "cooking".parse::<Category>().unwrap_err();
        match err {
            TypesError::InvalidValue { parameter, message } => {
                assert_eq!(parameter, "category");
                assert!(message.contains("cooking"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_code_roundtrip() {
        for category in Category::all() {
            assert_eq!(Category::from_code(category.code()), Some(*category));
        }
        assert_eq!(Category::from_code("zzz"), None);
    }

    #[test]
    fn test_serde_uses_public_name() {
        let json = serde_json::to_string(&Category::BusinessGrowth).unwrap();
        assert_eq!(json, "\"business-growth\"");
    }
}
