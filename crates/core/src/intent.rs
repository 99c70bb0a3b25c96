//! Intent definitions
//!
//! Intents are authored by administrators (or shipped in the default catalog)
//! and are read-only while the assistant is running.

use serde::{Deserialize, Serialize};

/// Name of the reserved intent returned when nothing matches
pub const UNRECOGNIZED_INTENT: &str = "unrecognized";

/// Intent category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    /// Question answered from the regulatory dataset
    #[default]
    DataQuery,
    /// Greeting or farewell, answered with a canned response
    SmallTalk,
    /// Reserved fallback category
    Fallback,
}

/// A single keyword or regular-expression matcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherSpec {
    /// Literal keyword, matched on word boundaries
    Keyword(String),
    /// Regular expression, every match counts
    Pattern(String),
}

impl MatcherSpec {
    pub fn keyword(value: impl Into<String>) -> Self {
        MatcherSpec::Keyword(value.into())
    }

    pub fn pattern(value: impl Into<String>) -> Self {
        MatcherSpec::Pattern(value.into())
    }

    /// Raw source text of the matcher
    pub fn source(&self) -> &str {
        match self {
            MatcherSpec::Keyword(s) | MatcherSpec::Pattern(s) => s,
        }
    }
}

/// Intent definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentDefinition {
    /// Unique intent name
    pub name: String,
    /// Category
    #[serde(default)]
    pub category: IntentCategory,
    /// Ordered matchers
    #[serde(default)]
    pub matchers: Vec<MatcherSpec>,
    /// Entity slots this intent consumes
    #[serde(default)]
    pub expected_slots: Vec<String>,
    /// Response template with `{placeholder}` markers
    #[serde(default)]
    pub response_template: String,
    /// Minimum confidence before external enrichment is attempted
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
    /// Inactive intents are skipped by the classifier
    #[serde(default = "default_active")]
    pub active: bool,
    /// Static follow-up suggestions
    #[serde(default)]
    pub followups: Vec<String>,
    /// Short topic label used in apologies and guidance text
    #[serde(default)]
    pub topic: String,
}

fn default_min_confidence() -> f32 {
    0.7
}

fn default_active() -> bool {
    true
}

impl IntentDefinition {
    /// Create a new data-query intent
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: IntentCategory::DataQuery,
            matchers: Vec::new(),
            expected_slots: Vec::new(),
            response_template: String::new(),
            min_confidence: default_min_confidence(),
            active: true,
            followups: Vec::new(),
            topic: String::new(),
        }
    }

    pub fn with_category(mut self, category: IntentCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_matchers(mut self, matchers: Vec<MatcherSpec>) -> Self {
        self.matchers = matchers;
        self
    }

    pub fn with_slots(mut self, slots: &[&str]) -> Self {
        self.expected_slots = slots.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.response_template = template.into();
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn with_followups(mut self, followups: &[&str]) -> Self {
        self.followups = followups.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Whether this intent is answered with a canned greeting or farewell
    pub fn is_small_talk(&self) -> bool {
        self.category == IntentCategory::SmallTalk
    }

    /// Whether the intent expects the given slot
    pub fn expects(&self, slot: &str) -> bool {
        self.expected_slots.iter().any(|s| s == slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let intent = IntentDefinition::new("subscriber_query")
            .with_matchers(vec![MatcherSpec::keyword("assinantes")])
            .with_slots(&["operator", "year"])
            .with_min_confidence(0.6);

        assert!(intent.active);
        assert!(intent.expects("year"));
        assert!(!intent.expects("quarter"));
        assert_eq!(intent.matchers[0].source(), "assinantes");
    }

    #[test]
    fn test_serde_defaults() {
        let intent: IntentDefinition =
            serde_json::from_str(r#"{"name": "greeting", "category": "small_talk"}"#).unwrap();

        assert!(intent.is_small_talk());
        assert!(intent.active);
        assert!((intent.min_confidence - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_matcher_serde() {
        let matchers: Vec<MatcherSpec> =
            serde_json::from_str(r#"[{"keyword": "quota"}, {"pattern": "market\\s+share"}]"#).unwrap();

        assert_eq!(matchers[0], MatcherSpec::keyword("quota"));
        assert_eq!(matchers[1], MatcherSpec::pattern(r"market\s+share"));
    }
}
