//! Intent Classification
//!
//! Keyword/pattern scoring against an ordered registry of intent definitions.
//! Deterministic: the same text against the same registry always yields the
//! same classification.

use std::sync::Arc;

use arn_assistant_core::{IntentCategory, IntentDefinition, MatcherSpec, UNRECOGNIZED_INTENT};
use parking_lot::RwLock;
use regex::Regex;
use serde::Serialize;
use unicode_segmentation::UnicodeSegmentation;

use crate::AssistantError;

/// Intent definition with its matchers compiled
#[derive(Debug)]
pub struct CompiledIntent {
    pub definition: IntentDefinition,
    matchers: Vec<Regex>,
    /// Lower-cased keyword phrases, used for small-talk detection
    phrases: Vec<String>,
}

impl CompiledIntent {
    fn compile(definition: IntentDefinition) -> Result<Self, AssistantError> {
        let mut matchers = Vec::with_capacity(definition.matchers.len());
        let mut phrases = Vec::new();

        for spec in &definition.matchers {
            let source = match spec {
                MatcherSpec::Keyword(keyword) => {
                    let keyword = keyword.trim().to_lowercase();
                    let source = format!(r"(?i)\b{}\b", regex::escape(&keyword));
                    phrases.push(normalize_words(&keyword));
                    source
                }
                MatcherSpec::Pattern(pattern) => format!("(?i){}", pattern),
            };

            let regex = Regex::new(&source).map_err(|e| {
                AssistantError::Config(format!(
                    "Intent '{}' has an invalid matcher '{}': {}",
                    definition.name,
                    spec.source(),
                    e
                ))
            })?;
            matchers.push(regex);
        }

        Ok(Self {
            definition,
            matchers,
            phrases,
        })
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Total number of matcher hits in the text
    fn raw_score(&self, text: &str) -> usize {
        self.matchers.iter().map(|m| m.find_iter(text).count()).sum()
    }
}

/// Ordered intent registry
///
/// Requests take a snapshot, so a reload never changes the definitions a
/// request is already using.
pub struct IntentRegistry {
    intents: RwLock<Arc<Vec<CompiledIntent>>>,
}

impl IntentRegistry {
    pub fn new(definitions: Vec<IntentDefinition>) -> Result<Self, AssistantError> {
        Ok(Self {
            intents: RwLock::new(Arc::new(Self::compile_all(definitions)?)),
        })
    }

    fn compile_all(definitions: Vec<IntentDefinition>) -> Result<Vec<CompiledIntent>, AssistantError> {
        let compiled = definitions
            .into_iter()
            .map(CompiledIntent::compile)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(intents = compiled.len(), "Compiled intent registry");
        Ok(compiled)
    }

    /// Replace every definition at once
    pub fn reload(&self, definitions: Vec<IntentDefinition>) -> Result<(), AssistantError> {
        let compiled = Self::compile_all(definitions)?;
        *self.intents.write() = Arc::new(compiled);
        Ok(())
    }

    pub fn snapshot(&self) -> Arc<Vec<CompiledIntent>> {
        self.intents.read().clone()
    }

    pub fn get(&self, name: &str) -> Option<IntentDefinition> {
        self.intents
            .read()
            .iter()
            .find(|i| i.name() == name)
            .map(|i| i.definition.clone())
    }

    /// Active definitions in registry order
    pub fn active(&self) -> Vec<IntentDefinition> {
        self.intents
            .read()
            .iter()
            .filter(|i| i.definition.active)
            .map(|i| i.definition.clone())
            .collect()
    }
}

/// Classifier outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classification {
    Matched {
        intent: String,
        category: IntentCategory,
        confidence: f32,
    },
    Unrecognized,
}

impl Classification {
    pub fn intent(&self) -> &str {
        match self {
            Classification::Matched { intent, .. } => intent,
            Classification::Unrecognized => UNRECOGNIZED_INTENT,
        }
    }

    pub fn confidence(&self) -> f32 {
        match self {
            Classification::Matched { confidence, .. } => *confidence,
            Classification::Unrecognized => 0.0,
        }
    }

    pub fn is_small_talk(&self) -> bool {
        matches!(
            self,
            Classification::Matched {
                category: IntentCategory::SmallTalk,
                ..
            }
        )
    }
}

/// Intent classifier
pub struct IntentClassifier {
    registry: Arc<IntentRegistry>,
    calibration: f32,
}

impl IntentClassifier {
    /// `calibration` is the raw match count that maps to confidence 1.0
    pub fn new(registry: Arc<IntentRegistry>, calibration: f32) -> Self {
        Self {
            registry,
            calibration: if calibration > 0.0 { calibration } else { 1.0 },
        }
    }

    pub fn registry(&self) -> &Arc<IntentRegistry> {
        &self.registry
    }

    /// Score the text against every active intent
    pub fn classify(&self, text: &str) -> Classification {
        let normalized = text.trim().to_lowercase();
        if normalized.is_empty() {
            return Classification::Unrecognized;
        }

        let intents = self.registry.snapshot();
        let mut best: Option<(&CompiledIntent, usize)> = None;

        for intent in intents.iter().filter(|i| i.definition.active) {
            let score = intent.raw_score(&normalized);
            // strictly greater keeps the earliest registered intent on ties
            if score > 0 && best.map_or(true, |(_, s)| score > s) {
                best = Some((intent, score));
            }
        }

        match best {
            Some((intent, score)) => {
                let confidence = (score as f32 / self.calibration).min(1.0);
                tracing::debug!(
                    intent = %intent.name(),
                    raw_score = score,
                    confidence,
                    "Classified utterance"
                );
                Classification::Matched {
                    intent: intent.name().to_string(),
                    category: intent.definition.category,
                    confidence,
                }
            }
            None => Classification::Unrecognized,
        }
    }

    /// Recognize a bare greeting or farewell
    ///
    /// The text must equal a small-talk phrase, or start with one followed by
    /// a space while matching no data intent.
    pub fn detect_small_talk(&self, text: &str) -> Option<Classification> {
        let normalized = normalize_words(text);
        if normalized.is_empty() {
            return None;
        }

        let intents = self.registry.snapshot();
        let small_talk = intents
            .iter()
            .filter(|i| i.definition.active && i.definition.is_small_talk());

        let mut prefixed = None;
        for intent in small_talk {
            for phrase in &intent.phrases {
                if normalized == *phrase {
                    return Some(Self::small_talk(intent));
                }
                if prefixed.is_none() && normalized.starts_with(&format!("{} ", phrase)) {
                    prefixed = Some(intent);
                }
            }
        }

        let intent = prefixed?;
        let lowered = text.trim().to_lowercase();
        let mentions_data = intents.iter().any(|i| {
            i.definition.active
                && i.definition.category == IntentCategory::DataQuery
                && i.raw_score(&lowered) > 0
        });

        if mentions_data {
            None
        } else {
            Some(Self::small_talk(intent))
        }
    }

    fn small_talk(intent: &CompiledIntent) -> Classification {
        Classification::Matched {
            intent: intent.name().to_string(),
            category: IntentCategory::SmallTalk,
            confidence: 1.0,
        }
    }
}

/// Lower-case the text and keep only its words, single-space separated
pub(crate) fn normalize_words(text: &str) -> String {
    text.to_lowercase().unicode_words().collect::<Vec<_>>().join(" ")
}
