//! Extracted entity slots
//!
//! Slots are kept in a sorted map so that two semantically equal slot sets
//! always serialize (and hash) identically.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Slot names understood by the extractor and the dispatcher
pub mod names {
    pub const OPERATOR: &str = "operator";
    pub const SECOND_OPERATOR: &str = "second_operator";
    pub const YEAR: &str = "year";
    pub const QUARTER: &str = "quarter";
    pub const MONTH: &str = "month";
    pub const METRIC: &str = "metric";
}

/// Metric a trends or comparison question is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Subscribers,
    Revenue,
    Traffic,
    Investment,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Subscribers => "subscribers",
            Metric::Revenue => "revenue",
            Metric::Traffic => "traffic",
            Metric::Investment => "investment",
        }
    }

    /// Portuguese label used in answers
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Subscribers => "assinantes",
            Metric::Revenue => "receitas",
            Metric::Traffic => "tráfego",
            Metric::Investment => "investimento",
        }
    }
}

/// A typed slot value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SlotValue {
    /// Canonical operator code, e.g. `ORANGE`
    Operator(String),
    Year(i32),
    Quarter(u8),
    Month(u8),
    Metric(Metric),
    Text(String),
}

impl fmt::Display for SlotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotValue::Operator(s) | SlotValue::Text(s) => write!(f, "{}", s),
            SlotValue::Year(y) => write!(f, "{}", y),
            SlotValue::Quarter(q) => write!(f, "Q{}", q),
            SlotValue::Month(m) => write!(f, "M{:02}", m),
            SlotValue::Metric(m) => write!(f, "{}", m.as_str()),
        }
    }
}

/// Extracted slots for a single message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slots(BTreeMap<String, SlotValue>);

impl Slots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: SlotValue) {
        self.0.insert(name.into(), value);
    }

    pub fn with(mut self, name: impl Into<String>, value: SlotValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&SlotValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<SlotValue> {
        self.0.remove(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &SlotValue)> {
        self.0.iter()
    }

    pub fn operator(&self) -> Option<&str> {
        match self.0.get(names::OPERATOR) {
            Some(SlotValue::Operator(code)) => Some(code.as_str()),
            _ => None,
        }
    }

    pub fn second_operator(&self) -> Option<&str> {
        match self.0.get(names::SECOND_OPERATOR) {
            Some(SlotValue::Operator(code)) => Some(code.as_str()),
            _ => None,
        }
    }

    pub fn year(&self) -> Option<i32> {
        match self.0.get(names::YEAR) {
            Some(SlotValue::Year(y)) => Some(*y),
            _ => None,
        }
    }

    pub fn quarter(&self) -> Option<u8> {
        match self.0.get(names::QUARTER) {
            Some(SlotValue::Quarter(q)) => Some(*q),
            _ => None,
        }
    }

    pub fn month(&self) -> Option<u8> {
        match self.0.get(names::MONTH) {
            Some(SlotValue::Month(m)) => Some(*m),
            _ => None,
        }
    }

    pub fn metric(&self) -> Option<Metric> {
        match self.0.get(names::METRIC) {
            Some(SlotValue::Metric(m)) => Some(*m),
            _ => None,
        }
    }

    /// Canonical `name=value` rendering in key order
    pub fn canonical(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(";")
    }
}
