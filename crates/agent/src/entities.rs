//! Entity Extraction
//!
//! Pulls typed slots out of an utterance with compiled per-slot rules. Only
//! the slots the winning intent expects are extracted; anything missing is
//! left for the dispatcher to default.

use arn_assistant_config::OperatorConfig;
use arn_assistant_core::slots::names;
use arn_assistant_core::{Metric, SlotValue, Slots};
use regex::Regex;

use crate::AssistantError;

const MONTHS: [(&str, u8); 13] = [
    ("janeiro", 1),
    ("fevereiro", 2),
    ("março", 3),
    ("marco", 3),
    ("abril", 4),
    ("maio", 5),
    ("junho", 6),
    ("julho", 7),
    ("agosto", 8),
    ("setembro", 9),
    ("outubro", 10),
    ("novembro", 11),
    ("dezembro", 12),
];

struct OperatorMatcher {
    code: String,
    regex: Regex,
}

/// Entity extractor
pub struct EntityExtractor {
    operators: Vec<OperatorMatcher>,
    year: Regex,
    previous_year: Regex,
    this_year: Regex,
    quarter: Vec<Regex>,
    month_number: Regex,
    month_name: Regex,
    metrics: Vec<(Metric, Regex)>,
}

impl EntityExtractor {
    pub fn new(operators: &[OperatorConfig]) -> Result<Self, AssistantError> {
        let operators = operators
            .iter()
            .filter(|op| !op.aliases.is_empty())
            .map(|op| {
                let mut aliases: Vec<String> = op
                    .aliases
                    .iter()
                    .map(|a| regex::escape(&a.trim().to_lowercase()))
                    .collect();
                // longest alias first so "orange bissau" wins over "orange"
                aliases.sort_by_key(|a| std::cmp::Reverse(a.len()));
                let regex = compile(&format!(r"(?i)\b(?:{})\b", aliases.join("|")))?;
                Ok(OperatorMatcher {
                    code: op.code.clone(),
                    regex,
                })
            })
            .collect::<Result<Vec<_>, AssistantError>>()?;

        let month_names = MONTHS
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join("|");

        Ok(Self {
            operators,
            year: compile(r"\b(20\d{2})\b")?,
            previous_year: compile(r"(?i)\b(ano\s+passado|último\s+ano|ultimo\s+ano)\b")?,
            this_year: compile(r"(?i)\b(d?este\s+ano|ano\s+atual|ano\s+corrente)\b")?,
            quarter: vec![
                compile(r"(?i)\b([1-4])\s*[º°o]?\s*trimestre\b")?,
                compile(r"(?i)\btrimestre\s+([1-4])\b")?,
                compile(r"(?i)\bq([1-4])\b")?,
            ],
            month_number: compile(r"(?i)\bm[eê]s\s+(\d{1,2})\b")?,
            month_name: compile(&format!(r"(?i)\b({})\b", month_names))?,
            metrics: vec![
                (
                    Metric::Subscribers,
                    compile(r"(?i)\b(assinantes?|clientes?|utilizadores?)\b")?,
                ),
                (
                    Metric::Revenue,
                    compile(r"(?i)\b(receitas?|faturamento|fcfa)\b")?,
                ),
                (
                    Metric::Traffic,
                    compile(r"(?i)\b(tráfego|trafego|chamadas?|minutos?)\b")?,
                ),
                (
                    Metric::Investment,
                    compile(r"(?i)\b(investimentos?|capex|gastos)\b")?,
                ),
            ],
        })
    }

    /// Extract the expected slots
    ///
    /// `current_year` resolves relative expressions like "ano passado".
    pub fn extract(&self, text: &str, expected: &[String], current_year: i32) -> Slots {
        let mut slots = Slots::new();
        let expects = |name: &str| expected.iter().any(|s| s == name);

        if expects(names::OPERATOR) || expects(names::SECOND_OPERATOR) {
            let mentioned = self.operators_in_order(text);
            if expects(names::OPERATOR) {
                if let Some(first) = mentioned.first() {
                    slots.insert(names::OPERATOR, SlotValue::Operator(first.clone()));
                }
            }
            if expects(names::SECOND_OPERATOR) {
                if let Some(second) = mentioned.get(1) {
                    slots.insert(names::SECOND_OPERATOR, SlotValue::Operator(second.clone()));
                }
            }
        }

        if expects(names::YEAR) {
            if let Some(year) = self.extract_year(text, current_year) {
                slots.insert(names::YEAR, SlotValue::Year(year));
            }
        }

        if expects(names::QUARTER) {
            if let Some(quarter) = self.extract_quarter(text) {
                slots.insert(names::QUARTER, SlotValue::Quarter(quarter));
            }
        }

        if expects(names::MONTH) {
            if let Some(month) = self.extract_month(text) {
                slots.insert(names::MONTH, SlotValue::Month(month));
            }
        }

        if expects(names::METRIC) {
            if let Some(metric) = self.extract_metric(text) {
                slots.insert(names::METRIC, SlotValue::Metric(metric));
            }
        }

        tracing::debug!(slots = %slots.canonical(), "Extracted entities");
        slots
    }

    /// Distinct operator codes in order of first mention
    fn operators_in_order(&self, text: &str) -> Vec<String> {
        let mut hits: Vec<(usize, &str)> = self
            .operators
            .iter()
            .filter_map(|op| op.regex.find(text).map(|m| (m.start(), op.code.as_str())))
            .collect();
        hits.sort_by_key(|(start, _)| *start);

        let mut codes: Vec<String> = Vec::with_capacity(hits.len());
        for (_, code) in hits {
            if !codes.iter().any(|c| c == code) {
                codes.push(code.to_string());
            }
        }
        codes
    }

    /// An explicit year always beats a relative expression
    fn extract_year(&self, text: &str, current_year: i32) -> Option<i32> {
        if let Some(caps) = self.year.captures(text) {
            return caps.get(1).and_then(|m| m.as_str().parse().ok());
        }
        if self.previous_year.is_match(text) {
            return Some(current_year - 1);
        }
        if self.this_year.is_match(text) {
            return Some(current_year);
        }
        None
    }

    fn extract_quarter(&self, text: &str) -> Option<u8> {
        self.quarter
            .iter()
            .filter_map(|re| re.captures(text))
            .filter_map(|caps| caps.get(1).map(|m| (m.start(), m.as_str())))
            .min_by_key(|(start, _)| *start)
            .and_then(|(_, value)| value.parse().ok())
    }

    fn extract_month(&self, text: &str) -> Option<u8> {
        let numeric = self
            .month_number
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u8>().ok().map(|v| (m.start(), v)))
            .filter(|(_, v)| (1..=12).contains(v));

        let named = self.month_name.find(text).and_then(|m| {
            let name = m.as_str().to_lowercase();
            MONTHS
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| (m.start(), *v))
        });

        match (numeric, named) {
            (Some(a), Some(b)) => Some(if a.0 <= b.0 { a.1 } else { b.1 }),
            (a, b) => a.or(b).map(|(_, v)| v),
        }
    }

    fn extract_metric(&self, text: &str) -> Option<Metric> {
        self.metrics
            .iter()
            .filter_map(|(metric, re)| re.find(text).map(|m| (m.start(), *metric)))
            .min_by_key(|(start, _)| *start)
            .map(|(_, metric)| metric)
    }
}

fn compile(source: &str) -> Result<Regex, AssistantError> {
    Regex::new(source).map_err(|e| AssistantError::Config(format!("Invalid entity rule: {}", e)))
}
