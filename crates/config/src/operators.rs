//! Operator alias table

use serde::{Deserialize, Serialize};

/// A licensed operator and the surface forms users write it with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Canonical code stored in the dataset, e.g. `ORANGE`
    pub code: String,
    /// Name used in answers
    pub display_name: String,
    /// Lower-case aliases
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl OperatorConfig {
    pub fn new(code: &str, display_name: &str, aliases: &[&str]) -> Self {
        Self {
            code: code.to_string(),
            display_name: display_name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Operators active in Guinea-Bissau
///
/// TELECEL took over the former MTN licence, so the old names still resolve to it.
pub fn default_operators() -> Vec<OperatorConfig> {
    vec![
        OperatorConfig::new("ORANGE", "Orange", &["orange", "orange bissau"]),
        OperatorConfig::new("TELECEL", "TELECEL", &["telecel", "mtn", "antiga mtn", "areeba"]),
    ]
}
