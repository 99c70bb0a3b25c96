//! In-memory regulatory dataset
//!
//! Operator questionnaire submissions loaded from a JSON or YAML file and
//! summed per operator on demand. Each record is one operator's report for
//! one domain and period.

use std::collections::BTreeMap;
use std::path::Path;

use arn_assistant_core::{
    Aggregates, DataDomain, DataFilters, DataSourceError, OperatorAggregate, RegulatoryDataSource,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Failed to read dataset {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse dataset: {0}")]
    Parse(String),

    #[error("Invalid record {index}: {message}")]
    InvalidRecord { index: usize, message: String },
}

/// One operator submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRecord {
    pub domain: DataDomain,
    /// Canonical operator code
    pub operator: String,
    pub year: i32,
    /// 1-12
    #[serde(default)]
    pub month: Option<u8>,
    /// 1-4; derived from `month` when absent
    #[serde(default)]
    pub quarter: Option<u8>,
    #[serde(default)]
    pub values: BTreeMap<String, f64>,
}

impl IndicatorRecord {
    pub fn new(domain: DataDomain, operator: &str, year: i32) -> Self {
        Self {
            domain,
            operator: operator.to_string(),
            year,
            month: None,
            quarter: None,
            values: BTreeMap::new(),
        }
    }

    pub fn in_quarter(mut self, quarter: u8) -> Self {
        self.quarter = Some(quarter);
        self
    }

    pub fn in_month(mut self, month: u8) -> Self {
        self.month = Some(month);
        self
    }

    pub fn with(mut self, field: &str, value: f64) -> Self {
        self.values.insert(field.to_string(), value);
        self
    }

    pub fn effective_quarter(&self) -> Option<u8> {
        self.quarter
            .or_else(|| self.month.map(|m| (m.saturating_sub(1)) / 3 + 1))
    }

    fn matches(&self, domain: DataDomain, filters: &DataFilters) -> bool {
        self.domain == domain
            && filters.year.map_or(true, |y| self.year == y)
            && filters
                .operator
                .as_deref()
                .map_or(true, |op| self.operator.eq_ignore_ascii_case(op))
            && filters
                .quarter
                .map_or(true, |q| self.effective_quarter() == Some(q))
            && filters.month.map_or(true, |m| self.month == Some(m))
    }

    fn validate(&self, index: usize) -> Result<(), DatasetError> {
        let invalid = |message: String| DatasetError::InvalidRecord { index, message };

        if self.operator.trim().is_empty() {
            return Err(invalid("operator is empty".to_string()));
        }
        if let Some(month) = self.month {
            if !(1..=12).contains(&month) {
                return Err(invalid(format!("month {} out of range", month)));
            }
        }
        if let Some(quarter) = self.quarter {
            if !(1..=4).contains(&quarter) {
                return Err(invalid(format!("quarter {} out of range", quarter)));
            }
        }
        let allowed = self.domain.fields();
        if let Some(field) = self.values.keys().find(|f| !allowed.contains(&f.as_str())) {
            return Err(invalid(format!(
                "field '{}' is not reported for {}",
                field,
                self.domain.as_str()
            )));
        }
        Ok(())
    }
}

/// Regulatory data source over records held in memory
#[derive(Debug, Default)]
pub struct InMemoryDataSource {
    records: Vec<IndicatorRecord>,
}

impl InMemoryDataSource {
    pub fn new(records: Vec<IndicatorRecord>) -> Result<Self, DatasetError> {
        for (index, record) in records.iter().enumerate() {
            record.validate(index)?;
        }
        let records = records
            .into_iter()
            .map(|mut r| {
                r.operator = r.operator.trim().to_uppercase();
                r
            })
            .collect();
        Ok(Self { records })
    }

    /// Load a `.yaml`/`.yml` or JSON file holding a list of records
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| DatasetError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let records: Vec<IndicatorRecord> = if is_yaml {
            serde_yaml::from_str(&content).map_err(|e| DatasetError::Parse(e.to_string()))?
        } else {
            serde_json::from_str(&content).map_err(|e| DatasetError::Parse(e.to_string()))?
        };

        let source = Self::new(records)?;
        tracing::info!(
            path = %path.display(),
            records = source.len(),
            "Loaded regulatory dataset"
        );
        Ok(source)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RegulatoryDataSource for InMemoryDataSource {
    async fn aggregate(
        &self,
        domain: DataDomain,
        filters: &DataFilters,
    ) -> Result<Aggregates, DataSourceError> {
        let mut by_operator: BTreeMap<&str, OperatorAggregate> = BTreeMap::new();

        for record in self.records.iter().filter(|r| r.matches(domain, filters)) {
            let row = by_operator
                .entry(record.operator.as_str())
                .or_insert_with(|| OperatorAggregate::new(record.operator.as_str()));
            for field in domain.fields() {
                let value = record.values.get(*field).copied().unwrap_or(0.0);
                *row.values.entry(field.to_string()).or_insert(0.0) += value;
            }
            row.record_count += 1;
        }

        Ok(Aggregates::new(by_operator.into_values().collect()))
    }

    async fn latest_year(&self, domain: DataDomain) -> Result<Option<i32>, DataSourceError> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.domain == domain)
            .map(|r| r.year)
            .max())
    }

    fn name(&self) -> &str {
        "in_memory"
    }
}
