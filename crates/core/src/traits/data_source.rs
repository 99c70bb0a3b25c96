//! Regulatory data source interface

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Indicator family submitted by operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataDomain {
    Subscribers,
    Traffic,
    Revenue,
    Investment,
    Employment,
}

impl DataDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataDomain::Subscribers => "subscribers",
            DataDomain::Traffic => "traffic",
            DataDomain::Revenue => "revenue",
            DataDomain::Investment => "investment",
            DataDomain::Employment => "employment",
        }
    }

    /// Value fields reported for this domain
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            DataDomain::Subscribers => &[
                fields::PREPAID,
                fields::POSTPAID,
                fields::FIXED,
                fields::MOBILE_INTERNET,
                fields::FIXED_INTERNET,
            ],
            DataDomain::Traffic => &[fields::ON_NET, fields::OFF_NET, fields::INTERNATIONAL],
            DataDomain::Revenue => &[fields::REVENUE],
            DataDomain::Investment => &[fields::TANGIBLE, fields::INTANGIBLE],
            DataDomain::Employment => &[fields::DIRECT, fields::INDIRECT],
        }
    }
}

/// Value field names
pub mod fields {
    pub const PREPAID: &str = "prepaid";
    pub const POSTPAID: &str = "postpaid";
    pub const FIXED: &str = "fixed";
    pub const MOBILE_INTERNET: &str = "mobile_internet";
    pub const FIXED_INTERNET: &str = "fixed_internet";

    /// Minutes
    pub const ON_NET: &str = "on_net";
    pub const OFF_NET: &str = "off_net";
    pub const INTERNATIONAL: &str = "international";

    /// FCFA
    pub const REVENUE: &str = "revenue";

    pub const TANGIBLE: &str = "tangible";
    pub const INTANGIBLE: &str = "intangible";

    pub const DIRECT: &str = "direct";
    pub const INDIRECT: &str = "indirect";
}

/// Optional filters applied before aggregating
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFilters {
    pub year: Option<i32>,
    pub operator: Option<String>,
    pub quarter: Option<u8>,
    /// 1-12
    pub month: Option<u8>,
}

impl DataFilters {
    pub fn for_year(year: i32) -> Self {
        Self {
            year: Some(year),
            ..Default::default()
        }
    }

    pub fn with_operator(mut self, operator: Option<&str>) -> Self {
        self.operator = operator.map(str::to_string);
        self
    }

    pub fn with_quarter(mut self, quarter: Option<u8>) -> Self {
        self.quarter = quarter;
        self
    }

    pub fn with_month(mut self, month: Option<u8>) -> Self {
        self.month = month;
        self
    }
}

/// Summed values for one operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorAggregate {
    /// Canonical operator code
    pub operator: String,
    pub values: BTreeMap<String, f64>,
    /// Number of submissions summed
    pub record_count: u32,
}

impl OperatorAggregate {
    pub fn new(operator: impl Into<String>) -> Self {
        Self {
            operator: operator.into(),
            values: BTreeMap::new(),
            record_count: 0,
        }
    }

    pub fn with(mut self, field: &str, value: f64) -> Self {
        self.values.insert(field.to_string(), value);
        self
    }

    /// Value of a field, zero when not reported
    pub fn value(&self, field: &str) -> f64 {
        self.values.get(field).copied().unwrap_or(0.0)
    }

    pub fn sum(&self, fields: &[&str]) -> f64 {
        fields.iter().map(|f| self.value(f)).sum()
    }
}

/// Aggregates grouped by operator
///
/// No rows means no data, which is not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregates {
    pub rows: Vec<OperatorAggregate>,
}

impl Aggregates {
    pub fn new(rows: Vec<OperatorAggregate>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sum of a field across all operators
    pub fn total(&self, field: &str) -> f64 {
        self.rows.iter().map(|r| r.value(field)).sum()
    }

    pub fn record_count(&self) -> u32 {
        self.rows.iter().map(|r| r.record_count).sum()
    }

    pub fn operator(&self, code: &str) -> Option<&OperatorAggregate> {
        self.rows.iter().find(|r| r.operator == code)
    }
}

/// Data source errors
#[derive(Error, Debug, Clone)]
pub enum DataSourceError {
    #[error("Data source unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    Query(String),
}

/// Regulatory data source
///
/// Implementations must return empty aggregates rather than an error when
/// no rows match the filters.
#[async_trait]
pub trait RegulatoryDataSource: Send + Sync + 'static {
    /// Sum the domain's fields per operator
    async fn aggregate(
        &self,
        domain: DataDomain,
        filters: &DataFilters,
    ) -> Result<Aggregates, DataSourceError>;

    /// Most recent year with data for the domain
    async fn latest_year(&self, _domain: DataDomain) -> Result<Option<i32>, DataSourceError> {
        Ok(None)
    }

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_totals() {
        let aggregates = Aggregates::new(vec![
            OperatorAggregate::new("ORANGE").with(fields::PREPAID, 100.0),
            OperatorAggregate::new("TELECEL")
                .with(fields::PREPAID, 50.0)
                .with(fields::POSTPAID, 5.0),
        ]);

        assert_eq!(aggregates.total(fields::PREPAID), 150.0);
        assert_eq!(aggregates.total(fields::POSTPAID), 5.0);
        assert_eq!(aggregates.total(fields::FIXED), 0.0);
        assert_eq!(
            aggregates
                .operator("TELECEL")
                .map(|r| r.sum(&[fields::PREPAID, fields::POSTPAID])),
            Some(55.0)
        );
        assert!(aggregates.operator("OTHER").is_none());
    }
}
