//! Aggregation Dispatcher
//!
//! Routes a classified intent to its aggregation family, consulting the query
//! cache first. Data source failures are wrapped in `DataQueryError` and never
//! cached.

use std::sync::Arc;

use arn_assistant_config::OperatorConfig;
use arn_assistant_core::{
    Aggregates, Clock, DataDomain, DataFilters, DataSourceError, Metric, RegulatoryDataSource, Slots,
};
use serde_json::Value;
use thiserror::Error;

use crate::aggregation::{self, metric_domain, AggregationResult};
use crate::cache::QueryCache;
use crate::AssistantError;

/// Intents with an aggregation family
pub const SUPPORTED_INTENTS: [&str; 8] = [
    "subscriber_query",
    "traffic_analysis",
    "market_share",
    "revenue",
    "investment",
    "employment",
    "operator_comparison",
    "trends",
];

/// Years covered by a trend series
const TREND_YEARS: i32 = 5;

/// Years projected past the end of a trend series
const FORECAST_YEARS: u32 = 2;

/// Aggregation failure
#[derive(Error, Debug, Clone)]
pub enum DataQueryError {
    #[error("{} aggregation failed: {error}", .domain.as_str())]
    Source {
        domain: DataDomain,
        #[source]
        error: DataSourceError,
    },

    #[error("No aggregation for intent '{0}'")]
    Unsupported(String),

    #[error("Could not encode aggregation result: {0}")]
    Encoding(String),
}

/// Aggregation dispatcher
pub struct AggregationDispatcher {
    source: Arc<dyn RegulatoryDataSource>,
    cache: Arc<QueryCache>,
    clock: Arc<dyn Clock>,
    operators: Vec<OperatorConfig>,
}

impl AggregationDispatcher {
    pub fn new(
        source: Arc<dyn RegulatoryDataSource>,
        cache: Arc<QueryCache>,
        clock: Arc<dyn Clock>,
        operators: Vec<OperatorConfig>,
    ) -> Self {
        Self {
            source,
            cache,
            clock,
            operators,
        }
    }

    pub fn supports(intent: &str) -> bool {
        SUPPORTED_INTENTS.contains(&intent)
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Aggregate for the intent, reusing a cached result when fresh
    pub async fn dispatch(
        &self,
        intent: &str,
        slots: &Slots,
    ) -> Result<AggregationResult, DataQueryError> {
        if !Self::supports(intent) {
            return Err(DataQueryError::Unsupported(intent.to_string()));
        }

        let key = QueryCache::key(intent, slots);
        let payload = self
            .cache
            .get_or_try_compute(&key, || async {
                let result = self.compute(intent, slots).await?;
                serde_json::to_value(&result).map_err(|e| DataQueryError::Encoding(e.to_string()))
            })
            .await?;

        match serde_json::from_value::<AggregationResult>(Value::clone(&payload)) {
            Ok(result) => Ok(result),
            Err(e) => {
                let err = AssistantError::Cache(e.to_string());
                tracing::warn!(cache_key = %key, error = %err, "Discarding undecodable cache entry");
                self.cache.invalidate(&key);
                self.compute(intent, slots).await
            }
        }
    }

    async fn compute(
        &self,
        intent: &str,
        slots: &Slots,
    ) -> Result<AggregationResult, DataQueryError> {
        let operator = slots.operator();
        let quarter = slots.quarter();
        let month = slots.month();

        let result = match intent {
            "subscriber_query" => {
                let year = self.resolve_year(slots, DataDomain::Subscribers).await?;
                let filters = DataFilters::for_year(year)
                    .with_quarter(quarter)
                    .with_month(month);
                let market = self.fetch(DataDomain::Subscribers, &filters).await?;
                AggregationResult::Subscribers(aggregation::subscribers(
                    year, quarter, operator, &market,
                ))
            }
            "traffic_analysis" => {
                let year = self.resolve_year(slots, DataDomain::Traffic).await?;
                let filters = DataFilters::for_year(year)
                    .with_operator(operator)
                    .with_quarter(quarter)
                    .with_month(month);
                let data = self.fetch(DataDomain::Traffic, &filters).await?;
                AggregationResult::Traffic(aggregation::traffic(year, quarter, operator, &data))
            }
            "market_share" => {
                let year = self.resolve_year(slots, DataDomain::Subscribers).await?;
                let market = self
                    .fetch(DataDomain::Subscribers, &DataFilters::for_year(year))
                    .await?;
                AggregationResult::MarketShare(aggregation::market_share(year, operator, &market))
            }
            "revenue" => {
                let year = self.resolve_year(slots, DataDomain::Revenue).await?;
                let filters = DataFilters::for_year(year)
                    .with_operator(operator)
                    .with_quarter(quarter)
                    .with_month(month);
                let current = self.fetch(DataDomain::Revenue, &filters).await?;
                let previous = self
                    .fetch(
                        DataDomain::Revenue,
                        &DataFilters {
                            year: Some(year - 1),
                            ..filters
                        },
                    )
                    .await?;
                AggregationResult::Revenue(aggregation::revenue(
                    year, quarter, operator, &current, &previous,
                ))
            }
            "investment" => {
                let year = self.resolve_year(slots, DataDomain::Investment).await?;
                let filters = DataFilters::for_year(year).with_operator(operator);
                let data = self.fetch(DataDomain::Investment, &filters).await?;
                AggregationResult::Investment(aggregation::investment(year, operator, &data))
            }
            "employment" => {
                let year = self.resolve_year(slots, DataDomain::Employment).await?;
                let filters = DataFilters::for_year(year).with_operator(operator);
                let data = self.fetch(DataDomain::Employment, &filters).await?;
                AggregationResult::Employment(aggregation::employment(year, operator, &data))
            }
            "operator_comparison" => {
                let year = self.resolve_year(slots, DataDomain::Subscribers).await?;
                let (first, second) = self.comparison_pair(slots);
                let filters = DataFilters::for_year(year);
                let subscribers = self.fetch(DataDomain::Subscribers, &filters).await?;
                let revenue = self.fetch(DataDomain::Revenue, &filters).await?;
                let traffic = self.fetch(DataDomain::Traffic, &filters).await?;
                AggregationResult::Comparison(aggregation::comparison(
                    year,
                    &first,
                    &second,
                    &subscribers,
                    &revenue,
                    &traffic,
                ))
            }
            "trends" => {
                let metric = slots.metric().unwrap_or(Metric::Subscribers);
                let domain = metric_domain(metric);
                let end_year = self.resolve_year(slots, domain).await?;

                let mut yearly = Vec::with_capacity(TREND_YEARS as usize);
                for year in (end_year - TREND_YEARS + 1)..=end_year {
                    let filters = DataFilters::for_year(year).with_operator(operator);
                    yearly.push((year, self.fetch(domain, &filters).await?));
                }
                AggregationResult::Trends(aggregation::trends(
                    metric,
                    operator,
                    &yearly,
                    FORECAST_YEARS,
                ))
            }
            other => return Err(DataQueryError::Unsupported(other.to_string())),
        };

        tracing::debug!(intent, year = result.year(), has_data = result.has_data(), "Aggregated");
        Ok(result)
    }

    async fn fetch(
        &self,
        domain: DataDomain,
        filters: &DataFilters,
    ) -> Result<Aggregates, DataQueryError> {
        self.source.aggregate(domain, filters).await.map_err(|error| {
            tracing::error!(
                domain = domain.as_str(),
                source = self.source.name(),
                error = %error,
                "Data source query failed"
            );
            DataQueryError::Source { domain, error }
        })
    }

    /// Explicit year slot, else the latest year with data, else this year
    async fn resolve_year(&self, slots: &Slots, domain: DataDomain) -> Result<i32, DataQueryError> {
        if let Some(year) = slots.year() {
            return Ok(year);
        }

        match self.source.latest_year(domain).await {
            Ok(Some(year)) => Ok(year),
            Ok(None) => Ok(self.clock.current_year()),
            Err(error) => {
                tracing::error!(domain = domain.as_str(), error = %error, "Latest year lookup failed");
                Err(DataQueryError::Source { domain, error })
            }
        }
    }

    /// Operators to compare, defaulting to the first two configured
    fn comparison_pair(&self, slots: &Slots) -> (String, String) {
        let first = slots
            .operator()
            .map(str::to_string)
            .or_else(|| self.operators.first().map(|o| o.code.clone()))
            .unwrap_or_default();

        let second = slots
            .second_operator()
            .map(str::to_string)
            .or_else(|| {
                self.operators
                    .iter()
                    .find(|o| o.code != first)
                    .map(|o| o.code.clone())
            })
            .unwrap_or_else(|| first.clone());

        (first, second)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use arn_assistant_config::default_operators;
    use arn_assistant_core::{fields, ManualClock, OperatorAggregate, SlotValue};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Data source over fixed yearly figures that counts every call
    pub(crate) struct CountingSource {
        pub calls: AtomicUsize,
        pub fail: bool,
        pub latest: Option<i32>,
        pub seen: Mutex<Vec<(DataDomain, DataFilters)>>,
    }

    impl CountingSource {
        pub(crate) fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
                latest: Some(2023),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn row(operator: &str, domain: DataDomain, year: i32) -> OperatorAggregate {
        // figures grow linearly from 2019; TELECEL is half of ORANGE
        let factor = (10 + year - 2019) as f64;
        let base = if operator == "ORANGE" { 1.0 } else { 0.5 };
        let mut row = match domain {
            DataDomain::Subscribers => OperatorAggregate::new(operator)
                .with(fields::PREPAID, 80_000.0 * base * factor)
                .with(fields::POSTPAID, 20_000.0 * base * factor),
            DataDomain::Traffic => OperatorAggregate::new(operator)
                .with(fields::ON_NET, 600_000.0 * base * factor)
                .with(fields::OFF_NET, 300_000.0 * base * factor)
                .with(fields::INTERNATIONAL, 100_000.0 * base * factor),
            DataDomain::Revenue => {
                OperatorAggregate::new(operator).with(fields::REVENUE, 400_000_000.0 * base * factor)
            }
            DataDomain::Investment => OperatorAggregate::new(operator)
                .with(fields::TANGIBLE, 300_000_000.0 * base)
                .with(fields::INTANGIBLE, 100_000_000.0 * base),
            DataDomain::Employment => OperatorAggregate::new(operator)
                .with(fields::DIRECT, 200.0 * base)
                .with(fields::INDIRECT, 800.0 * base),
        };
        row.record_count = 4;
        row
    }

    #[async_trait]
    impl RegulatoryDataSource for CountingSource {
        async fn aggregate(
            &self,
            domain: DataDomain,
            filters: &DataFilters,
        ) -> Result<Aggregates, DataSourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().push((domain, filters.clone()));
            if self.fail {
                return Err(DataSourceError::Unavailable("connection refused".into()));
            }

            let year = filters.year.unwrap_or(2023);
            if !(2019..=2023).contains(&year) {
                return Ok(Aggregates::default());
            }

            let rows = ["ORANGE", "TELECEL"]
                .iter()
                .filter(|op| filters.operator.as_deref().map_or(true, |f| f == **op))
                .map(|op| row(op, domain, year))
                .collect();
            Ok(Aggregates::new(rows))
        }

        async fn latest_year(&self, _domain: DataDomain) -> Result<Option<i32>, DataSourceError> {
            Ok(self.latest)
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    pub(crate) fn test_clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap(),
        ))
    }

    fn dispatcher(source: Arc<CountingSource>) -> AggregationDispatcher {
        let clock = test_clock();
        let cache = Arc::new(QueryCache::new(clock.clone(), Duration::from_secs(1800)));
        AggregationDispatcher::new(source, cache, clock, default_operators())
    }

    fn orange_2023() -> Slots {
        Slots::new()
            .with("operator", SlotValue::Operator("ORANGE".into()))
            .with("year", SlotValue::Year(2023))
    }

    #[tokio::test]
    async fn test_subscriber_query() {
        let source = Arc::new(CountingSource::new());
        let dispatcher = dispatcher(source.clone());

        let result = dispatcher
            .dispatch("subscriber_query", &orange_2023())
            .await
            .unwrap();

        match result {
            AggregationResult::Subscribers(summary) => {
                assert_eq!(summary.year, 2023);
                assert_eq!(summary.total, 1_400_000.0);
                assert_eq!(summary.market_total, 2_100_000.0);
                assert_eq!(summary.operator_entry().unwrap().market_share, 66.67);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_second_dispatch_is_cached() {
        let source = Arc::new(CountingSource::new());
        let dispatcher = dispatcher(source.clone());
        let slots = orange_2023();
        let key = QueryCache::key("subscriber_query", &slots);

        let first = dispatcher.dispatch("subscriber_query", &slots).await.unwrap();
        assert_eq!(source.calls(), 1);
        assert_eq!(dispatcher.cache().entry_hits(&key), Some(0));

        let second = dispatcher.dispatch("subscriber_query", &slots).await.unwrap();
        assert_eq!(source.calls(), 1);
        assert_eq!(dispatcher.cache().entry_hits(&key), Some(1));
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_failures_are_wrapped_and_not_cached() {
        let source = Arc::new(CountingSource::failing());
        let dispatcher = dispatcher(source.clone());

        let err = dispatcher
            .dispatch("revenue", &orange_2023())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DataQueryError::Source {
                domain: DataDomain::Revenue,
                ..
            }
        ));
        assert!(dispatcher.cache().is_empty());

        dispatcher.dispatch("revenue", &orange_2023()).await.unwrap_err();
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_unsupported_intent() {
        let dispatcher = dispatcher(Arc::new(CountingSource::new()));
        let err = dispatcher.dispatch("tariffs", &Slots::new()).await.unwrap_err();
        assert!(matches!(err, DataQueryError::Unsupported(name) if name == "tariffs"));
    }

    #[tokio::test]
    async fn test_year_defaults() {
        let source = Arc::new(CountingSource::new());
        let dispatcher = dispatcher(source.clone());

        let result = dispatcher.dispatch("market_share", &Slots::new()).await.unwrap();
        assert_eq!(result.year(), 2023);

        let source = Arc::new(CountingSource {
            latest: None,
            ..CountingSource::new()
        });
        let dispatcher = super::tests::dispatcher(source);
        let result = dispatcher.dispatch("market_share", &Slots::new()).await.unwrap();
        // falls back to the clock's year, which has no data
        assert_eq!(result.year(), 2025);
        assert!(!result.has_data());
    }

    #[tokio::test]
    async fn test_revenue_queries_previous_year() {
        let source = Arc::new(CountingSource::new());
        let dispatcher = dispatcher(source.clone());

        let result = dispatcher.dispatch("revenue", &orange_2023()).await.unwrap();
        let seen = source.seen.lock().clone();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].1.year, Some(2022));
        assert_eq!(seen[1].1.operator.as_deref(), Some("ORANGE"));

        match result {
            AggregationResult::Revenue(summary) => {
                assert_eq!(summary.growth, Some(7.69));
                assert_eq!(summary.quarterly_average, 1_400_000_000.0);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_month_narrows_filters() {
        let source = Arc::new(CountingSource::new());
        let dispatcher = dispatcher(source.clone());
        let slots = orange_2023().with("month", SlotValue::Month(3));

        dispatcher.dispatch("revenue", &slots).await.unwrap();
        let seen = source.seen.lock().clone();
        assert_eq!(seen[0].1.month, Some(3));
        assert_eq!(seen[1].1.month, Some(3));

        // a month is a distinct question for the cache
        dispatcher.dispatch("revenue", &orange_2023()).await.unwrap();
        assert_eq!(dispatcher.cache().len(), 2);
        assert_eq!(source.seen.lock().last().map(|(_, f)| f.month), Some(None));
    }

    #[tokio::test]
    async fn test_comparison_defaults_to_configured_operators() {
        let dispatcher = dispatcher(Arc::new(CountingSource::new()));
        let slots = Slots::new().with("year", SlotValue::Year(2023));

        match dispatcher.dispatch("operator_comparison", &slots).await.unwrap() {
            AggregationResult::Comparison(cmp) => {
                assert_eq!(cmp.first.operator, "ORANGE");
                assert_eq!(cmp.second.operator, "TELECEL");
                assert_eq!(cmp.differences.subscribers, 700_000.0);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_trends_cover_five_years() {
        let source = Arc::new(CountingSource::new());
        let dispatcher = dispatcher(source.clone());
        let slots = Slots::new().with("metric", SlotValue::Metric(Metric::Revenue));

        match dispatcher.dispatch("trends", &slots).await.unwrap() {
            AggregationResult::Trends(summary) => {
                assert_eq!(summary.start_year, 2019);
                assert_eq!(summary.end_year, 2023);
                assert_eq!(summary.series.len(), 5);
                let forecast = summary.forecast.unwrap();
                assert_eq!(forecast.projections.len(), 2);
                assert_eq!(forecast.confidence, 100.0);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(source.calls(), 5);
    }
}
