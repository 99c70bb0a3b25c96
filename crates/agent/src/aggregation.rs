//! Aggregation families
//!
//! Pure functions that turn per-operator sums from the data source into the
//! structured result of each intent family. Every family shares
//! `AggregationResult`, so the synthesizer handles them uniformly.

use std::cmp::Ordering;

use arn_assistant_core::{fields, Aggregates, DataDomain, Metric};
use serde::{Deserialize, Serialize};

use crate::forecast::{forecast, round_to, Forecast, SeriesPoint};

/// Structured result of an aggregation, tagged by family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum AggregationResult {
    Subscribers(SubscriberSummary),
    Traffic(TrafficSummary),
    MarketShare(MarketShareSummary),
    Revenue(RevenueSummary),
    Investment(InvestmentSummary),
    Employment(EmploymentSummary),
    Comparison(OperatorComparison),
    Trends(TrendSummary),
}

impl AggregationResult {
    /// Reference year of the result (last year of a trend)
    pub fn year(&self) -> i32 {
        match self {
            AggregationResult::Subscribers(s) => s.year,
            AggregationResult::Traffic(s) => s.year,
            AggregationResult::MarketShare(s) => s.year,
            AggregationResult::Revenue(s) => s.year,
            AggregationResult::Investment(s) => s.year,
            AggregationResult::Employment(s) => s.year,
            AggregationResult::Comparison(s) => s.year,
            AggregationResult::Trends(s) => s.end_year,
        }
    }

    /// Whether the data source returned anything at all
    pub fn has_data(&self) -> bool {
        match self {
            AggregationResult::Subscribers(s) => match s.operator {
                // a named operator without rows has no data even when the market does
                Some(_) => s.operator_entry().is_some_and(|e| e.total > 0.0),
                None => s.market_total > 0.0,
            },
            AggregationResult::Traffic(s) => s.total > 0.0,
            AggregationResult::MarketShare(s) => s.market_total > 0.0,
            AggregationResult::Revenue(s) => s.total > 0.0,
            AggregationResult::Investment(s) => s.total > 0.0,
            AggregationResult::Employment(s) => s.total > 0.0,
            AggregationResult::Comparison(s) => s.first.has_data() || s.second.has_data(),
            AggregationResult::Trends(s) => s.series.iter().any(|p| p.value > 0.0),
        }
    }
}

fn percentage(part: f64, whole: f64, decimals: i32) -> f64 {
    if whole > 0.0 {
        round_to(part / whole * 100.0, decimals)
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Subscribers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorSubscribers {
    pub operator: String,
    pub total: f64,
    /// Share of the whole market, two decimals
    pub market_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriberSummary {
    pub year: i32,
    pub operator: Option<String>,
    pub quarter: Option<u8>,
    pub prepaid: f64,
    pub postpaid: f64,
    pub fixed: f64,
    pub mobile_internet: f64,
    pub fixed_internet: f64,
    /// Total for the selected scope (one operator or the market)
    pub total: f64,
    pub market_total: f64,
    pub by_operator: Vec<OperatorSubscribers>,
}

impl SubscriberSummary {
    pub fn operator_entry(&self) -> Option<&OperatorSubscribers> {
        let code = self.operator.as_deref()?;
        self.by_operator.iter().find(|o| o.operator == code)
    }
}

/// `market` must hold every operator so shares are relative to the market
pub fn subscribers(
    year: i32,
    quarter: Option<u8>,
    operator: Option<&str>,
    market: &Aggregates,
) -> SubscriberSummary {
    let line_types = DataDomain::Subscribers.fields();
    let market_total: f64 = market.rows.iter().map(|r| r.sum(line_types)).sum();

    let by_operator = market
        .rows
        .iter()
        .map(|r| {
            let total = r.sum(line_types);
            OperatorSubscribers {
                operator: r.operator.clone(),
                total,
                market_share: percentage(total, market_total, 2),
            }
        })
        .collect();

    let scoped: Vec<_> = market
        .rows
        .iter()
        .filter(|r| operator.map_or(true, |code| r.operator == code))
        .collect();
    let sum = |field: &str| scoped.iter().map(|r| r.value(field)).sum::<f64>();

    let prepaid = sum(fields::PREPAID);
    let postpaid = sum(fields::POSTPAID);
    let fixed = sum(fields::FIXED);
    let mobile_internet = sum(fields::MOBILE_INTERNET);
    let fixed_internet = sum(fields::FIXED_INTERNET);

    SubscriberSummary {
        year,
        operator: operator.map(str::to_string),
        quarter,
        prepaid,
        postpaid,
        fixed,
        mobile_internet,
        fixed_internet,
        total: prepaid + postpaid + fixed + mobile_internet + fixed_internet,
        market_total,
        by_operator,
    }
}

// ---------------------------------------------------------------------------
// Traffic
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorTraffic {
    pub operator: String,
    pub on_net: f64,
    pub off_net: f64,
    pub international: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficSummary {
    pub year: i32,
    pub operator: Option<String>,
    pub quarter: Option<u8>,
    /// Minutes
    pub on_net: f64,
    pub off_net: f64,
    pub international: f64,
    pub total: f64,
    /// Shares of total, one decimal
    pub on_net_pct: f64,
    pub off_net_pct: f64,
    pub international_pct: f64,
    pub by_operator: Vec<OperatorTraffic>,
}

pub fn traffic(
    year: i32,
    quarter: Option<u8>,
    operator: Option<&str>,
    data: &Aggregates,
) -> TrafficSummary {
    let on_net = data.total(fields::ON_NET);
    let off_net = data.total(fields::OFF_NET);
    let international = data.total(fields::INTERNATIONAL);
    let total = on_net + off_net + international;

    let by_operator = data
        .rows
        .iter()
        .map(|r| OperatorTraffic {
            operator: r.operator.clone(),
            on_net: r.value(fields::ON_NET),
            off_net: r.value(fields::OFF_NET),
            international: r.value(fields::INTERNATIONAL),
            total: r.sum(DataDomain::Traffic.fields()),
        })
        .collect();

    TrafficSummary {
        year,
        operator: operator.map(str::to_string),
        quarter,
        on_net,
        off_net,
        international,
        total,
        on_net_pct: percentage(on_net, total, 1),
        off_net_pct: percentage(off_net, total, 1),
        international_pct: percentage(international, total, 1),
        by_operator,
    }
}

// ---------------------------------------------------------------------------
// Market share
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareEntry {
    pub operator: String,
    /// Prepaid plus postpaid
    pub subscribers: f64,
    /// Two decimals
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketShareSummary {
    pub year: i32,
    /// Operator the question asked about, if any
    pub operator: Option<String>,
    pub market_total: f64,
    /// Sorted by descending share, then operator code
    pub distribution: Vec<ShareEntry>,
    pub leader: Option<ShareEntry>,
}

pub fn market_share(year: i32, operator: Option<&str>, market: &Aggregates) -> MarketShareSummary {
    let mobile = [fields::PREPAID, fields::POSTPAID];
    let market_total: f64 = market.rows.iter().map(|r| r.sum(&mobile)).sum();

    let mut distribution: Vec<ShareEntry> = market
        .rows
        .iter()
        .map(|r| {
            let subscribers = r.sum(&mobile);
            ShareEntry {
                operator: r.operator.clone(),
                subscribers,
                share: percentage(subscribers, market_total, 2),
            }
        })
        .collect();

    distribution.sort_by(|a, b| {
        b.share
            .partial_cmp(&a.share)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.operator.cmp(&b.operator))
    });

    let leader = distribution
        .first()
        .filter(|entry| entry.subscribers > 0.0)
        .cloned();

    MarketShareSummary {
        year,
        operator: operator.map(str::to_string),
        market_total,
        distribution,
        leader,
    }
}

// ---------------------------------------------------------------------------
// Revenue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorRevenue {
    pub operator: String,
    /// FCFA
    pub total: f64,
    /// Average per submitted record
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueSummary {
    pub year: i32,
    pub operator: Option<String>,
    pub quarter: Option<u8>,
    /// FCFA
    pub total: f64,
    pub quarterly_average: f64,
    pub by_operator: Vec<OperatorRevenue>,
    pub previous_year_total: f64,
    /// Year-over-year growth in percent, absent without a previous year
    pub growth: Option<f64>,
}

fn average(total: f64, records: u32) -> f64 {
    if records > 0 {
        total / records as f64
    } else {
        0.0
    }
}

pub fn revenue(
    year: i32,
    quarter: Option<u8>,
    operator: Option<&str>,
    current: &Aggregates,
    previous: &Aggregates,
) -> RevenueSummary {
    let total = current.total(fields::REVENUE);
    let previous_year_total = previous.total(fields::REVENUE);

    let growth = (previous_year_total > 0.0 && total > 0.0)
        .then(|| round_to((total - previous_year_total) / previous_year_total * 100.0, 2));

    let by_operator = current
        .rows
        .iter()
        .map(|r| {
            let total = r.value(fields::REVENUE);
            OperatorRevenue {
                operator: r.operator.clone(),
                total,
                average: average(total, r.record_count),
            }
        })
        .collect();

    RevenueSummary {
        year,
        operator: operator.map(str::to_string),
        quarter,
        total,
        quarterly_average: average(total, current.record_count()),
        by_operator,
        previous_year_total,
        growth,
    }
}

// ---------------------------------------------------------------------------
// Investment and employment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorInvestment {
    pub operator: String,
    pub tangible: f64,
    pub intangible: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentSummary {
    pub year: i32,
    pub operator: Option<String>,
    /// FCFA
    pub tangible: f64,
    pub intangible: f64,
    pub total: f64,
    pub by_operator: Vec<OperatorInvestment>,
}

pub fn investment(year: i32, operator: Option<&str>, data: &Aggregates) -> InvestmentSummary {
    let tangible = data.total(fields::TANGIBLE);
    let intangible = data.total(fields::INTANGIBLE);

    InvestmentSummary {
        year,
        operator: operator.map(str::to_string),
        tangible,
        intangible,
        total: tangible + intangible,
        by_operator: data
            .rows
            .iter()
            .map(|r| OperatorInvestment {
                operator: r.operator.clone(),
                tangible: r.value(fields::TANGIBLE),
                intangible: r.value(fields::INTANGIBLE),
                total: r.sum(DataDomain::Investment.fields()),
            })
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorEmployment {
    pub operator: String,
    pub direct: f64,
    pub indirect: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmploymentSummary {
    pub year: i32,
    pub operator: Option<String>,
    /// Headcount
    pub direct: f64,
    pub indirect: f64,
    pub total: f64,
    pub by_operator: Vec<OperatorEmployment>,
}

pub fn employment(year: i32, operator: Option<&str>, data: &Aggregates) -> EmploymentSummary {
    let direct = data.total(fields::DIRECT);
    let indirect = data.total(fields::INDIRECT);

    EmploymentSummary {
        year,
        operator: operator.map(str::to_string),
        direct,
        indirect,
        total: direct + indirect,
        by_operator: data
            .rows
            .iter()
            .map(|r| OperatorEmployment {
                operator: r.operator.clone(),
                direct: r.value(fields::DIRECT),
                indirect: r.value(fields::INDIRECT),
                total: r.sum(DataDomain::Employment.fields()),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Operator comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatorFigures {
    pub operator: String,
    pub subscribers: f64,
    /// FCFA
    pub revenue: f64,
    /// Minutes
    pub traffic: f64,
}

impl OperatorFigures {
    fn has_data(&self) -> bool {
        self.subscribers > 0.0 || self.revenue > 0.0 || self.traffic > 0.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FigureDifferences {
    pub subscribers: f64,
    pub revenue: f64,
    pub traffic: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorComparison {
    pub year: i32,
    pub first: OperatorFigures,
    pub second: OperatorFigures,
    /// First minus second
    pub differences: FigureDifferences,
}

fn figures(
    operator: &str,
    subscribers: &Aggregates,
    revenue: &Aggregates,
    traffic: &Aggregates,
) -> OperatorFigures {
    let pick = |data: &Aggregates, domain: DataDomain| {
        data.operator(operator)
            .map(|r| r.sum(domain.fields()))
            .unwrap_or(0.0)
    };

    OperatorFigures {
        operator: operator.to_string(),
        subscribers: pick(subscribers, DataDomain::Subscribers),
        revenue: pick(revenue, DataDomain::Revenue),
        traffic: pick(traffic, DataDomain::Traffic),
    }
}

pub fn comparison(
    year: i32,
    first: &str,
    second: &str,
    subscribers: &Aggregates,
    revenue: &Aggregates,
    traffic: &Aggregates,
) -> OperatorComparison {
    let first = figures(first, subscribers, revenue, traffic);
    let second = figures(second, subscribers, revenue, traffic);
    let differences = FigureDifferences {
        subscribers: first.subscribers - second.subscribers,
        revenue: first.revenue - second.revenue,
        traffic: first.traffic - second.traffic,
    };

    OperatorComparison {
        year,
        first,
        second,
        differences,
    }
}

// ---------------------------------------------------------------------------
// Trends
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub metric: Metric,
    pub operator: Option<String>,
    pub start_year: i32,
    pub end_year: i32,
    pub series: Vec<SeriesPoint>,
    /// Absent with fewer than two years of data
    pub forecast: Option<Forecast>,
}

/// Domain holding a metric's values
pub fn metric_domain(metric: Metric) -> DataDomain {
    match metric {
        Metric::Subscribers => DataDomain::Subscribers,
        Metric::Revenue => DataDomain::Revenue,
        Metric::Traffic => DataDomain::Traffic,
        Metric::Investment => DataDomain::Investment,
    }
}

/// `yearly` holds one aggregate per year, oldest first
pub fn trends(
    metric: Metric,
    operator: Option<&str>,
    yearly: &[(i32, Aggregates)],
    years_ahead: u32,
) -> TrendSummary {
    let fields = metric_domain(metric).fields();
    let series: Vec<SeriesPoint> = yearly
        .iter()
        .map(|(year, data)| SeriesPoint {
            year: *year,
            value: data.rows.iter().map(|r| r.sum(fields)).sum(),
        })
        .collect();

    TrendSummary {
        metric,
        operator: operator.map(str::to_string),
        start_year: yearly.first().map(|(y, _)| *y).unwrap_or_default(),
        end_year: yearly.last().map(|(y, _)| *y).unwrap_or_default(),
        forecast: forecast(&series, years_ahead),
        series,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arn_assistant_core::OperatorAggregate;

    fn market() -> Aggregates {
        Aggregates::new(vec![
            OperatorAggregate::new("ORANGE")
                .with(fields::PREPAID, 600.0)
                .with(fields::POSTPAID, 100.0)
                .with(fields::MOBILE_INTERNET, 300.0),
            OperatorAggregate::new("TELECEL")
                .with(fields::PREPAID, 250.0)
                .with(fields::POSTPAID, 50.0)
                .with(fields::FIXED, 0.0),
        ])
    }

    #[test]
    fn test_subscribers_for_operator() {
        let summary = subscribers(2023, None, Some("ORANGE"), &market());

        assert_eq!(summary.total, 1000.0);
        assert_eq!(summary.market_total, 1300.0);
        let entry = summary.operator_entry().unwrap();
        assert_eq!(entry.market_share, 76.92);
    }

    #[test]
    fn test_subscribers_for_market() {
        let summary = subscribers(2023, None, None, &market());

        assert_eq!(summary.total, 1300.0);
        assert_eq!(summary.prepaid, 850.0);
        assert_eq!(summary.by_operator.len(), 2);
        assert!(summary.operator_entry().is_none());
    }

    #[test]
    fn test_traffic_percentages() {
        let data = Aggregates::new(vec![OperatorAggregate::new("ORANGE")
            .with(fields::ON_NET, 700.0)
            .with(fields::OFF_NET, 200.0)
            .with(fields::INTERNATIONAL, 100.0)]);
        let summary = traffic(2023, None, None, &data);

        assert_eq!(summary.total, 1000.0);
        assert_eq!(summary.on_net_pct, 70.0);
        assert_eq!(summary.international_pct, 10.0);
    }

    #[test]
    fn test_traffic_without_data() {
        let summary = traffic(2023, None, None, &Aggregates::default());
        assert_eq!(summary.on_net_pct, 0.0);
        assert!(!AggregationResult::Traffic(summary).has_data());
    }

    #[test]
    fn test_market_share_ranking() {
        let summary = market_share(2023, None, &market());

        assert_eq!(summary.market_total, 1000.0);
        assert_eq!(summary.distribution[0].operator, "ORANGE");
        assert_eq!(summary.distribution[0].share, 70.0);
        assert_eq!(summary.distribution[1].share, 30.0);
        assert_eq!(summary.leader.unwrap().operator, "ORANGE");
    }

    #[test]
    fn test_market_share_tie_breaks_by_code() {
        let data = Aggregates::new(vec![
            OperatorAggregate::new("TELECEL").with(fields::PREPAID, 50.0),
            OperatorAggregate::new("ORANGE").with(fields::PREPAID, 50.0),
        ]);
        let summary = market_share(2023, None, &data);

        assert_eq!(summary.distribution[0].operator, "ORANGE");
        assert_eq!(summary.distribution[1].operator, "TELECEL");
    }

    #[test]
    fn test_revenue_growth() {
        let mut current = OperatorAggregate::new("ORANGE").with(fields::REVENUE, 1_100.0);
        current.record_count = 4;
        let current = Aggregates::new(vec![current]);
        let previous = Aggregates::new(vec![
            OperatorAggregate::new("ORANGE").with(fields::REVENUE, 1_000.0)
        ]);

        let summary = revenue(2023, None, None, &current, &previous);
        assert_eq!(summary.growth, Some(10.0));
        assert_eq!(summary.quarterly_average, 275.0);
        assert_eq!(summary.by_operator[0].average, 275.0);
    }

    #[test]
    fn test_revenue_growth_absent_without_previous_year() {
        let current = Aggregates::new(vec![
            OperatorAggregate::new("ORANGE").with(fields::REVENUE, 1_100.0)
        ]);
        let summary = revenue(2023, None, None, &current, &Aggregates::default());

        assert_eq!(summary.growth, None);
        assert_eq!(summary.previous_year_total, 0.0);
    }

    #[test]
    fn test_comparison_differences() {
        let revenue_data = Aggregates::new(vec![
            OperatorAggregate::new("ORANGE").with(fields::REVENUE, 500.0),
            OperatorAggregate::new("TELECEL").with(fields::REVENUE, 300.0),
        ]);
        let result = comparison(
            2023,
            "ORANGE",
            "TELECEL",
            &market(),
            &revenue_data,
            &Aggregates::default(),
        );

        assert_eq!(result.first.subscribers, 1000.0);
        assert_eq!(result.second.subscribers, 300.0);
        assert_eq!(result.differences.subscribers, 700.0);
        assert_eq!(result.differences.revenue, 200.0);
        assert_eq!(result.differences.traffic, 0.0);
    }

    #[test]
    fn test_trend_series() {
        let yearly: Vec<(i32, Aggregates)> = (2019..=2023)
            .map(|year| {
                let value = ((year - 2018) * 100) as f64;
                (
                    year,
                    Aggregates::new(vec![
                        OperatorAggregate::new("ORANGE").with(fields::REVENUE, value)
                    ]),
                )
            })
            .collect();

        let summary = trends(Metric::Revenue, None, &yearly, 2);
        assert_eq!(summary.start_year, 2019);
        assert_eq!(summary.end_year, 2023);
        assert_eq!(summary.series.len(), 5);

        let forecast = summary.forecast.unwrap();
        assert_eq!(forecast.projections[0].year, 2024);
        assert!((forecast.projections[0].value - 600.0).abs() < 1e-6);
    }

    #[test]
    fn test_result_serialization_is_tagged() {
        let result = AggregationResult::MarketShare(market_share(2023, None, &market()));
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["family"], "market_share");
        assert_eq!(json["year"], 2023);

        let back: AggregationResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }
}
