//! Response Synthesis
//!
//! Renders aggregation results through the intent's response template, with
//! Portuguese number formatting, declarative charts and follow-up suggestions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use arn_assistant_config::{OperatorConfig, SynthesisConfig, TemplatesConfig};
use arn_assistant_core::{ChartDescriptor, ChartType, IntentDefinition, Metric, Slots};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

use crate::aggregation::{
    AggregationResult, EmploymentSummary, InvestmentSummary, MarketShareSummary, OperatorComparison,
    RevenueSummary, SubscriberSummary, TrafficSummary, TrendSummary,
};
use crate::dispatcher::DataQueryError;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder pattern is valid"));

const MILLION: f64 = 1_000_000.0;

/// Text, charts and follow-ups for one answer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SynthesizedResponse {
    pub text: String,
    pub charts: Vec<ChartDescriptor>,
    pub followups: Vec<String>,
}

/// Response synthesizer
pub struct ResponseSynthesizer {
    templates: TemplatesConfig,
    operators: Vec<OperatorConfig>,
    max_followups: usize,
    precision: usize,
    rotation: AtomicUsize,
}

impl ResponseSynthesizer {
    pub fn new(
        templates: TemplatesConfig,
        operators: Vec<OperatorConfig>,
        synthesis: &SynthesisConfig,
    ) -> Self {
        Self {
            templates,
            operators,
            max_followups: synthesis.max_followups,
            precision: synthesis.percentage_precision,
            rotation: AtomicUsize::new(0),
        }
    }

    pub fn templates(&self) -> &TemplatesConfig {
        &self.templates
    }

    /// Render an aggregation outcome for the intent
    pub fn synthesize(
        &self,
        definition: &IntentDefinition,
        slots: &Slots,
        outcome: Result<&AggregationResult, &DataQueryError>,
    ) -> SynthesizedResponse {
        let result = match outcome {
            Ok(result) => result,
            Err(err) => {
                // the error detail is logged by the dispatcher, never shown
                tracing::debug!(intent = %definition.name, error = %err, "Rendering apology");
                return SynthesizedResponse {
                    text: render(&self.templates.apology, &self.topic_values(definition, None, None)),
                    charts: Vec::new(),
                    followups: Vec::new(),
                };
            }
        };

        let year = result.year();
        let followups = self.followups(definition, slots, year);

        if !result.has_data() || matches!(result, AggregationResult::Trends(t) if t.forecast.is_none()) {
            return SynthesizedResponse {
                text: render(
                    &self.templates.no_data,
                    &self.topic_values(definition, Some(year), slots.operator()),
                ),
                charts: Vec::new(),
                followups,
            };
        }

        let (values, charts) = match result {
            AggregationResult::Subscribers(s) => self.subscribers(s),
            AggregationResult::Traffic(s) => self.traffic(s),
            AggregationResult::MarketShare(s) => self.market_share(s),
            AggregationResult::Revenue(s) => self.revenue(s),
            AggregationResult::Investment(s) => self.investment(s),
            AggregationResult::Employment(s) => self.employment(s),
            AggregationResult::Comparison(s) => self.comparison(s),
            AggregationResult::Trends(s) => self.trends(s),
        };

        SynthesizedResponse {
            text: render(&definition.response_template, &values),
            charts,
            followups,
        }
    }

    /// Canned greeting or farewell, rotating through the configured texts
    pub fn small_talk(&self, intent: &str) -> String {
        let texts = if intent == "farewell" {
            &self.templates.farewells
        } else {
            &self.templates.greetings
        };

        if texts.is_empty() {
            return self.templates.welcome.clone();
        }
        let index = self.rotation.fetch_add(1, Ordering::Relaxed) % texts.len();
        texts[index].clone()
    }

    /// Topic guidance for unrecognized questions
    pub fn guidance(&self) -> SynthesizedResponse {
        SynthesizedResponse {
            text: self.templates.guidance.clone(),
            charts: Vec::new(),
            followups: self.starter_suggestions(),
        }
    }

    pub fn validation(&self) -> &str {
        &self.templates.validation
    }

    pub fn welcome(&self) -> &str {
        &self.templates.welcome
    }

    pub fn system_context(&self) -> &str {
        &self.templates.system_context
    }

    pub fn starter_suggestions(&self) -> Vec<String> {
        self.templates
            .starter_suggestions
            .iter()
            .take(self.max_followups)
            .cloned()
            .collect()
    }

    /// Display name for an operator code
    pub fn operator_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.operators
            .iter()
            .find(|o| o.code == code)
            .map(|o| o.display_name.as_str())
            .unwrap_or(code)
    }

    /// Suggestions with `{operator}` and `{year}` filled in
    ///
    /// A suggestion naming an operator is dropped when no operator was
    /// resolved.
    fn followups(&self, definition: &IntentDefinition, slots: &Slots, year: i32) -> Vec<String> {
        let mut values = HashMap::new();
        values.insert("year", year.to_string());
        if let Some(code) = slots.operator() {
            values.insert("operator", self.operator_name(code).to_string());
        }

        definition
            .followups
            .iter()
            .filter(|f| values.contains_key("operator") || !f.contains("{operator}"))
            .map(|f| render(f, &values))
            .take(self.max_followups)
            .collect()
    }

    fn topic_values(
        &self,
        definition: &IntentDefinition,
        year: Option<i32>,
        operator: Option<&str>,
    ) -> HashMap<&'static str, String> {
        let mut values = HashMap::new();
        values.insert("scope", self.scope(operator));
        let topic = if definition.topic.is_empty() {
            definition.name.clone()
        } else {
            definition.topic.clone()
        };
        values.insert("topic", topic);
        if let Some(year) = year {
            values.insert("year", year.to_string());
        }
        values
    }

    fn pct(&self, value: f64) -> String {
        format_decimal(value, self.precision)
    }

    fn scope(&self, operator: Option<&str>) -> String {
        operator
            .map(|code| format!(" ({})", self.operator_name(code)))
            .unwrap_or_default()
    }

    fn subscribers(&self, s: &SubscriberSummary) -> (HashMap<&'static str, String>, Vec<ChartDescriptor>) {
        let mut values = HashMap::new();
        values.insert("year", s.year.to_string());
        values.insert("total", format_integer(s.total));

        match s.operator_entry() {
            Some(entry) => {
                values.insert("subject", self.operator_name(&entry.operator).to_string());
                values.insert(
                    "share_clause",
                    format!(" ({}% do mercado)", self.pct(entry.market_share)),
                );
                values.insert("breakdown", String::new());
            }
            None => {
                values.insert("subject", "o mercado".to_string());
                values.insert("share_clause", String::new());
                let lines: Vec<String> = s
                    .by_operator
                    .iter()
                    .map(|o| {
                        format!(
                            "• {}: {} ({}%)",
                            self.operator_name(&o.operator),
                            format_integer(o.total),
                            self.pct(o.market_share)
                        )
                    })
                    .collect();
                values.insert("breakdown", breakdown(&lines));
            }
        }

        let mut charts = vec![s.by_operator.iter().fold(
            ChartDescriptor::new(ChartType::Pie, format!("Assinantes por operadora em {}", s.year)),
            |chart, o| chart.point(self.operator_name(&o.operator), o.total),
        )];

        let line_types = [
            ("Pré-pago", s.prepaid),
            ("Pós-pago", s.postpaid),
            ("Fixo", s.fixed),
            ("Internet móvel", s.mobile_internet),
            ("Internet fixa", s.fixed_internet),
        ];
        let by_type = line_types
            .iter()
            .filter(|(_, value)| *value > 0.0)
            .fold(
                ChartDescriptor::new(ChartType::Bar, format!("Assinantes por tipo em {}", s.year)),
                |chart, (label, value)| chart.point(*label, *value),
            );
        if !by_type.series.is_empty() {
            charts.push(by_type);
        }

        (values, charts)
    }

    fn traffic(&self, s: &TrafficSummary) -> (HashMap<&'static str, String>, Vec<ChartDescriptor>) {
        let mut values = HashMap::new();
        values.insert("year", s.year.to_string());
        values.insert("scope", self.scope(s.operator.as_deref()));
        values.insert("total", format_integer(s.total));
        values.insert("on_net", format_integer(s.on_net));
        values.insert("off_net", format_integer(s.off_net));
        values.insert("international", format_integer(s.international));
        values.insert("on_net_pct", format_decimal(s.on_net_pct, 1));
        values.insert("off_net_pct", format_decimal(s.off_net_pct, 1));
        values.insert("international_pct", format_decimal(s.international_pct, 1));

        let chart = ChartDescriptor::new(
            ChartType::Doughnut,
            format!("Distribuição do tráfego em {}", s.year),
        )
        .point("On-Net", s.on_net)
        .point("Off-Net", s.off_net)
        .point("Internacional", s.international);

        (values, vec![chart])
    }

    fn market_share(&self, s: &MarketShareSummary) -> (HashMap<&'static str, String>, Vec<ChartDescriptor>) {
        let mut values = HashMap::new();
        values.insert("year", s.year.to_string());

        let lines: Vec<String> = s
            .distribution
            .iter()
            .map(|e| {
                format!(
                    "• {}: {}% ({} assinantes)",
                    self.operator_name(&e.operator),
                    self.pct(e.share),
                    format_integer(e.subscribers)
                )
            })
            .collect();
        values.insert("breakdown", lines.join("\n"));

        if let Some(leader) = &s.leader {
            values.insert("leader", self.operator_name(&leader.operator).to_string());
            values.insert("leader_share", self.pct(leader.share));
        }

        let chart = s.distribution.iter().fold(
            ChartDescriptor::new(ChartType::Pie, format!("Quota de mercado em {}", s.year)),
            |chart, e| chart.point(self.operator_name(&e.operator), e.share),
        );

        (values, vec![chart])
    }

    fn revenue(&self, s: &RevenueSummary) -> (HashMap<&'static str, String>, Vec<ChartDescriptor>) {
        let mut values = HashMap::new();
        values.insert("year", s.year.to_string());
        values.insert("scope", self.scope(s.operator.as_deref()));
        values.insert("total", format_millions(s.total));
        values.insert("quarterly_average", format_millions(s.quarterly_average));
        values.insert(
            "growth",
            s.growth
                .map(|g| {
                    format!(
                        "\nCrescimento face a {}: {}{}%",
                        s.year - 1,
                        if g > 0.0 { "+" } else { "" },
                        self.pct(g)
                    )
                })
                .unwrap_or_default(),
        );

        let lines = if s.operator.is_none() && s.by_operator.len() > 1 {
            s.by_operator
                .iter()
                .map(|o| {
                    format!(
                        "• {}: {} milhões FCFA",
                        self.operator_name(&o.operator),
                        format_millions(o.total)
                    )
                })
                .collect()
        } else {
            Vec::new()
        };
        values.insert("breakdown", breakdown(&lines));

        let chart = s.by_operator.iter().fold(
            ChartDescriptor::new(
                ChartType::Bar,
                format!("Receitas por operadora em {} (milhões FCFA)", s.year),
            ),
            |chart, o| chart.point(self.operator_name(&o.operator), o.total / MILLION),
        );

        (values, vec![chart])
    }

    fn investment(&self, s: &InvestmentSummary) -> (HashMap<&'static str, String>, Vec<ChartDescriptor>) {
        let mut values = HashMap::new();
        values.insert("year", s.year.to_string());
        values.insert("scope", self.scope(s.operator.as_deref()));
        values.insert("total", format_millions(s.total));
        values.insert("tangible", format_millions(s.tangible));
        values.insert("intangible", format_millions(s.intangible));

        let lines = if s.operator.is_none() && s.by_operator.len() > 1 {
            s.by_operator
                .iter()
                .map(|o| {
                    format!(
                        "• {}: {} milhões FCFA",
                        self.operator_name(&o.operator),
                        format_millions(o.total)
                    )
                })
                .collect()
        } else {
            Vec::new()
        };
        values.insert("breakdown", breakdown(&lines));

        let chart = ChartDescriptor::new(
            ChartType::Bar,
            format!("Investimento em {} (milhões FCFA)", s.year),
        )
        .point("Corpóreo", s.tangible / MILLION)
        .point("Incorpóreo", s.intangible / MILLION);

        (values, vec![chart])
    }

    fn employment(&self, s: &EmploymentSummary) -> (HashMap<&'static str, String>, Vec<ChartDescriptor>) {
        let mut values = HashMap::new();
        values.insert("year", s.year.to_string());
        values.insert("scope", self.scope(s.operator.as_deref()));
        values.insert("total", format_integer(s.total));
        values.insert("direct", format_integer(s.direct));
        values.insert("indirect", format_integer(s.indirect));

        let lines = if s.operator.is_none() && s.by_operator.len() > 1 {
            s.by_operator
                .iter()
                .map(|o| format!("• {}: {}", self.operator_name(&o.operator), format_integer(o.total)))
                .collect()
        } else {
            Vec::new()
        };
        values.insert("breakdown", breakdown(&lines));

        let chart = ChartDescriptor::new(ChartType::Bar, format!("Emprego em {}", s.year))
            .point("Diretos", s.direct)
            .point("Indiretos", s.indirect);

        (values, vec![chart])
    }

    fn comparison(&self, s: &OperatorComparison) -> (HashMap<&'static str, String>, Vec<ChartDescriptor>) {
        let first = self.operator_name(&s.first.operator).to_string();
        let second = self.operator_name(&s.second.operator).to_string();

        let gap = s.differences.subscribers;
        let subscriber_gap = if gap > 0.0 {
            format!("A {} tem mais {} assinantes.", first, format_integer(gap))
        } else if gap < 0.0 {
            format!("A {} tem mais {} assinantes.", second, format_integer(-gap))
        } else {
            "Ambas têm o mesmo número de assinantes.".to_string()
        };

        let mut values = HashMap::new();
        values.insert("year", s.year.to_string());
        values.insert("first_subscribers", format_integer(s.first.subscribers));
        values.insert("second_subscribers", format_integer(s.second.subscribers));
        values.insert("subscriber_gap", subscriber_gap);
        values.insert("first_revenue", format_millions(s.first.revenue));
        values.insert("second_revenue", format_millions(s.second.revenue));
        values.insert("first_traffic", format_integer(s.first.traffic));
        values.insert("second_traffic", format_integer(s.second.traffic));

        let chart = ChartDescriptor::new(
            ChartType::Comparison,
            format!("Assinantes: {} vs {} em {}", first, second, s.year),
        )
        .point(first.clone(), s.first.subscribers)
        .point(second.clone(), s.second.subscribers);

        values.insert("first", first);
        values.insert("second", second);
        (values, vec![chart])
    }

    fn trends(&self, s: &TrendSummary) -> (HashMap<&'static str, String>, Vec<ChartDescriptor>) {
        let mut values = HashMap::new();
        values.insert("metric", s.metric.label().to_string());
        values.insert("scope", self.scope(s.operator.as_deref()));
        values.insert("start_year", s.start_year.to_string());
        values.insert("end_year", s.end_year.to_string());
        values.insert("year", s.end_year.to_string());

        let mut chart = s.series.iter().fold(
            ChartDescriptor::new(
                ChartType::Line,
                format!("Evolução de {} ({}-{})", s.metric.label(), s.start_year, s.end_year),
            ),
            |chart, p| chart.point(p.year.to_string(), p.value),
        );

        if let Some(forecast) = &s.forecast {
            values.insert("direction", forecast.direction.label().to_string());
            let sign = if forecast.slope > 0.0 { "+" } else { "" };
            values.insert("slope", format!("{}{}", sign, format_metric(s.metric, forecast.slope)));
            values.insert("confidence", self.pct(forecast.confidence));

            if let Some(next) = forecast.projections.first() {
                values.insert("next_year", next.year.to_string());
                values.insert("projection", format_metric(s.metric, next.value));
                values.insert("lower", format_metric(s.metric, next.lower));
                values.insert("upper", format_metric(s.metric, next.upper));
            }
            for projection in &forecast.projections {
                chart = chart.point(format!("{} (projeção)", projection.year), projection.value);
            }
        }

        (values, vec![chart])
    }
}

/// Substitute `{name}` placeholders; unknown ones are left untouched
fn render(template: &str, values: &HashMap<&'static str, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            values
                .get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn breakdown(lines: &[String]) -> String {
    if lines.is_empty() {
        String::new()
    } else {
        format!("\n\nPor operadora:\n{}", lines.join("\n"))
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

/// `1234567` -> `1.234.567`
pub fn format_integer(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{}{}", sign, group_thousands(&digits))
}

/// `1234.5` with two decimals -> `1.234,50`
pub fn format_decimal(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (whole, fraction) = match formatted.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (formatted.as_str(), None),
    };
    let sign = if value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };

    match fraction {
        Some(fraction) => format!("{}{},{}", sign, group_thousands(whole), fraction),
        None => format!("{}{}", sign, group_thousands(whole)),
    }
}

/// FCFA amount scaled to millions, two decimals
pub fn format_millions(value: f64) -> String {
    format_decimal(value / MILLION, 2)
}

fn format_metric(metric: Metric, value: f64) -> String {
    match metric {
        Metric::Revenue | Metric::Investment => format!("{} milhões FCFA", format_millions(value)),
        Metric::Traffic => format!("{} min", format_integer(value)),
        Metric::Subscribers => format_integer(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation;
    use arn_assistant_config::{default_intents, default_operators};
    use arn_assistant_core::{fields, Aggregates, DataDomain, DataSourceError, OperatorAggregate, SlotValue};

    fn synthesizer() -> ResponseSynthesizer {
        ResponseSynthesizer::new(
            TemplatesConfig::default(),
            default_operators(),
            &SynthesisConfig::default(),
        )
    }

    fn intent(name: &str) -> IntentDefinition {
        default_intents()
            .into_iter()
            .find(|i| i.name == name)
            .unwrap()
    }

    fn market() -> Aggregates {
        Aggregates::new(vec![
            OperatorAggregate::new("ORANGE")
                .with(fields::PREPAID, 1_200_000.0)
                .with(fields::POSTPAID, 300_000.0),
            OperatorAggregate::new("TELECEL")
                .with(fields::PREPAID, 900_000.0)
                .with(fields::POSTPAID, 100_000.0),
        ])
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_integer(1_234_567.4), "1.234.567");
        assert_eq!(format_integer(999.0), "999");
        assert_eq!(format_integer(-12_500.0), "-12.500");
        assert_eq!(format_decimal(1234.5, 2), "1.234,50");
        assert_eq!(format_decimal(60.0, 2), "60,00");
        assert_eq!(format_decimal(-0.001, 2), "0,00");
        assert_eq!(format_millions(5_600_000_000.0), "5.600,00");
    }

    #[test]
    fn test_render_keeps_unknown_placeholders() {
        let mut values = HashMap::new();
        values.insert("year", "2023".to_string());
        assert_eq!(render("{year} e {other}", &values), "2023 e {other}");
    }

    #[test]
    fn test_subscriber_answer_for_operator() {
        let synthesizer = synthesizer();
        let slots = Slots::new()
            .with("operator", SlotValue::Operator("ORANGE".into()))
            .with("year", SlotValue::Year(2023));
        let result = AggregationResult::Subscribers(aggregation::subscribers(
            2023,
            None,
            Some("ORANGE"),
            &market(),
        ));

        let response = synthesizer.synthesize(&intent("subscriber_query"), &slots, Ok(&result));

        assert_eq!(
            response.text,
            "Em 2023, Orange tinha 1.500.000 assinantes (60,00% do mercado)."
        );
        assert_eq!(response.charts[0].chart_type, ChartType::Pie);
        assert_eq!(response.charts[0].series.len(), 2);
        assert_eq!(response.followups[0], "Qual a quota de mercado da Orange em 2023?");
        assert!(response.followups.len() <= 4);
    }

    #[test]
    fn test_followups_without_operator_are_filtered() {
        let synthesizer = synthesizer();
        let result = AggregationResult::Subscribers(aggregation::subscribers(2023, None, None, &market()));

        let response = synthesizer.synthesize(&intent("subscriber_query"), &Slots::new(), Ok(&result));

        assert!(response.text.contains("o mercado tinha 2.500.000 assinantes"));
        assert!(response.text.contains("• TELECEL: 1.000.000 (40,00%)"));
        assert!(response.followups.iter().all(|f| !f.contains("{operator}")));
        assert!(response
            .followups
            .contains(&"Compare assinantes entre operadoras em 2023".to_string()));
    }

    #[test]
    fn test_market_share_answer() {
        let synthesizer = synthesizer();
        let result = AggregationResult::MarketShare(aggregation::market_share(2023, None, &market()));

        let response = synthesizer.synthesize(&intent("market_share"), &Slots::new(), Ok(&result));

        assert!(response.text.contains("• Orange: 60,00% (1.500.000 assinantes)"));
        assert!(response.text.contains("A Orange é líder de mercado com 60,00% de quota."));
    }

    #[test]
    fn test_error_renders_topic_apology() {
        let synthesizer = synthesizer();
        let err = DataQueryError::Source {
            domain: DataDomain::Revenue,
            error: DataSourceError::Unavailable("pool timed out at db-01".into()),
        };

        let response = synthesizer.synthesize(&intent("revenue"), &Slots::new(), Err(&err));

        assert_eq!(
            response.text,
            "Desculpe, não foi possível obter os dados de receitas neste momento. Tente novamente mais tarde."
        );
        assert!(!response.text.contains("db-01"));
        assert!(response.charts.is_empty());
    }

    #[test]
    fn test_no_data_message() {
        let synthesizer = synthesizer();
        let result = AggregationResult::Traffic(aggregation::traffic(2030, None, None, &Aggregates::default()));

        let response = synthesizer.synthesize(&intent("traffic_analysis"), &Slots::new(), Ok(&result));
        assert_eq!(response.text, "Não encontrei dados de tráfego para 2030.");
        assert!(response.charts.is_empty());
    }

    #[test]
    fn test_operator_without_rows_has_no_data() {
        let synthesizer = synthesizer();
        let slots = Slots::new()
            .with("operator", SlotValue::Operator("ORANGE".into()))
            .with("year", SlotValue::Year(2023));
        let only_telecel = Aggregates::new(vec![
            OperatorAggregate::new("TELECEL").with(fields::PREPAID, 500_000.0)
        ]);
        let result = AggregationResult::Subscribers(aggregation::subscribers(
            2023,
            None,
            Some("ORANGE"),
            &only_telecel,
        ));

        assert!(!result.has_data());

        let response = synthesizer.synthesize(&intent("subscriber_query"), &slots, Ok(&result));
        assert_eq!(response.text, "Não encontrei dados de assinantes (Orange) para 2023.");
        assert!(!response.text.contains("o mercado"));
        assert!(response.charts.is_empty());
    }

    #[test]
    fn test_revenue_growth_clause() {
        let synthesizer = synthesizer();
        let current = Aggregates::new(vec![
            OperatorAggregate::new("ORANGE").with(fields::REVENUE, 5_600_000_000.0)
        ]);
        let previous = Aggregates::new(vec![
            OperatorAggregate::new("ORANGE").with(fields::REVENUE, 5_200_000_000.0)
        ]);
        let result = AggregationResult::Revenue(aggregation::revenue(
            2023,
            None,
            Some("ORANGE"),
            &current,
            &previous,
        ));

        let response = synthesizer.synthesize(&intent("revenue"), &Slots::new(), Ok(&result));
        assert!(response.text.contains("em 2023 (Orange)"));
        assert!(response.text.contains("Volume total: 5.600,00 milhões FCFA"));
        assert!(response.text.contains("Crescimento face a 2022: +7,69%"));
    }

    #[test]
    fn test_small_talk_rotates() {
        let synthesizer = synthesizer();
        let greetings = &synthesizer.templates().greetings;

        let first = synthesizer.small_talk("greeting");
        let second = synthesizer.small_talk("greeting");
        assert!(greetings.contains(&first));
        assert!(greetings.contains(&second));
        assert_ne!(first, second);

        assert_eq!(
            synthesizer.small_talk("farewell"),
            synthesizer.templates().farewells[0]
        );
    }

    #[test]
    fn test_guidance_lists_starters() {
        let response = synthesizer().guidance();
        assert!(response.text.contains("Quota de mercado"));
        assert_eq!(response.followups.len(), 4);
    }
}
