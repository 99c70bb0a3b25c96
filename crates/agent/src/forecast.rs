//! Forecast helper
//!
//! Ordinary least squares over a yearly series, with an R² based confidence
//! score and a ±10% band around each projected value.

use serde::{Deserialize, Serialize};

/// Relative band applied around projections
const BAND: f64 = 0.10;

/// A slope smaller than this share of the mean counts as flat
const STABLE_RATIO: f64 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub year: i32,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Growing,
    Declining,
    Stable,
}

impl TrendDirection {
    /// Portuguese label
    pub fn label(&self) -> &'static str {
        match self {
            TrendDirection::Growing => "de crescimento",
            TrendDirection::Declining => "de queda",
            TrendDirection::Stable => "estável",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub year: i32,
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Fitted trend and its projections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    /// Change per year
    pub slope: f64,
    pub intercept: f64,
    /// R² scaled to 0..=100, two decimals
    pub confidence: f64,
    pub direction: TrendDirection,
    pub projections: Vec<Projection>,
}

/// Fit a line through the points and project `years_ahead` years
///
/// Points with a zero value are treated as missing. Returns `None` with
/// fewer than two usable points.
pub fn forecast(points: &[SeriesPoint], years_ahead: u32) -> Option<Forecast> {
    let usable: Vec<&SeriesPoint> = points.iter().filter(|p| p.value > 0.0).collect();
    if usable.len() < 2 {
        return None;
    }

    let n = usable.len() as f64;
    let x_mean = usable.iter().map(|p| p.year as f64).sum::<f64>() / n;
    let y_mean = usable.iter().map(|p| p.value).sum::<f64>() / n;

    let (numerator, denominator) = usable.iter().fold((0.0, 0.0), |(num, den), p| {
        let dx = p.year as f64 - x_mean;
        (num + dx * (p.value - y_mean), den + dx * dx)
    });

    let slope = if denominator != 0.0 {
        numerator / denominator
    } else {
        0.0
    };
    let intercept = y_mean - slope * x_mean;

    let ss_res: f64 = usable
        .iter()
        .map(|p| (p.value - (slope * p.year as f64 + intercept)).powi(2))
        .sum();
    let ss_tot: f64 = usable.iter().map(|p| (p.value - y_mean).powi(2)).sum();
    let r_squared = if ss_tot != 0.0 {
        1.0 - ss_res / ss_tot
    } else {
        0.0
    };
    let confidence = round_to(r_squared.clamp(0.0, 1.0) * 100.0, 2);

    let direction = if y_mean == 0.0 || (slope / y_mean).abs() < STABLE_RATIO {
        TrendDirection::Stable
    } else if slope > 0.0 {
        TrendDirection::Growing
    } else {
        TrendDirection::Declining
    };

    let last_year = usable.iter().map(|p| p.year).max().unwrap_or_default();
    let projections = (1..=years_ahead as i32)
        .map(|offset| {
            let year = last_year + offset;
            let value = (slope * year as f64 + intercept).max(0.0);
            Projection {
                year,
                value,
                lower: (value * (1.0 - BAND)).max(0.0),
                upper: value * (1.0 + BAND),
            }
        })
        .collect();

    Some(Forecast {
        slope,
        intercept,
        confidence,
        direction,
        projections,
    })
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
