//! Declarative chart descriptors
//!
//! The assistant never renders charts; it only tells the client what to draw.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    Pie,
    Doughnut,
    Bar,
    Line,
    Comparison,
}

/// One labelled value in a chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub label: String,
    pub value: f64,
}

/// Chart to render alongside an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDescriptor {
    pub chart_type: ChartType,
    pub title: String,
    pub series: Vec<ChartSeries>,
}

impl ChartDescriptor {
    pub fn new(chart_type: ChartType, title: impl Into<String>) -> Self {
        Self {
            chart_type,
            title: title.into(),
            series: Vec::new(),
        }
    }

    pub fn point(mut self, label: impl Into<String>, value: f64) -> Self {
        self.series.push(ChartSeries {
            label: label.into(),
            value,
        });
        self
    }
}
