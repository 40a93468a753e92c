use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One row of chart data: field name to numeric or string value
pub type ChartRecord = Map<String, Value>;

/// Chart data keyed by chart type, rebuilt in full per dataset generation
pub type ChartSeriesMap = BTreeMap<ChartType, Vec<ChartRecord>>;

/// Chart types served by `/api/charts/{type}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartType {
    RevenueTrend,
    ByCategory,
    ByRegion,
    CampaignPerformance,
    ConversionFunnel,
    MarketingRoi,
}

impl ChartType {
    #[cfg(test)]
    pub const ALL: [ChartType; 6] = [
        ChartType::RevenueTrend,
        ChartType::ByCategory,
        ChartType::ByRegion,
        ChartType::CampaignPerformance,
        ChartType::ConversionFunnel,
        ChartType::MarketingRoi,
    ];

    /// The set fetched by every dashboard wave
    pub const DASHBOARD: [ChartType; 5] = [
        ChartType::RevenueTrend,
        ChartType::ByCategory,
        ChartType::ByRegion,
        ChartType::CampaignPerformance,
        ChartType::MarketingRoi,
    ];

    pub fn as_str(&self) -> &'static str {
        self.binding().tag
    }

    /// Renderer binding for this chart type, looked up in `CHART_BINDINGS`.
    pub fn binding(&self) -> &'static ChartBinding {
        // The table is ordered like the enum.
        &CHART_BINDINGS[*self as usize]
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_lowercase();
        CHART_BINDINGS
            .iter()
            .find(|binding| binding.tag == tag)
            .map(|binding| binding.chart_type)
            .ok_or_else(|| {
                let available: Vec<&str> = CHART_BINDINGS.iter().map(|b| b.tag).collect();
                format!("Unknown chart type '{}'. Available: {}", s, available.join(", "))
            })
    }
}

/// How a chart type is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    Bar,
    Pie,
    Funnel,
    Composed,
}

/// Static description of how to present one chart type
#[derive(Debug)]
pub struct ChartBinding {
    pub chart_type: ChartType,
    pub tag: &'static str,
    pub title: &'static str,
    pub kind: ChartKind,
    pub x_field: &'static str,
    pub y_fields: &'static [&'static str],
}

pub static CHART_BINDINGS: [ChartBinding; 6] = [
    ChartBinding {
        chart_type: ChartType::RevenueTrend,
        tag: "revenue-trend",
        title: "Revenue Trend",
        kind: ChartKind::Line,
        x_field: "month",
        y_fields: &["revenue", "customers"],
    },
    ChartBinding {
        chart_type: ChartType::ByCategory,
        tag: "by-category",
        title: "Revenue by Category",
        kind: ChartKind::Pie,
        x_field: "category",
        y_fields: &["revenue"],
    },
    ChartBinding {
        chart_type: ChartType::ByRegion,
        tag: "by-region",
        title: "Revenue by Region",
        kind: ChartKind::Bar,
        x_field: "region",
        y_fields: &["revenue"],
    },
    ChartBinding {
        chart_type: ChartType::CampaignPerformance,
        tag: "campaign-performance",
        title: "Campaign Performance",
        kind: ChartKind::Bar,
        x_field: "campaign",
        y_fields: &["revenue", "marketing_spend", "leads_generated"],
    },
    ChartBinding {
        chart_type: ChartType::ConversionFunnel,
        tag: "conversion-funnel",
        title: "Conversion Funnel",
        kind: ChartKind::Funnel,
        x_field: "stage",
        y_fields: &["value"],
    },
    ChartBinding {
        chart_type: ChartType::MarketingRoi,
        tag: "marketing-roi",
        title: "Marketing ROI",
        kind: ChartKind::Composed,
        x_field: "month",
        y_fields: &["revenue", "marketing_spend", "roi"],
    },
];

/// Body of `GET /api/charts/{type}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChartResponse {
    #[serde(default)]
    pub chart_type: Option<String>,
    pub data: Vec<ChartRecord>,
}
