use serde_json::Value;
use std::fmt::Write;

use crate::models::chart::{ChartRecord, ChartType};
use crate::models::dataset::DatasetSummary;
use crate::models::kpi::{build_kpis, format_count};
use crate::services::charts::{ChartView, ChartWave};

/// Rows shown per chart in the terminal
const MAX_CHART_ROWS: usize = 6;

pub fn render_kpis(summary: &DatasetSummary) -> String {
    let cards: Vec<String> = build_kpis(summary)
        .into_iter()
        .map(|card| format!("{}: {}", card.label, card.value))
        .collect();
    let mut out = cards.join("  |  ");
    if let Some(range) = &summary.date_range {
        let _ = write!(out, "\nPeriod ({}): {} to {}", range.column, range.min, range.max);
    }
    out
}

pub fn render_dashboard(summary: Option<&DatasetSummary>, charts: &ChartView) -> String {
    let Some(summary) = summary else {
        return "No dataset loaded. Try 'sample' or 'upload <file.csv>'.".to_string();
    };

    let mut out = String::from("=== Dashboard ===\n");
    out.push_str(&render_kpis(summary));
    out.push('\n');

    match charts {
        ChartView::Empty => {}
        ChartView::Loading => out.push_str("\nLoading charts...\n"),
        ChartView::Ready(wave) => out.push_str(&render_wave(wave)),
    }
    out
}

fn render_wave(wave: &ChartWave) -> String {
    let mut out = String::new();
    for (chart_type, records) in wave.series.iter() {
        out.push('\n');
        out.push_str(&render_chart(*chart_type, records));
        if let Some(error) = wave.errors.get(chart_type) {
            let _ = writeln!(out, "  (unavailable: {})", error);
        }
    }
    out
}

pub fn render_chart(chart_type: ChartType, records: &[ChartRecord]) -> String {
    let binding = chart_type.binding();
    let mut out = format!("-- {} [{:?}] --\n", binding.title, binding.kind);
    if records.is_empty() {
        out.push_str("  no data\n");
        return out;
    }

    for record in records.iter().take(MAX_CHART_ROWS) {
        let label = record
            .get(binding.x_field)
            .map(display_value)
            .unwrap_or_else(|| "?".to_string());
        let values: Vec<String> = binding
            .y_fields
            .iter()
            .filter_map(|field| record.get(*field).map(|v| format!("{}={}", field, display_value(v))))
            .collect();
        let _ = writeln!(out, "  {:<16} {}", label, values.join("  "));
    }
    if records.len() > MAX_CHART_ROWS {
        let _ = writeln!(out, "  ... {} more", records.len() - MAX_CHART_ROWS);
    }
    out
}

pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 => format_count(f),
            Some(f) => format!("{:.2}", f),
            None => n.to_string(),
        },
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}
