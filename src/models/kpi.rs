use crate::models::dataset::DatasetSummary;

/// A headline figure shown above the chart grid
#[derive(Debug, Clone, PartialEq)]
pub struct KpiCard {
    pub label: &'static str,
    pub value: String,
}

/// Compact currency: `$2.5M`, `$8K`, `$450`
pub fn format_currency(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let abs = value.abs();
    // Unit thresholds sit where rounding would carry into the next unit.
    if abs >= 999_500.0 {
        format!("{}${:.1}M", sign, abs / 1_000_000.0)
    } else if abs >= 999.5 {
        format!("{}${:.0}K", sign, abs / 1_000.0)
    } else {
        format!("{}${:.0}", sign, abs)
    }
}

pub fn format_record_count(rows: u64) -> String {
    format!("{} records", rows)
}

/// Whole number with thousands separators
pub fn format_count(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if rounded < 0 {
        out.insert(0, '-');
    }
    out
}

pub fn build_kpis(summary: &DatasetSummary) -> Vec<KpiCard> {
    let mut cards = Vec::new();
    let revenue = summary.metric("revenue").map(|m| m.sum);
    let spend = summary.metric("marketing_spend").map(|m| m.sum);

    if let Some(revenue) = revenue {
        cards.push(KpiCard {
            label: "Total Revenue",
            value: format_currency(revenue),
        });
    }
    if let Some(customers) = summary.metric("customers") {
        cards.push(KpiCard {
            label: "Customers",
            value: format_count(customers.sum),
        });
    }
    if let Some(spend) = spend {
        cards.push(KpiCard {
            label: "Marketing Spend",
            value: format_currency(spend),
        });
    }
    if let (Some(revenue), Some(spend)) = (revenue, spend) {
        if spend > 0.0 {
            cards.push(KpiCard {
                label: "Marketing ROI",
                value: format!("{:.1}x", revenue / spend),
            });
        }
    }
    cards.push(KpiCard {
        label: "Records",
        value: format_record_count(summary.row_count),
    });
    cards
}
