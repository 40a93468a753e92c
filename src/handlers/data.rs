use std::fmt::Write;

use crate::handlers::dashboard::display_value;
use crate::models::dataset::RawPage;
use crate::services::loader::{LoadOutcome, LoadStatus};
use crate::services::RequestError;

/// `what` is printed as given, so file paths keep their case.
pub fn render_load_result(what: &str, result: &Result<LoadOutcome, RequestError>) -> String {
    match result {
        Ok(LoadOutcome::Loaded(identity)) => {
            format!("Loaded {} (dataset #{}). Charts are refreshing.", what, identity.generation)
        }
        Ok(LoadOutcome::Superseded) => {
            format!("Loading {} finished after a newer load and was ignored.", what)
        }
        Err(e) => format!("Could not load {}: {}", what, e),
    }
}

pub fn render_status(label: &str, status: &LoadStatus) -> String {
    match (status.loading, &status.error) {
        (true, _) => format!("{}: loading...", label),
        (false, Some(error)) => format!("{}: failed: {}", label, error),
        (false, None) => format!("{}: idle", label),
    }
}

pub fn render_raw_page(page: &RawPage) -> String {
    let mut out = format!(
        "Page {}/{} ({} rows total)\n",
        page.page, page.total_pages, page.total_rows
    );
    let Some(first) = page.data.first() else {
        out.push_str("  (no rows)\n");
        return out;
    };

    let columns: Vec<&String> = first.keys().collect();
    let header: Vec<&str> = columns.iter().map(|c| c.as_str()).collect();
    let _ = writeln!(out, "  {}", header.join(" | "));
    for row in &page.data {
        let cells: Vec<String> = columns
            .iter()
            .map(|column| row.get(column.as_str()).map(display_value).unwrap_or_default())
            .collect();
        let _ = writeln!(out, "  {}", cells.join(" | "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::DatasetIdentity;
    use serde_json::json;

    #[test]
    fn renders_rows_under_header() {
        let page: RawPage = serde_json::from_value(json!({
            "data": [
                {"month": "2024-01", "revenue": 1200},
                {"month": "2024-02", "revenue": 1350.5}
            ],
            "total_rows": 120,
            "page": 1,
            "page_size": 2,
            "total_pages": 60
        }))
        .unwrap();

        let text = render_raw_page(&page);
        assert!(text.starts_with("Page 1/60 (120 rows total)"));
        assert!(text.contains("month | revenue"));
        assert!(text.contains("2024-02 | 1350.50"));
    }

    #[test]
    fn load_messages() {
        let ok = Ok(LoadOutcome::Loaded(DatasetIdentity { generation: 3 }));
        assert!(render_load_result("sample data", &ok).contains("dataset #3"));

        let err = Err(RequestError::new("No data loaded."));
        assert_eq!(
            render_load_result("sample data", &err),
            "Could not load sample data: No data loaded."
        );
    }

    #[test]
    fn upload_paths_keep_their_case() {
        let err = Err(RequestError::new("CSV file is empty"));
        assert_eq!(
            render_load_result("./Reports/Q1Sales.CSV", &err),
            "Could not load ./Reports/Q1Sales.CSV: CSV file is empty"
        );
        let stale = Ok(LoadOutcome::Superseded);
        assert!(render_load_result("./Reports/Q1Sales.CSV", &stale).contains("./Reports/Q1Sales.CSV"));
    }

    #[test]
    fn status_lines() {
        let failed = LoadStatus {
            loading: false,
            error: Some("CSV file is empty".to_string()),
        };
        assert_eq!(render_status("Upload", &failed), "Upload: failed: CSV file is empty");
        assert_eq!(render_status("Sample", &LoadStatus::default()), "Sample: idle");
    }
}
