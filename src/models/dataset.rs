use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Aggregates the backend computes for a single numeric column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    #[serde(default)]
    pub mean: f64,
    #[serde(default)]
    pub min: f64,
    #[serde(default)]
    pub max: f64,
    #[serde(default)]
    pub sum: f64,
}

/// Span of the detected date column, as ISO dates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub column: String,
    pub min: String,
    pub max: String,
}

/// Canonical description of the active dataset.
///
/// Returned by both `/api/sample` and `/api/data`. A new load replaces it
/// wholesale, it is never merged with a previous summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub row_count: u64,
    #[serde(default)]
    pub column_count: u64,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub numeric_columns: Vec<String>,
    #[serde(default)]
    pub date_range: Option<DateRange>,
    #[serde(default)]
    pub summary_stats: BTreeMap<String, MetricStats>,
}

impl DatasetSummary {
    pub fn metric(&self, name: &str) -> Option<&MetricStats> {
        self.summary_stats.get(name)
    }
}

/// Backend acknowledgement for an accepted upload. Only logged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadAck {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub rows: u64,
    #[serde(default)]
    pub columns: u64,
}

/// One page of `/api/data/raw`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPage {
    pub data: Vec<Map<String, Value>>,
    pub total_rows: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

/// A file picked for upload, read fully into memory
#[derive(Debug, Clone)]
pub struct FileHandle {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl FileHandle {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(file_name, bytes))
    }

    pub fn is_csv(&self) -> bool {
        self.file_name.to_lowercase().ends_with(".csv")
    }
}
