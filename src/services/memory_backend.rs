use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use crate::models::chart::{ChartRecord, ChartType};
use crate::models::dataset::{DatasetSummary, FileHandle, MetricStats, RawPage, UploadAck};
use crate::services::{BackendServiceTrait, RequestError};

#[derive(Debug, Default)]
struct Script {
    sample: Option<Result<DatasetSummary, RequestError>>,
    summary: Option<Result<DatasetSummary, RequestError>>,
    upload: Option<Result<UploadAck, RequestError>>,
    raw: Option<Result<RawPage, RequestError>>,
    charts: HashMap<ChartType, Result<Vec<ChartRecord>, RequestError>>,
    answers: VecDeque<Result<String, RequestError>>,
    gate: Option<Arc<Semaphore>>,
}

#[derive(Debug, Default)]
pub struct CallCounts {
    pub sample: AtomicUsize,
    pub upload: AtomicUsize,
    pub summary: AtomicUsize,
    pub raw: AtomicUsize,
    pub chart: AtomicUsize,
    pub ask: AtomicUsize,
    /// Calls currently parked on a gate
    pub waiting: AtomicUsize,
}

/// Scripted in-memory backend. Responses are captured when a call starts, so
/// changing the script while a gated call is parked does not affect it.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackendService {
    script: Arc<Mutex<Script>>,
    pub calls: Arc<CallCounts>,
}

pub fn summary(rows: u64, revenue: f64) -> DatasetSummary {
    let mut summary = DatasetSummary {
        row_count: rows,
        column_count: 2,
        columns: vec!["month".to_string(), "revenue".to_string()],
        numeric_columns: vec!["revenue".to_string()],
        ..Default::default()
    };
    summary.summary_stats.insert(
        "revenue".to_string(),
        MetricStats {
            sum: revenue,
            mean: revenue / rows.max(1) as f64,
            min: 0.0,
            max: revenue,
        },
    );
    summary
}

pub fn tagged_series(label: &str) -> Vec<ChartRecord> {
    match json!({"dataset": label, "value": 1}) {
        serde_json::Value::Object(record) => vec![record],
        _ => unreachable!(),
    }
}

impl MemoryBackendService {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_sample(&self, result: Result<DatasetSummary, RequestError>) {
        self.script().sample = Some(result);
    }

    pub fn set_summary(&self, result: Result<DatasetSummary, RequestError>) {
        self.script().summary = Some(result);
    }

    pub fn set_upload(&self, result: Result<UploadAck, RequestError>) {
        self.script().upload = Some(result);
    }

    pub fn set_raw(&self, result: Result<RawPage, RequestError>) {
        self.script().raw = Some(result);
    }

    pub fn set_chart(&self, chart_type: ChartType, result: Result<Vec<ChartRecord>, RequestError>) {
        self.script().charts.insert(chart_type, result);
    }

    /// Every chart type answers with a single record tagged `label`.
    pub fn set_all_charts(&self, label: &str) {
        let mut script = self.script();
        for chart_type in ChartType::ALL {
            script.charts.insert(chart_type, Ok(tagged_series(label)));
        }
    }

    pub fn push_answer(&self, result: Result<String, RequestError>) {
        self.script().answers.push_back(result);
    }

    /// Park every call started from now on until permits are released.
    pub fn close_gate(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.script().gate = Some(gate.clone());
        gate
    }

    pub fn open_gate(&self) {
        self.script().gate = None;
    }

    pub fn waiting(&self) -> usize {
        self.calls.waiting.load(Ordering::SeqCst)
    }

    async fn pass_gate(&self, gate: Option<Arc<Semaphore>>) {
        if let Some(gate) = gate {
            self.calls.waiting.fetch_add(1, Ordering::SeqCst);
            if let Ok(permit) = gate.acquire_owned().await {
                permit.forget();
            }
            self.calls.waiting.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn missing<T>(what: &str) -> Result<T, RequestError> {
        Err(RequestError::new(format!("No {} scripted", what)))
    }
}

#[async_trait::async_trait]
impl BackendServiceTrait for MemoryBackendService {
    async fn load_sample(&self) -> Result<DatasetSummary, RequestError> {
        self.calls.sample.fetch_add(1, Ordering::SeqCst);
        let (result, gate) = {
            let script = self.script();
            (script.sample.clone(), script.gate.clone())
        };
        self.pass_gate(gate).await;
        result.unwrap_or_else(|| Self::missing("sample"))
    }

    async fn upload_file(&self, _file: &FileHandle) -> Result<UploadAck, RequestError> {
        self.calls.upload.fetch_add(1, Ordering::SeqCst);
        let (result, gate) = {
            let script = self.script();
            (script.upload.clone(), script.gate.clone())
        };
        self.pass_gate(gate).await;
        result.unwrap_or_else(|| Ok(UploadAck::default()))
    }

    async fn get_summary(&self) -> Result<DatasetSummary, RequestError> {
        self.calls.summary.fetch_add(1, Ordering::SeqCst);
        let (result, gate) = {
            let script = self.script();
            (script.summary.clone(), script.gate.clone())
        };
        self.pass_gate(gate).await;
        result.unwrap_or_else(|| Self::missing("summary"))
    }

    async fn get_raw_page(&self, _page: u32, _page_size: u32) -> Result<RawPage, RequestError> {
        self.calls.raw.fetch_add(1, Ordering::SeqCst);
        let result = self.script().raw.clone();
        result.unwrap_or_else(|| Self::missing("raw page"))
    }

    async fn get_chart(&self, chart_type: ChartType) -> Result<Vec<ChartRecord>, RequestError> {
        self.calls.chart.fetch_add(1, Ordering::SeqCst);
        let (result, gate) = {
            let script = self.script();
            (script.charts.get(&chart_type).cloned(), script.gate.clone())
        };
        self.pass_gate(gate).await;
        result.unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn ask(&self, question: &str) -> Result<String, RequestError> {
        self.calls.ask.fetch_add(1, Ordering::SeqCst);
        let (result, gate) = {
            let mut script = self.script();
            (script.answers.pop_front(), script.gate.clone())
        };
        self.pass_gate(gate).await;
        result.unwrap_or_else(|| Ok(format!("You asked: {}", question)))
    }
}
