use log::error;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::models::chart::{ChartRecord, ChartType};
use crate::models::dataset::RawPage;
use crate::services::charts::WaveOutcome;
use crate::services::loader::LoadOutcome;
use crate::services::store::{ActiveView, StoreChange, StoreIntent};
use crate::services::{
    AppStore, BackendServiceTrait, ChartOrchestrator, DatasetLoader, QuerySession, RequestError,
};

/// Wires the loader, the chart orchestrator and the query session around one
/// shared store. Every committed load starts a chart wave for the new
/// dataset generation.
pub struct InsightsApp<B: BackendServiceTrait> {
    backend: Arc<B>,
    store: AppStore,
    loader: DatasetLoader<B>,
    charts: ChartOrchestrator<B>,
    session: QuerySession<B>,
    waves: Mutex<Vec<JoinHandle<WaveOutcome>>>,
    raw_page_size: u32,
}

impl<B: BackendServiceTrait> InsightsApp<B> {
    pub fn new(backend: Arc<B>, config: &Config) -> Self {
        let store = AppStore::new();
        Self {
            loader: DatasetLoader::new(backend.clone(), store.clone(), config.max_upload_bytes),
            charts: ChartOrchestrator::new(backend.clone(), config.wave_policy),
            session: QuerySession::new(backend.clone()),
            backend,
            store,
            waves: Mutex::new(Vec::new()),
            raw_page_size: config.raw_page_size,
        }
    }

    pub fn store(&self) -> &AppStore {
        &self.store
    }

    pub fn loader(&self) -> &DatasetLoader<B> {
        &self.loader
    }

    pub fn charts(&self) -> &ChartOrchestrator<B> {
        &self.charts
    }

    pub fn session(&self) -> &QuerySession<B> {
        &self.session
    }

    fn waves(&self) -> MutexGuard<'_, Vec<JoinHandle<WaveOutcome>>> {
        self.waves.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn on_load(&self, outcome: LoadOutcome) {
        if let LoadOutcome::Loaded(identity) = outcome {
            let handle = self.charts.spawn_wave(identity);
            let mut waves = self.waves();
            waves.retain(|wave| !wave.is_finished());
            waves.push(handle);
        }
    }

    pub async fn load_sample(&self) -> Result<LoadOutcome, RequestError> {
        let outcome = self.loader.load_sample().await?;
        self.on_load(outcome);
        Ok(outcome)
    }

    pub async fn load_file(&self, path: &Path) -> Result<LoadOutcome, RequestError> {
        let outcome = self.loader.load_from_path(path).await?;
        self.on_load(outcome);
        Ok(outcome)
    }

    /// Wait for every chart wave still running.
    pub async fn settle_charts(&self) -> Vec<WaveOutcome> {
        let handles: Vec<_> = self.waves().drain(..).collect();
        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!("❌ Chart wave task ended abnormally: {}", e),
            }
        }
        outcomes
    }

    pub fn switch_view(&self, view: ActiveView) -> StoreChange {
        self.store.apply(StoreIntent::SwitchView(view))
    }

    pub async fn raw_page(&self, page: u32) -> Result<RawPage, RequestError> {
        if !self.store.is_loaded() {
            return Err(RequestError::new("No data loaded."));
        }
        self.backend.get_raw_page(page.max(1), self.raw_page_size).await
    }

    /// Fetch one chart outside of a wave, e.g. the conversion funnel.
    pub async fn fetch_chart(&self, chart_type: ChartType) -> Result<Vec<ChartRecord>, RequestError> {
        if !self.store.is_loaded() {
            return Err(RequestError::new("No data loaded."));
        }
        self.backend.get_chart(chart_type).await
    }
}
