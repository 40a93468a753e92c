use futures::future::{join_all, try_join_all};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;

use crate::models::chart::{ChartRecord, ChartSeriesMap, ChartType};
use crate::services::store::DatasetIdentity;
use crate::services::{BackendServiceTrait, RequestError};

/// How a wave treats individual chart failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavePolicy {
    /// Join all; any failure blanks every chart of the wave
    AllOrNothing,
    /// Settle all; successful charts are kept, failures are recorded per chart
    SettleEach,
}

impl FromStr for WavePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all-or-nothing" => Ok(WavePolicy::AllOrNothing),
            "settle-each" => Ok(WavePolicy::SettleEach),
            other => Err(format!(
                "unknown policy '{}', expected 'all-or-nothing' or 'settle-each'",
                other
            )),
        }
    }
}

/// Charts committed by one wave
#[derive(Debug, Clone, PartialEq)]
pub struct ChartWave {
    pub identity: DatasetIdentity,
    pub series: Arc<ChartSeriesMap>,
    /// Per-chart failures (settle-each only)
    pub errors: BTreeMap<ChartType, String>,
    /// Why the whole wave was blanked (all-or-nothing only)
    pub wave_error: Option<String>,
}

/// What the dashboard should draw
#[derive(Debug, Clone, PartialEq)]
pub enum ChartView {
    /// No wave was ever requested
    Empty,
    Loading,
    Ready(ChartWave),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaveOutcome {
    Committed(DatasetIdentity),
    /// Committed, but these charts came back empty because of failures
    Degraded {
        identity: DatasetIdentity,
        failed: Vec<ChartType>,
    },
    /// A newer dataset generation was requested; nothing was committed
    Stale(DatasetIdentity),
}

#[derive(Debug, Default)]
struct ChartState {
    requested: u64,
    loading: bool,
    committed: Option<ChartWave>,
}

/// Fans out one request per chart type whenever the dataset generation
/// changes and commits the joined result as a single update. Only the wave for
/// the latest requested generation may commit.
pub struct ChartOrchestrator<B: BackendServiceTrait> {
    backend: Arc<B>,
    state: Arc<Mutex<ChartState>>,
    policy: WavePolicy,
    chart_types: Vec<ChartType>,
}

impl<B: BackendServiceTrait> Clone for ChartOrchestrator<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            state: self.state.clone(),
            policy: self.policy,
            chart_types: self.chart_types.clone(),
        }
    }
}

impl<B: BackendServiceTrait> ChartOrchestrator<B> {
    pub fn new(backend: Arc<B>, policy: WavePolicy) -> Self {
        Self::with_chart_types(backend, policy, ChartType::DASHBOARD.to_vec())
    }

    pub fn with_chart_types(backend: Arc<B>, policy: WavePolicy, chart_types: Vec<ChartType>) -> Self {
        Self {
            backend,
            state: Arc::new(Mutex::new(ChartState::default())),
            policy,
            chart_types,
        }
    }

    fn state(&self) -> MutexGuard<'_, ChartState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn policy(&self) -> WavePolicy {
        self.policy
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn view(&self) -> ChartView {
        let state = self.state();
        if state.loading {
            return ChartView::Loading;
        }
        match &state.committed {
            Some(wave) => ChartView::Ready(wave.clone()),
            None => ChartView::Empty,
        }
    }

    /// Run the wave on its own task.
    pub fn spawn_wave(&self, identity: DatasetIdentity) -> JoinHandle<WaveOutcome> {
        let orchestrator = self.clone();
        tokio::spawn(async move { orchestrator.run_wave(identity).await })
    }

    pub async fn run_wave(&self, identity: DatasetIdentity) -> WaveOutcome {
        {
            let mut state = self.state();
            if identity.generation < state.requested {
                debug!(
                    "Skipping wave for generation {}, generation {} already requested",
                    identity.generation, state.requested
                );
                return WaveOutcome::Stale(identity);
            }
            state.requested = identity.generation;
            state.loading = true;
        }

        info!(
            "🌊 [Gen-{}] Fetching {} charts ({:?})",
            identity.generation,
            self.chart_types.len(),
            self.policy
        );
        let wave = match self.policy {
            WavePolicy::AllOrNothing => self.join_all_or_nothing(identity).await,
            WavePolicy::SettleEach => self.settle_each(identity).await,
        };

        let failed: Vec<ChartType> = if wave.wave_error.is_some() {
            self.chart_types.clone()
        } else {
            wave.errors.keys().copied().collect()
        };

        let mut state = self.state();
        if state.requested != identity.generation {
            info!(
                "⏭️ [Gen-{}] Discarding wave, generation {} is newer",
                identity.generation, state.requested
            );
            return WaveOutcome::Stale(identity);
        }
        state.committed = Some(wave);
        state.loading = false;
        drop(state);

        if failed.is_empty() {
            info!("✅ [Gen-{}] Charts ready", identity.generation);
            WaveOutcome::Committed(identity)
        } else {
            warn!("⚠️ [Gen-{}] Charts degraded: {:?}", identity.generation, failed);
            WaveOutcome::Degraded { identity, failed }
        }
    }

    async fn fetch(&self, chart_type: ChartType) -> Result<Vec<ChartRecord>, RequestError> {
        debug!("Fetching chart {}", chart_type);
        self.backend.get_chart(chart_type).await
    }

    async fn join_all_or_nothing(&self, identity: DatasetIdentity) -> ChartWave {
        let requests = self.chart_types.iter().map(|&chart_type| async move {
            self.fetch(chart_type)
                .await
                .map(|series| (chart_type, series))
                .map_err(|e| RequestError::new(format!("{}: {}", chart_type, e)))
        });

        match try_join_all(requests).await {
            Ok(all) => ChartWave {
                identity,
                series: Arc::new(all.into_iter().collect()),
                errors: BTreeMap::new(),
                wave_error: None,
            },
            Err(e) => {
                warn!("❌ [Gen-{}] Chart wave failed, blanking charts: {}", identity.generation, e);
                ChartWave {
                    identity,
                    series: Arc::new(self.blank_series()),
                    errors: BTreeMap::new(),
                    wave_error: Some(e.message),
                }
            }
        }
    }

    async fn settle_each(&self, identity: DatasetIdentity) -> ChartWave {
        let requests = self
            .chart_types
            .iter()
            .map(|&chart_type| async move { (chart_type, self.fetch(chart_type).await) });

        let mut series = ChartSeriesMap::new();
        let mut errors = BTreeMap::new();
        for (chart_type, result) in join_all(requests).await {
            match result {
                Ok(records) => {
                    series.insert(chart_type, records);
                }
                Err(e) => {
                    warn!("❌ [Gen-{}] Chart {} failed: {}", identity.generation, chart_type, e);
                    series.insert(chart_type, Vec::new());
                    errors.insert(chart_type, e.message);
                }
            }
        }

        ChartWave {
            identity,
            series: Arc::new(series),
            errors,
            wave_error: None,
        }
    }

    fn blank_series(&self) -> ChartSeriesMap {
        self.chart_types
            .iter()
            .map(|&chart_type| (chart_type, Vec::new()))
            .collect()
    }
}
