use log::{info, warn};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::dataset::DatasetSummary;

/// Which top-level view is visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveView {
    #[default]
    Dashboard,
    Query,
}

impl std::str::FromStr for ActiveView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dashboard" => Ok(ActiveView::Dashboard),
            "query" | "ask" => Ok(ActiveView::Query),
            other => Err(format!("Unknown view '{}'. Use 'dashboard' or 'query'", other)),
        }
    }
}

/// Generation stamp of a committed dataset. Two loads of identical data are
/// still two identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DatasetIdentity {
    pub generation: u64,
}

/// The active dataset together with its identity
#[derive(Debug, Clone)]
pub struct ActiveDataset {
    pub identity: DatasetIdentity,
    pub summary: Arc<DatasetSummary>,
}

/// Mutations the store accepts
#[derive(Debug, Clone)]
pub enum StoreIntent {
    DatasetLoaded(DatasetSummary),
    SwitchView(ActiveView),
}

/// What applying an intent changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    /// A new dataset became active and the dashboard was brought forward
    Dataset(DatasetIdentity),
    View(ActiveView),
    /// Nothing changed, with the reason
    Rejected(String),
}

#[derive(Debug, Default)]
struct AppState {
    active: Option<ActiveDataset>,
    view: ActiveView,
    generation: u64,
}

/// Application-lifetime state shared by the loader, the chart orchestrator
/// and the terminal front end.
#[derive(Clone, Debug, Default)]
pub struct AppStore {
    state: Arc<Mutex<AppState>>,
}

impl AppStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, AppState> {
        // Every write is a plain assignment, so a poisoned state is still consistent.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn active(&self) -> Option<ActiveDataset> {
        self.state().active.clone()
    }

    pub fn summary(&self) -> Option<Arc<DatasetSummary>> {
        self.state().active.as_ref().map(|active| active.summary.clone())
    }

    #[cfg(test)]
    pub fn identity(&self) -> Option<DatasetIdentity> {
        self.state().active.as_ref().map(|active| active.identity)
    }

    pub fn is_loaded(&self) -> bool {
        self.state().active.is_some()
    }

    pub fn active_view(&self) -> ActiveView {
        self.state().view
    }

    pub fn apply(&self, intent: StoreIntent) -> StoreChange {
        let mut state = self.state();
        match intent {
            StoreIntent::DatasetLoaded(summary) => {
                state.generation += 1;
                let identity = DatasetIdentity {
                    generation: state.generation,
                };
                info!(
                    "📦 Dataset generation {} active ({} rows)",
                    identity.generation, summary.row_count
                );
                state.active = Some(ActiveDataset {
                    identity,
                    summary: Arc::new(summary),
                });
                state.view = ActiveView::Dashboard;
                StoreChange::Dataset(identity)
            }
            StoreIntent::SwitchView(view) => {
                if view == ActiveView::Query && state.active.is_none() {
                    warn!("Query view requested before any dataset was loaded");
                    return StoreChange::Rejected(
                        "Load a dataset before asking questions".to_string(),
                    );
                }
                state.view = view;
                StoreChange::View(view)
            }
        }
    }
}
