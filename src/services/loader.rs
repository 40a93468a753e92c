use log::{error, info, warn};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::dataset::{DatasetSummary, FileHandle};
use crate::services::store::{AppStore, DatasetIdentity, StoreChange, StoreIntent};
use crate::services::{BackendServiceTrait, RequestError};

/// The two ingestion paths, each with its own loading/error state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPath {
    Sample,
    Upload,
}

/// Snapshot of one path's progress
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStatus {
    pub loading: bool,
    pub error: Option<String>,
}

/// Result of a load that reached the backend successfully
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(DatasetIdentity),
    /// A newer load was started before this one finished; its result was dropped
    Superseded,
}

#[derive(Debug, Default)]
struct PathState {
    in_flight: usize,
    error: Option<String>,
}

#[derive(Debug, Default)]
struct LoaderState {
    sample: PathState,
    upload: PathState,
}

impl LoaderState {
    fn path(&mut self, path: LoadPath) -> &mut PathState {
        match path {
            LoadPath::Sample => &mut self.sample,
            LoadPath::Upload => &mut self.upload,
        }
    }
}

/// Clears the in-flight mark for a path however the load ends.
struct InFlight<'a> {
    state: &'a Mutex<LoaderState>,
    path: LoadPath,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let path = state.path(self.path);
        path.in_flight = path.in_flight.saturating_sub(1);
    }
}

/// Brings a dataset in, either the backend's sample or an uploaded CSV, and
/// commits the resulting summary to the store. Failed loads never touch the
/// store, so whatever was active stays active.
pub struct DatasetLoader<B: BackendServiceTrait> {
    backend: Arc<B>,
    store: AppStore,
    state: Arc<Mutex<LoaderState>>,
    tickets: Arc<AtomicU64>,
    max_upload_bytes: u64,
}

impl<B: BackendServiceTrait> Clone for DatasetLoader<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            store: self.store.clone(),
            state: self.state.clone(),
            tickets: self.tickets.clone(),
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

impl<B: BackendServiceTrait> DatasetLoader<B> {
    pub fn new(backend: Arc<B>, store: AppStore, max_upload_bytes: u64) -> Self {
        Self {
            backend,
            store,
            state: Arc::new(Mutex::new(LoaderState::default())),
            tickets: Arc::new(AtomicU64::new(0)),
            max_upload_bytes,
        }
    }

    fn state(&self) -> MutexGuard<'_, LoaderState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn status(&self, path: LoadPath) -> LoadStatus {
        let mut state = self.state();
        let path = state.path(path);
        LoadStatus {
            loading: path.in_flight > 0,
            error: path.error.clone(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status(LoadPath::Sample).loading || self.status(LoadPath::Upload).loading
    }

    fn begin(&self, path: LoadPath) -> (u64, InFlight<'_>) {
        let ticket = self.tickets.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.state();
            let path = state.path(path);
            path.in_flight += 1;
            path.error = None;
        }
        (
            ticket,
            InFlight {
                state: &self.state,
                path,
            },
        )
    }

    fn is_latest(&self, ticket: u64) -> bool {
        self.tickets.load(Ordering::SeqCst) == ticket
    }

    fn fail(&self, path: LoadPath, ticket: u64, err: RequestError) -> RequestError {
        if self.is_latest(ticket) {
            self.state().path(path).error = Some(err.message.clone());
        } else {
            warn!("Dropping error from superseded {:?} load: {}", path, err);
        }
        err
    }

    fn commit(&self, ticket: u64, summary: DatasetSummary) -> LoadOutcome {
        if !self.is_latest(ticket) {
            warn!("⏭️ Discarding superseded load #{}", ticket);
            return LoadOutcome::Superseded;
        }
        match self.store.apply(StoreIntent::DatasetLoaded(summary)) {
            StoreChange::Dataset(identity) => LoadOutcome::Loaded(identity),
            _ => LoadOutcome::Superseded,
        }
    }

    /// Load the backend's built-in sample dataset.
    pub async fn load_sample(&self) -> Result<LoadOutcome, RequestError> {
        let (ticket, _in_flight) = self.begin(LoadPath::Sample);
        info!("📥 Loading sample dataset (load #{})", ticket);

        match self.backend.load_sample().await {
            Ok(summary) => {
                info!("✅ Sample dataset loaded: {} rows", summary.row_count);
                Ok(self.commit(ticket, summary))
            }
            Err(e) => {
                error!("❌ Failed to load sample dataset: {}", e);
                Err(self.fail(LoadPath::Sample, ticket, e))
            }
        }
    }

    /// Upload a CSV, then fetch the canonical summary. The summary request is
    /// only made once the upload has been accepted.
    pub async fn load_from_file(&self, file: FileHandle) -> Result<LoadOutcome, RequestError> {
        let (ticket, _in_flight) = self.begin(LoadPath::Upload);
        info!("📤 Uploading {} ({} bytes, load #{})", file.file_name, file.bytes.len(), ticket);

        if let Err(e) = self.check_file(&file) {
            warn!("Rejected {} before upload: {}", file.file_name, e);
            return Err(self.fail(LoadPath::Upload, ticket, e));
        }

        if let Err(e) = self.backend.upload_file(&file).await {
            error!("❌ Upload of {} failed: {}", file.file_name, e);
            return Err(self.fail(LoadPath::Upload, ticket, e));
        }

        match self.backend.get_summary().await {
            Ok(summary) => {
                info!("✅ {} loaded: {} rows", file.file_name, summary.row_count);
                Ok(self.commit(ticket, summary))
            }
            Err(e) => {
                error!("❌ Summary fetch after uploading {} failed: {}", file.file_name, e);
                Err(self.fail(LoadPath::Upload, ticket, e))
            }
        }
    }

    /// Read a file from disk and upload it.
    pub async fn load_from_path(&self, path: &Path) -> Result<LoadOutcome, RequestError> {
        match FileHandle::from_path(path).await {
            Ok(file) => self.load_from_file(file).await,
            Err(e) => {
                let err = RequestError::new(format!("Could not read {}: {}", path.display(), e));
                // Still counts as the latest upload attempt.
                let (ticket, _in_flight) = self.begin(LoadPath::Upload);
                Err(self.fail(LoadPath::Upload, ticket, err))
            }
        }
    }

    fn check_file(&self, file: &FileHandle) -> Result<(), RequestError> {
        if !file.is_csv() {
            return Err(RequestError::new("Only CSV files are accepted"));
        }
        if file.bytes.len() as u64 > self.max_upload_bytes {
            return Err(RequestError::new(format!(
                "File too large (max {} MB)",
                self.max_upload_bytes / (1024 * 1024)
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory_backend::{summary, MemoryBackendService};
    use crate::models::dataset::UploadAck;
    use crate::services::store::ActiveView;

    fn loader() -> (Arc<MemoryBackendService>, AppStore, DatasetLoader<MemoryBackendService>) {
        let backend = Arc::new(MemoryBackendService::new());
        let store = AppStore::new();
        let loader = DatasetLoader::new(backend.clone(), store.clone(), 1024);
        (backend, store, loader)
    }

    fn csv(name: &str) -> FileHandle {
        FileHandle::new(name, b"month,revenue\n2024-01,10\n".to_vec())
    }

    #[tokio::test]
    async fn sample_load_commits_summary_and_shows_dashboard() {
        let (backend, store, loader) = loader();
        backend.set_sample(Ok(summary(120, 2_500_000.0)));

        let outcome = loader.load_sample().await.unwrap();
        assert_eq!(outcome, LoadOutcome::Loaded(DatasetIdentity { generation: 1 }));
        assert_eq!(*store.summary().unwrap(), summary(120, 2_500_000.0));
        assert_eq!(store.active_view(), ActiveView::Dashboard);
        assert_eq!(loader.status(LoadPath::Sample), LoadStatus::default());
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_summary() {
        let (backend, store, loader) = loader();
        let err = loader.load_sample().await.unwrap_err();
        assert!(store.summary().is_none());
        assert_eq!(loader.status(LoadPath::Sample).error, Some(err.message));

        backend.set_sample(Ok(summary(5, 50.0)));
        loader.load_sample().await.unwrap();
        backend.set_sample(Err(RequestError::new("backend down")));
        loader.load_sample().await.unwrap_err();

        assert_eq!(*store.summary().unwrap(), summary(5, 50.0));
        let status = loader.status(LoadPath::Sample);
        assert!(!status.loading);
        assert_eq!(status.error.as_deref(), Some("backend down"));
    }

    #[tokio::test]
    async fn new_attempt_clears_previous_error() {
        let (backend, _store, loader) = loader();
        loader.load_sample().await.unwrap_err();
        backend.set_sample(Ok(summary(1, 1.0)));
        loader.load_sample().await.unwrap();
        assert_eq!(loader.status(LoadPath::Sample).error, None);
    }

    #[tokio::test]
    async fn upload_fetches_summary_after_acceptance() {
        let (backend, store, loader) = loader();
        backend.set_summary(Ok(summary(42, 8_200.0)));

        let outcome = loader.load_from_file(csv("sales.csv")).await.unwrap();
        assert!(matches!(outcome, LoadOutcome::Loaded(_)));
        assert_eq!(backend.calls.upload.load(Ordering::SeqCst), 1);
        assert_eq!(backend.calls.summary.load(Ordering::SeqCst), 1);
        assert_eq!(store.summary().unwrap().row_count, 42);
    }

    #[tokio::test]
    async fn summary_failure_after_accepted_upload_keeps_previous_dataset() {
        let (backend, store, loader) = loader();
        backend.set_sample(Ok(summary(120, 2_500_000.0)));
        loader.load_sample().await.unwrap();

        backend.set_upload(Ok(UploadAck {
            message: "File uploaded successfully".to_string(),
            filename: "sales.csv".to_string(),
            rows: 1,
            ..Default::default()
        }));
        backend.set_summary(Err(RequestError::new("No data loaded.")));
        let err = loader.load_from_file(csv("sales.csv")).await.unwrap_err();

        assert_eq!(err.message, "No data loaded.");
        assert_eq!(backend.calls.upload.load(Ordering::SeqCst), 1);
        assert_eq!(backend.calls.summary.load(Ordering::SeqCst), 1);
        assert_eq!(*store.summary().unwrap(), summary(120, 2_500_000.0));
        let status = loader.status(LoadPath::Upload);
        assert!(!status.loading);
        assert_eq!(status.error.as_deref(), Some("No data loaded."));
        assert_eq!(loader.status(LoadPath::Sample), LoadStatus::default());
    }

    #[tokio::test]
    async fn rejected_upload_skips_summary() {
        let (backend, store, loader) = loader();
        backend.set_upload(Err(RequestError::new("CSV file is empty")));
        backend.set_summary(Ok(summary(42, 8_200.0)));

        let err = loader.load_from_file(csv("sales.csv")).await.unwrap_err();
        assert_eq!(err.message, "CSV file is empty");
        assert_eq!(backend.calls.summary.load(Ordering::SeqCst), 0);
        assert!(store.summary().is_none());
        assert_eq!(
            loader.status(LoadPath::Upload).error.as_deref(),
            Some("CSV file is empty")
        );
        assert_eq!(loader.status(LoadPath::Sample).error, None);
    }

    #[tokio::test]
    async fn client_side_checks_run_before_any_request() {
        let (backend, _store, loader) = loader();
        let err = loader.load_from_file(csv("sales.xlsx")).await.unwrap_err();
        assert_eq!(err.message, "Only CSV files are accepted");

        let big = FileHandle::new("big.csv", vec![b'a'; 2048]);
        let err = loader.load_from_file(big).await.unwrap_err();
        assert!(err.message.starts_with("File too large"));
        assert_eq!(backend.calls.upload.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_file_is_reported_on_upload_path() {
        let (_backend, _store, loader) = loader();
        let err = loader
            .load_from_path(Path::new("/definitely/not/here.csv"))
            .await
            .unwrap_err();
        assert!(err.message.starts_with("Could not read"));
        assert!(loader.status(LoadPath::Upload).error.is_some());
        assert!(!loader.is_loading());
    }

    #[tokio::test]
    async fn latest_load_wins() {
        let (backend, store, loader) = loader();
        backend.set_sample(Ok(summary(1, 100.0)));
        let gate = backend.close_gate();

        let slow = {
            let loader = loader.clone();
            tokio::spawn(async move { loader.load_sample().await })
        };
        while backend.waiting() < 1 {
            tokio::task::yield_now().await;
        }
        assert!(loader.status(LoadPath::Sample).loading);

        backend.open_gate();
        backend.set_sample(Ok(summary(2, 200.0)));
        let fast = loader.load_sample().await.unwrap();
        assert!(matches!(fast, LoadOutcome::Loaded(_)));

        gate.add_permits(1);
        let stale = slow.await.unwrap().unwrap();
        assert_eq!(stale, LoadOutcome::Superseded);
        assert_eq!(store.summary().unwrap().row_count, 2);
        assert!(!loader.status(LoadPath::Sample).loading);
    }
}
