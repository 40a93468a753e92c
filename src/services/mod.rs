pub mod charts;
pub mod http_backend;
pub mod loader;
pub mod query;
pub mod request;
pub mod store;
#[cfg(test)]
pub mod memory_backend;

use crate::models::chart::{ChartRecord, ChartType};
use crate::models::dataset::{DatasetSummary, FileHandle, RawPage, UploadAck};

pub use request::RequestError;

/// One method per backend endpoint the client consumes
#[async_trait::async_trait]
pub trait BackendServiceTrait: Send + Sync + 'static {
    async fn load_sample(&self) -> Result<DatasetSummary, RequestError>;
    async fn upload_file(&self, file: &FileHandle) -> Result<UploadAck, RequestError>;
    async fn get_summary(&self) -> Result<DatasetSummary, RequestError>;
    async fn get_raw_page(&self, page: u32, page_size: u32) -> Result<RawPage, RequestError>;
    async fn get_chart(&self, chart_type: ChartType) -> Result<Vec<ChartRecord>, RequestError>;
    async fn ask(&self, question: &str) -> Result<String, RequestError>;
}

pub use charts::ChartOrchestrator;
pub use http_backend::HttpBackendService;
pub use loader::DatasetLoader;
pub use query::QuerySession;
pub use store::AppStore;
