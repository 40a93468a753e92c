use log::info;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::models::chart::{ChartRecord, ChartResponse, ChartType};
use crate::models::conversation::{QueryRequest, QueryResponse};
use crate::models::dataset::{DatasetSummary, FileHandle, RawPage, UploadAck};
use crate::services::request::{RequestBody, RequestClient, RequestError};
use crate::services::BackendServiceTrait;

/// Backend reached over HTTP through `RequestClient`
#[derive(Clone, Debug)]
pub struct HttpBackendService {
    client: RequestClient,
}

impl HttpBackendService {
    pub fn new(client: RequestClient) -> Self {
        Self { client }
    }
}

fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, RequestError> {
    serde_json::from_value(value)
        .map_err(|e| RequestError::new(format!("Unexpected {} response: {}", what, e)))
}

#[async_trait::async_trait]
impl BackendServiceTrait for HttpBackendService {
    async fn load_sample(&self) -> Result<DatasetSummary, RequestError> {
        let value = self.client.call("/api/sample", Method::GET, None).await?;
        decode(value, "sample")
    }

    async fn upload_file(&self, file: &FileHandle) -> Result<UploadAck, RequestError> {
        let body = RequestBody::File {
            file_name: file.file_name.clone(),
            bytes: file.bytes.clone(),
        };
        let value = self.client.call("/api/upload", Method::POST, Some(body)).await?;
        // The acknowledgement shape is not relied upon.
        let ack: UploadAck = serde_json::from_value(value).unwrap_or_default();
        info!("📤 Upload accepted: {} ({} rows)", ack.filename, ack.rows);
        Ok(ack)
    }

    async fn get_summary(&self) -> Result<DatasetSummary, RequestError> {
        let value = self.client.call("/api/data", Method::GET, None).await?;
        decode(value, "summary")
    }

    async fn get_raw_page(&self, page: u32, page_size: u32) -> Result<RawPage, RequestError> {
        let path = format!("/api/data/raw?page={}&page_size={}", page, page_size);
        let value = self.client.call(&path, Method::GET, None).await?;
        decode(value, "raw data")
    }

    async fn get_chart(&self, chart_type: ChartType) -> Result<Vec<ChartRecord>, RequestError> {
        let path = format!("/api/charts/{}", chart_type);
        let value = self.client.call(&path, Method::GET, None).await?;
        let response: ChartResponse = decode(value, "chart")?;
        Ok(response.data)
    }

    async fn ask(&self, question: &str) -> Result<String, RequestError> {
        let request = QueryRequest {
            question: question.to_string(),
        };
        let body = RequestBody::Json(json!(request));
        let value = self.client.call("/api/query", Method::POST, Some(body)).await?;
        let response: QueryResponse = decode(value, "query")?;
        Ok(response.answer)
    }
}
