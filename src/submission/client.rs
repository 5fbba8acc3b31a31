use super::types::{ScanResponse, ScanUpload};
use crate::config::ServiceConfig;
use crate::error::{GrainError, Result, SubmissionError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info, warn};

/// Multipart field name expected by the grading service
pub const UPLOAD_FIELD: &str = "file";

/// Remote grading service collaborator
#[async_trait]
pub trait GradingService: Send + Sync {
    /// Upload one image and return the parsed response body
    async fn scan(&self, upload: ScanUpload) -> std::result::Result<ScanResponse, SubmissionError>;

    /// True when the service answers on its root endpoint
    async fn health_check(&self) -> bool;
}

/// Grading service reached over HTTP
pub struct HttpGradingService {
    client: reqwest::Client,
    base_url: String,
    scan_url: String,
}

impl HttpGradingService {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GrainError::system(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            scan_url: config.scan_url(),
        })
    }

    pub fn scan_url(&self) -> &str {
        &self.scan_url
    }
}

#[async_trait]
impl GradingService for HttpGradingService {
    async fn scan(&self, upload: ScanUpload) -> std::result::Result<ScanResponse, SubmissionError> {
        let size = upload.bytes.len();
        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.mime_type)?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        info!("Uploading {} bytes to {}", size, self.scan_url);

        // Single attempt; retrying is the user's call
        let resp = self.client.post(&self.scan_url).multipart(form).send().await?;

        let status = resp.status();
        if !status.is_success() {
            warn!("Grading service responded with {}", status);
            return Err(SubmissionError::Transmission {
                details: format!("grading service responded with {}", status),
                status: Some(status.as_u16()),
            });
        }

        let body: ScanResponse = resp.json().await?;
        debug!("Grading response: {:?}", body.status);
        Ok(body)
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!("Health check failed: {}", e);
                false
            }
        }
    }
}
