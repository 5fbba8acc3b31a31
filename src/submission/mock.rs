use super::client::GradingService;
use super::types::{ScanResponse, ScanUpload};
use crate::error::SubmissionError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

/// Scripted grading service for tests and offline runs
pub struct MockGradingService {
    script: Mutex<VecDeque<Result<ScanResponse, SubmissionError>>>,
    uploads: Mutex<Vec<ScanUpload>>,
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
    healthy: bool,
}

impl MockGradingService {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            uploads: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            gate: None,
            healthy: true,
        }
    }

    /// Queue a response body
    pub fn respond_with(self, response: ScanResponse) -> Self {
        self.script.lock().push_back(Ok(response));
        self
    }

    /// Queue a failure
    pub fn fail_with(self, error: SubmissionError) -> Self {
        self.script.lock().push_back(Err(error));
        self
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    /// Hold every response until a permit is added to the returned semaphore
    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> Vec<ScanUpload> {
        self.uploads.lock().clone()
    }
}

impl Default for MockGradingService {
    fn default() -> Self {
        Self::new()
    }
}

/// A well-formed success body
pub fn scan_success(head_rice: u64, broken_rice: u64, grade: &str, percentage: f64) -> ScanResponse {
    ScanResponse {
        status: Some("success".to_string()),
        head_rice: Some(head_rice),
        broken_rice: Some(broken_rice),
        total_grains: Some(head_rice + broken_rice),
        grade: Some(grade.to_string()),
        percentage: Some(percentage),
        ..Default::default()
    }
}

#[async_trait]
impl GradingService for MockGradingService {
    async fn scan(&self, upload: ScanUpload) -> Result<ScanResponse, SubmissionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Mock grading call {} ({} bytes)", call, upload.bytes.len());
        self.uploads.lock().push(upload);

        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| SubmissionError::transmission("mock gate closed"))?;
            permit.forget();
        }

        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| Ok(scan_success(120, 8, "PREMIUM", 93.75)))
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }
}
