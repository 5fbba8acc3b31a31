mod client;
mod mock;
mod pipeline;
mod types;
#[cfg(test)]
mod tests;

pub use client::{GradingService, HttpGradingService, UPLOAD_FIELD};
pub use mock::{scan_success, MockGradingService};
pub use pipeline::SubmissionPipeline;
pub use types::{AnalysisResult, ScanResponse, ScanUpload};
