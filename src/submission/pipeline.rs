use super::client::GradingService;
use super::types::{AnalysisResult, ScanUpload};
use crate::asset::{AssetOrigin, ImageAsset};
use crate::error::SubmissionError;
use std::sync::Arc;
use tracing::{info, warn};

/// Decodes an asset, uploads it, and maps the response
#[derive(Clone)]
pub struct SubmissionPipeline {
    service: Arc<dyn GradingService>,
}

impl SubmissionPipeline {
    pub fn new(service: Arc<dyn GradingService>) -> Self {
        Self { service }
    }

    /// Submit one asset. A malformed asset fails before any network call.
    pub async fn submit(&self, asset: &ImageAsset) -> Result<AnalysisResult, SubmissionError> {
        let upload = Self::build_upload(asset)?;
        let response = self.service.scan(upload).await?;

        let result = AnalysisResult::try_from(response).map_err(|e| {
            warn!("Unusable grading response: {}", e);
            e
        })?;

        info!(
            "Graded sample: {} ({} head / {} broken, {:.2}%)",
            result.grade, result.head_rice_count, result.broken_rice_count, result.head_rice_percentage
        );
        Ok(result)
    }

    fn build_upload(asset: &ImageAsset) -> Result<ScanUpload, SubmissionError> {
        let bytes = asset.to_bytes()?.into_owned();

        let file_name = asset
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| default_file_name(asset));

        Ok(ScanUpload {
            bytes,
            mime_type: asset.mime_type().to_string(),
            file_name,
        })
    }
}

fn default_file_name(asset: &ImageAsset) -> String {
    let stem = match asset.origin() {
        AssetOrigin::Camera => "snapshot",
        AssetOrigin::File | AssetOrigin::Service => "sample",
    };
    let essence = asset.mime_type().split(';').next().unwrap_or_default();
    let extension = match essence {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/bmp" => "bmp",
        "image/gif" => "gif",
        _ => "bin",
    };
    format!("{}.{}", stem, extension)
}
