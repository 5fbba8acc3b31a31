use crate::asset::{AssetOrigin, ImageAsset};
use crate::error::SubmissionError;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Body of the single-part upload
#[derive(Debug, Clone)]
pub struct ScanUpload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
}

/// Raw `/scan` response. The service reports failures in-band with
/// `status: "error"`, so every field is optional until validated.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScanResponse {
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub head_rice: Option<u64>,

    #[serde(default)]
    pub broken_rice: Option<u64>,

    #[serde(default)]
    pub total_grains: Option<u64>,

    #[serde(default)]
    pub grade: Option<String>,

    #[serde(default)]
    pub percentage: Option<f64>,

    /// Annotated image as a `data:` URL
    #[serde(default)]
    pub processed_image: Option<String>,
}

/// Grading outcome shown to the user
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub head_rice_count: u64,
    pub broken_rice_count: u64,
    pub total_grains: Option<u64>,
    pub grade: String,
    pub head_rice_percentage: f64,
    #[serde(skip)]
    pub annotated_image: Option<ImageAsset>,
}

impl TryFrom<ScanResponse> for AnalysisResult {
    type Error = SubmissionError;

    fn try_from(response: ScanResponse) -> Result<Self, Self::Error> {
        if response.status.as_deref() == Some("error") {
            return Err(SubmissionError::transmission(format!(
                "grading service reported an error: {}",
                response.message.as_deref().unwrap_or("no message")
            )));
        }

        let missing = |field: &str| {
            SubmissionError::transmission(format!("response is missing '{}'", field))
        };

        // Values are passed through; the service owns their ranges
        let head_rice_count = response.head_rice.ok_or_else(|| missing("head_rice"))?;
        let broken_rice_count = response.broken_rice.ok_or_else(|| missing("broken_rice"))?;
        let grade = response.grade.ok_or_else(|| missing("grade"))?;
        let head_rice_percentage = response.percentage.ok_or_else(|| missing("percentage"))?;

        let annotated_image = response.processed_image.and_then(|text| {
            match ImageAsset::from_transport(text, AssetOrigin::Service) {
                Ok(asset) => Some(asset),
                Err(e) => {
                    warn!("Discarding unreadable annotated image: {}", e);
                    None
                }
            }
        });

        Ok(AnalysisResult {
            head_rice_count,
            broken_rice_count,
            total_grains: response.total_grains,
            grade,
            head_rice_percentage,
            annotated_image,
        })
    }
}
