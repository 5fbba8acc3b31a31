use crate::asset::{AssetOrigin, ImageAsset};
use crate::error::{CameraError, Failure, SubmissionError};
use crate::submission::AnalysisResult;
use serde::Serialize;
use uuid::Uuid;

/// Stage of the acquisition/submission workflow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    #[default]
    Idle,
    Capturing,
    Previewing,
    ResultReady,
}

/// Inputs to the transition function: user intent and asynchronous completions
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    StartCapture,
    ChooseFile(ImageAsset),
    FilePickedWhileCapturing(ImageAsset),
    SnapshotTaken(ImageAsset),
    SnapshotFailed(CameraError),
    AcquisitionFailed(Failure),
    CameraActivationFailed(CameraError),
    Cancel,
    Retake,
    Submit,
    SubmissionSucceeded { id: Uuid, result: AnalysisResult },
    SubmissionFailed { id: Uuid, error: SubmissionError },
    ScanNext,
    Reset,
}

impl WorkflowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowEvent::StartCapture => "start-capture",
            WorkflowEvent::ChooseFile(_) => "choose-file",
            WorkflowEvent::FilePickedWhileCapturing(_) => "file-picked-while-capturing",
            WorkflowEvent::SnapshotTaken(_) => "snapshot-taken",
            WorkflowEvent::SnapshotFailed(_) => "snapshot-failed",
            WorkflowEvent::AcquisitionFailed(_) => "acquisition-failed",
            WorkflowEvent::CameraActivationFailed(_) => "camera-activation-failed",
            WorkflowEvent::Cancel => "cancel",
            WorkflowEvent::Retake => "retake",
            WorkflowEvent::Submit => "submit",
            WorkflowEvent::SubmissionSucceeded { .. } => "submission-succeeded",
            WorkflowEvent::SubmissionFailed { .. } => "submission-failed",
            WorkflowEvent::ScanNext => "scan-next",
            WorkflowEvent::Reset => "reset",
        }
    }
}

/// Side effects requested by a transition; executed by the controller
#[derive(Debug, Clone)]
pub enum Effect {
    ActivateCamera,
    DeactivateCamera,
    PresentAsset {
        origin: AssetOrigin,
        mime_type: String,
    },
    DispatchSubmission {
        id: Uuid,
        asset: ImageAsset,
    },
    PresentResult {
        grade: String,
        head_rice_percentage: f64,
    },
    SurfaceError(Failure),
    IgnoreStaleCompletion(Uuid),
}
