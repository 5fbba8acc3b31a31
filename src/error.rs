use crate::camera::Facing;
use crate::workflow::Mode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GrainError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),

    #[error("File selection was cancelled")]
    SelectionCancelled,

    #[error("Event '{event}' is not valid in mode {mode:?}")]
    InvalidTransition { mode: Mode, event: &'static str },

    #[error("System error: {message}")]
    System { message: String },
}

impl GrainError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("Camera permission denied: {details}")]
    PermissionDenied { details: String },

    #[error("Requested {facing} camera is not available")]
    FacingUnavailable { facing: Facing },

    #[error("Failed to open camera device: {details}")]
    DeviceOpen { details: String },

    #[error("Snapshot capture failed: {details}")]
    Capture { details: String },

    #[error("Camera is not active")]
    NotActive,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("Malformed image asset: {details}")]
    Malformed { details: String },
}

impl AssetError {
    pub fn malformed<S: Into<String>>(details: S) -> Self {
        Self::Malformed {
            details: details.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubmissionError {
    #[error(transparent)]
    MalformedAsset(#[from] AssetError),

    #[error("Transmission failed: {details}")]
    Transmission {
        details: String,
        status: Option<u16>,
    },
}

impl SubmissionError {
    pub fn transmission<S: Into<String>>(details: S) -> Self {
        Self::Transmission {
            details: details.into(),
            status: None,
        }
    }
}

impl From<reqwest::Error> for SubmissionError {
    fn from(e: reqwest::Error) -> Self {
        SubmissionError::Transmission {
            details: e.to_string(),
            status: e.status().map(|s| s.as_u16()),
        }
    }
}

/// A failure surfaced to the user and kept on the workflow state until the
/// next successful transition clears it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Failure {
    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error("Could not read the picked file: {details}")]
    FileRead { details: String },
}

impl Failure {
    pub fn kind(&self) -> &'static str {
        match self {
            Failure::Camera(CameraError::PermissionDenied { .. })
            | Failure::Camera(CameraError::FacingUnavailable { .. }) => "permission_denied",
            Failure::Camera(_) => "camera",
            Failure::Submission(SubmissionError::MalformedAsset(_)) => "malformed_asset",
            Failure::Submission(SubmissionError::Transmission { .. }) => "transmission",
            Failure::FileRead { .. } => "file_read",
        }
    }
}

pub type Result<T> = std::result::Result<T, GrainError>;
