pub mod asset;
pub mod camera;
pub mod config;
pub mod error;
pub mod events;
pub mod source;
pub mod submission;
pub mod workflow;

pub use asset::{decode_from_transport, encode_for_transport, AssetOrigin, ImageAsset, LocalFile};
pub use camera::{
    AspectRatio, CameraAdapter, CameraAdapterBuilder, CameraDevice, CameraHandle,
    DeviceCameraConfig, DeviceClass, Facing, MockCameraDevice, ViewportClassifier,
};
pub use config::GrainometerConfig;
pub use error::{AssetError, CameraError, Failure, GrainError, Result, SubmissionError};
pub use events::{EventBus, NoticeFilter, NoticeReceiver, WorkflowNotice};
pub use source::{first_acquired, AcquisitionSource, CameraSource, FileSource};
pub use submission::{
    AnalysisResult, GradingService, HttpGradingService, MockGradingService, SubmissionPipeline,
};
pub use workflow::{Mode, WorkflowController, WorkflowEvent, WorkflowState};
