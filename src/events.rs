use crate::asset::AssetOrigin;
use crate::camera::DeviceCameraConfig;
use crate::error::Failure;
use crate::workflow::Mode;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Notices published by the workflow controller for UI observers
#[derive(Debug, Clone)]
pub enum WorkflowNotice {
    /// The workflow moved between modes
    ModeChanged { from: Mode, to: Mode },
    /// The camera was opened with these constraints
    CameraActivated { config: DeviceCameraConfig },
    /// The camera device was released
    CameraReleased,
    /// A new current asset is available for preview
    AssetAcquired {
        origin: AssetOrigin,
        mime_type: String,
    },
    /// A submission left for the grading service
    SubmissionDispatched { submission_id: Uuid },
    /// A completion arrived for a submission that is no longer current
    StaleCompletionIgnored { submission_id: Uuid },
    /// A grading result is ready to display
    ResultReady {
        grade: String,
        head_rice_percentage: f64,
    },
    /// A failure that must be shown to the user
    ErrorSurfaced { failure: Failure },
}

impl WorkflowNotice {
    /// Get a human-readable description of the notice
    pub fn description(&self) -> String {
        match self {
            WorkflowNotice::ModeChanged { from, to } => format!("Mode {:?} -> {:?}", from, to),
            WorkflowNotice::CameraActivated { config } => {
                format!("Camera activated ({}, {})", config.facing, config.aspect_ratio)
            }
            WorkflowNotice::CameraReleased => "Camera released".to_string(),
            WorkflowNotice::AssetAcquired { origin, mime_type } => {
                format!("Asset acquired from {:?} ({})", origin, mime_type)
            }
            WorkflowNotice::SubmissionDispatched { submission_id } => {
                format!("Submission {} dispatched", submission_id)
            }
            WorkflowNotice::StaleCompletionIgnored { submission_id } => {
                format!("Ignored late completion of submission {}", submission_id)
            }
            WorkflowNotice::ResultReady {
                grade,
                head_rice_percentage,
            } => format!("Result ready: {} ({:.2}% head rice)", grade, head_rice_percentage),
            WorkflowNotice::ErrorSurfaced { failure } => format!("Error: {}", failure),
        }
    }

    /// Get the notice kind as a string for filtering
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowNotice::ModeChanged { .. } => "mode_changed",
            WorkflowNotice::CameraActivated { .. } => "camera_activated",
            WorkflowNotice::CameraReleased => "camera_released",
            WorkflowNotice::AssetAcquired { .. } => "asset_acquired",
            WorkflowNotice::SubmissionDispatched { .. } => "submission_dispatched",
            WorkflowNotice::StaleCompletionIgnored { .. } => "stale_completion_ignored",
            WorkflowNotice::ResultReady { .. } => "result_ready",
            WorkflowNotice::ErrorSurfaced { .. } => "error_surfaced",
        }
    }
}

/// Broadcast bus for workflow notices
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<WorkflowNotice>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to all notices
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowNotice> {
        self.sender.subscribe()
    }

    /// Subscribe with a filter
    pub fn subscribe_filtered(&self, filter: NoticeFilter, name: &str) -> NoticeReceiver {
        NoticeReceiver {
            receiver: self.sender.subscribe(),
            filter,
            name: name.to_string(),
        }
    }

    /// Publish a notice; returns the number of subscribers reached. Having no
    /// subscribers is not an error.
    pub fn publish(&self, notice: WorkflowNotice) -> usize {
        match &notice {
            WorkflowNotice::ErrorSurfaced { failure } => {
                error!("Workflow error surfaced: {}", failure);
            }
            WorkflowNotice::ResultReady { .. } | WorkflowNotice::ModeChanged { .. } => {
                info!("{}", notice.description());
            }
            _ => debug!("{}", notice.description()),
        }

        self.sender.send(notice).unwrap_or(0)
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Notice filter for selective handling
#[derive(Debug, Clone)]
pub enum NoticeFilter {
    All,
    Kinds(Vec<&'static str>),
}

impl NoticeFilter {
    pub fn matches(&self, notice: &WorkflowNotice) -> bool {
        match self {
            NoticeFilter::All => true,
            NoticeFilter::Kinds(kinds) => kinds.contains(&notice.kind()),
        }
    }
}

/// Receiver that skips notices not matching its filter
pub struct NoticeReceiver {
    receiver: broadcast::Receiver<WorkflowNotice>,
    filter: NoticeFilter,
    name: String,
}

impl NoticeReceiver {
    /// Next matching notice, or `None` once the bus is closed
    pub async fn recv(&mut self) -> Option<WorkflowNotice> {
        loop {
            match self.receiver.recv().await {
                Ok(notice) if self.filter.matches(&notice) => return Some(notice),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} notices", self.name, n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return None;
                }
            }
        }
    }

    /// Drain matching notices without waiting
    pub fn drain(&mut self) -> Vec<WorkflowNotice> {
        let mut notices = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(notice) => {
                    if self.filter.matches(&notice) {
                        notices.push(notice);
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} notices", self.name, n);
                }
                Err(_) => return notices,
            }
        }
    }
}
