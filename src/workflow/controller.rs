use super::state::WorkflowState;
use super::types::{Effect, Mode, WorkflowEvent};
use crate::asset::{AssetOrigin, ImageAsset, LocalFile};
use crate::camera::{CameraAdapter, CameraHandle, DeviceCameraConfig, ViewportClassifier};
use crate::config::GrainometerConfig;
use crate::error::{CameraError, Failure, GrainError, Result};
use crate::events::{EventBus, WorkflowNotice};
use crate::source::{first_acquired, CameraSource, FileSource};
use crate::submission::{GradingService, SubmissionPipeline};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Drives the workflow: turns user intent into events, runs the effects each
/// transition asks for, and feeds asynchronous completions back in.
pub struct WorkflowController {
    state: WorkflowState,
    camera: CameraAdapter,
    camera_handle: Option<CameraHandle>,
    classifier: ViewportClassifier,
    pipeline: SubmissionPipeline,
    event_bus: EventBus,
    completions_tx: mpsc::UnboundedSender<WorkflowEvent>,
    completions_rx: mpsc::UnboundedReceiver<WorkflowEvent>,
}

impl WorkflowController {
    pub fn new(
        config: &GrainometerConfig,
        camera: CameraAdapter,
        service: Arc<dyn GradingService>,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        Self {
            state: WorkflowState::new(),
            camera,
            camera_handle: None,
            classifier: ViewportClassifier::new(
                config.camera.handheld_max_width,
                config.session.viewport_width,
            ),
            pipeline: SubmissionPipeline::new(service),
            event_bus: EventBus::new(config.session.event_bus_capacity),
            completions_tx,
            completions_rx,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn camera(&self) -> &CameraAdapter {
        &self.camera
    }

    /// Constraints the next camera activation will request
    pub fn next_camera_config(&self) -> DeviceCameraConfig {
        self.classifier.camera_config()
    }

    /// Viewport size notification. Only the next activation is affected; an
    /// open device keeps its constraints.
    pub fn resize(&mut self, viewport_width: u32) {
        if self.classifier.on_resize(viewport_width) {
            let next = self.classifier.camera_config();
            info!(
                "Viewport {}px classified as {:?}; next activation uses {} camera at {}",
                viewport_width,
                self.classifier.device_class(),
                next.facing,
                next.aspect_ratio
            );
        }
    }

    pub async fn start_capture(&mut self) -> Result<()> {
        self.dispatch(WorkflowEvent::StartCapture).await
    }

    /// Read a picked file. From idle this is choose-file; while capturing it
    /// bypasses the snapshot.
    pub async fn choose_file(&mut self, file: &LocalFile) -> Result<()> {
        let mode = self.state.mode();
        if !matches!(mode, Mode::Idle | Mode::Capturing) {
            return Err(GrainError::InvalidTransition {
                mode,
                event: "choose-file",
            });
        }

        match ImageAsset::from_local_file(file).await {
            Ok(asset) => self.dispatch(picked_event(mode, asset)).await,
            Err(e) => {
                let failure = Failure::FileRead {
                    details: format!("{}: {}", file.path().display(), e),
                };
                self.dispatch(WorkflowEvent::AcquisitionFailed(failure)).await
            }
        }
    }

    /// Take a snapshot from the active camera
    pub async fn take_snapshot(&mut self) -> Result<()> {
        let handle = self.capturing_handle("snapshot-taken")?;

        match self.camera.snapshot(&handle).await {
            Ok(asset) => self.dispatch(WorkflowEvent::SnapshotTaken(asset)).await,
            Err(e) => self.dispatch(WorkflowEvent::SnapshotFailed(e)).await,
        }
    }

    /// While capturing, race the shutter against the file picker; whichever
    /// produces an image first moves the workflow to preview.
    pub async fn acquire_while_capturing<S, P>(&mut self, shutter: S, pick: P) -> Result<()>
    where
        S: Future<Output = ()> + Send + 'static,
        P: Future<Output = Option<LocalFile>> + Send + 'static,
    {
        let handle = self.capturing_handle("snapshot-taken")?;

        let outcome = {
            let mut camera_source = CameraSource::new(&mut self.camera, handle, shutter);
            let mut file_source = FileSource::new(pick);
            first_acquired(&mut camera_source, &mut file_source).await
        };

        match outcome {
            Ok(asset) => {
                let event = match asset.origin() {
                    AssetOrigin::Camera => WorkflowEvent::SnapshotTaken(asset),
                    _ => WorkflowEvent::FilePickedWhileCapturing(asset),
                };
                self.dispatch(event).await
            }
            Err(GrainError::Camera(e)) => self.dispatch(WorkflowEvent::SnapshotFailed(e)).await,
            Err(GrainError::SelectionCancelled) => Ok(()),
            Err(e) => {
                let failure = Failure::FileRead {
                    details: e.to_string(),
                };
                self.dispatch(WorkflowEvent::AcquisitionFailed(failure)).await
            }
        }
    }

    pub async fn cancel(&mut self) -> Result<()> {
        self.dispatch(WorkflowEvent::Cancel).await
    }

    pub async fn retake(&mut self) -> Result<()> {
        self.dispatch(WorkflowEvent::Retake).await
    }

    /// Dispatch the current asset. A no-op while a submission is in flight.
    pub async fn submit(&mut self) -> Result<()> {
        self.dispatch(WorkflowEvent::Submit).await
    }

    pub async fn scan_next(&mut self) -> Result<()> {
        self.dispatch(WorkflowEvent::ScanNext).await
    }

    pub async fn reset(&mut self) -> Result<()> {
        self.dispatch(WorkflowEvent::Reset).await
    }

    /// Wait for the next submission completion and apply it
    pub async fn next_completion(&mut self) -> Result<()> {
        let event = self
            .completions_rx
            .recv()
            .await
            .ok_or_else(|| GrainError::system("Submission completion channel closed"))?;
        self.dispatch(event).await
    }

    /// Apply completions until no submission is in flight
    pub async fn wait_for_submission(&mut self) -> Result<()> {
        while self.state.submission_in_flight() {
            self.next_completion().await?;
        }
        Ok(())
    }

    /// Apply completions that have already arrived without waiting
    pub async fn poll_completions(&mut self) -> Result<usize> {
        let mut handled = 0;
        while let Ok(event) = self.completions_rx.try_recv() {
            self.dispatch(event).await?;
            handled += 1;
        }
        Ok(handled)
    }

    /// Release the camera if it is still held
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.camera_handle.take() {
            self.camera.deactivate(&handle);
            self.event_bus.publish(WorkflowNotice::CameraReleased);
        }
        info!("Workflow controller shut down in mode {:?}", self.state.mode());
    }

    /// Feed one event through the transition function and run its effects.
    /// Effects may produce follow-up events, which are applied in order.
    pub async fn dispatch(&mut self, event: WorkflowEvent) -> Result<()> {
        let mut pending = VecDeque::from([event]);

        while let Some(event) = pending.pop_front() {
            let from = self.state.mode();
            let effects = self.state.apply(event)?;
            let to = self.state.mode();

            if from != to {
                self.event_bus.publish(WorkflowNotice::ModeChanged { from, to });
            }

            for effect in effects {
                if let Some(follow_up) = self.execute(effect).await {
                    pending.push_back(follow_up);
                }
            }
        }

        Ok(())
    }

    async fn execute(&mut self, effect: Effect) -> Option<WorkflowEvent> {
        match effect {
            Effect::ActivateCamera => {
                let config = self.classifier.camera_config();
                match self.camera.activate(config).await {
                    Ok(handle) => {
                        self.camera_handle = Some(handle);
                        self.event_bus
                            .publish(WorkflowNotice::CameraActivated { config });
                        None
                    }
                    Err(e) => Some(WorkflowEvent::CameraActivationFailed(e)),
                }
            }
            Effect::DeactivateCamera => {
                if let Some(handle) = self.camera_handle.take() {
                    self.camera.deactivate(&handle);
                    self.event_bus.publish(WorkflowNotice::CameraReleased);
                }
                None
            }
            Effect::PresentAsset { origin, mime_type } => {
                self.event_bus
                    .publish(WorkflowNotice::AssetAcquired { origin, mime_type });
                None
            }
            Effect::DispatchSubmission { id, asset } => {
                self.spawn_submission(id, asset);
                self.event_bus
                    .publish(WorkflowNotice::SubmissionDispatched { submission_id: id });
                None
            }
            Effect::PresentResult {
                grade,
                head_rice_percentage,
            } => {
                self.event_bus.publish(WorkflowNotice::ResultReady {
                    grade,
                    head_rice_percentage,
                });
                None
            }
            Effect::SurfaceError(failure) => {
                self.event_bus
                    .publish(WorkflowNotice::ErrorSurfaced { failure });
                None
            }
            Effect::IgnoreStaleCompletion(id) => {
                self.event_bus
                    .publish(WorkflowNotice::StaleCompletionIgnored { submission_id: id });
                None
            }
        }
    }

    // In-flight requests are never aborted; a completion that is no longer
    // current is dropped by the transition function.
    fn spawn_submission(&self, id: uuid::Uuid, asset: ImageAsset) {
        let pipeline = self.pipeline.clone();
        let completions = self.completions_tx.clone();

        tokio::spawn(async move {
            let event = match pipeline.submit(&asset).await {
                Ok(result) => WorkflowEvent::SubmissionSucceeded { id, result },
                Err(error) => {
                    warn!("Submission {} failed: {}", id, error);
                    WorkflowEvent::SubmissionFailed { id, error }
                }
            };

            if completions.send(event).is_err() {
                debug!("Controller gone before submission {} completed", id);
            }
        });
    }

    fn capturing_handle(&self, event: &'static str) -> Result<CameraHandle> {
        let mode = self.state.mode();
        if mode != Mode::Capturing {
            return Err(GrainError::InvalidTransition { mode, event });
        }
        self.camera_handle
            .ok_or_else(|| GrainError::Camera(CameraError::NotActive))
    }
}

fn picked_event(mode: Mode, asset: ImageAsset) -> WorkflowEvent {
    match mode {
        Mode::Capturing => WorkflowEvent::FilePickedWhileCapturing(asset),
        _ => WorkflowEvent::ChooseFile(asset),
    }
}
