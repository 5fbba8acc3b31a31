use super::types::{Effect, Mode, WorkflowEvent};
use crate::asset::ImageAsset;
use crate::error::{Failure, GrainError, Result, SubmissionError};
use crate::submission::AnalysisResult;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The single mutable workflow object. `apply` is the only writer.
#[derive(Debug, Default)]
pub struct WorkflowState {
    mode: Mode,
    current_asset: Option<ImageAsset>,
    current_result: Option<AnalysisResult>,
    submission_in_flight: Option<Uuid>,
    last_error: Option<Failure>,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn current_asset(&self) -> Option<&ImageAsset> {
        self.current_asset.as_ref()
    }

    pub fn current_result(&self) -> Option<&AnalysisResult> {
        self.current_result.as_ref()
    }

    pub fn submission_in_flight(&self) -> bool {
        self.submission_in_flight.is_some()
    }

    /// Id of the submission whose completion is still awaited
    pub fn in_flight_id(&self) -> Option<Uuid> {
        self.submission_in_flight
    }

    /// Last surfaced failure; cleared by the next transition that does not fail
    pub fn last_error(&self) -> Option<&Failure> {
        self.last_error.as_ref()
    }

    /// Apply one event. Events not allowed in the current mode are rejected
    /// and leave the state untouched.
    pub fn apply(&mut self, event: WorkflowEvent) -> Result<Vec<Effect>> {
        let from = self.mode;
        let name = event.name();
        let mut dispatched = false;

        let effects = match (self.mode, event) {
            (Mode::Idle, WorkflowEvent::StartCapture) => {
                self.mode = Mode::Capturing;
                vec![Effect::ActivateCamera]
            }
            (Mode::Idle, WorkflowEvent::ChooseFile(asset)) => {
                let effect = present(&asset);
                self.current_asset = Some(asset);
                self.mode = Mode::Previewing;
                vec![effect]
            }
            (Mode::Capturing, WorkflowEvent::FilePickedWhileCapturing(asset))
            | (Mode::Capturing, WorkflowEvent::SnapshotTaken(asset)) => {
                let effect = present(&asset);
                self.current_asset = Some(asset);
                self.mode = Mode::Previewing;
                vec![Effect::DeactivateCamera, effect]
            }
            (Mode::Capturing, WorkflowEvent::SnapshotFailed(error)) => {
                // Camera stays open so the user can try again
                vec![Effect::SurfaceError(error.into())]
            }
            (Mode::Idle, WorkflowEvent::AcquisitionFailed(failure))
            | (Mode::Capturing, WorkflowEvent::AcquisitionFailed(failure)) => {
                vec![Effect::SurfaceError(failure)]
            }
            (Mode::Capturing, WorkflowEvent::CameraActivationFailed(error)) => {
                self.mode = Mode::Idle;
                vec![Effect::DeactivateCamera, Effect::SurfaceError(error.into())]
            }
            (Mode::Capturing, WorkflowEvent::Cancel) => {
                self.mode = Mode::Idle;
                vec![Effect::DeactivateCamera]
            }
            (Mode::Previewing, WorkflowEvent::Retake) => {
                if let Some(id) = self.submission_in_flight.take() {
                    info!("Leaving preview with submission {} in flight; its result will be ignored", id);
                }
                self.current_asset = None;
                self.mode = Mode::Capturing;
                vec![Effect::ActivateCamera]
            }
            (Mode::Previewing, WorkflowEvent::Submit) => {
                if let Some(id) = self.submission_in_flight {
                    debug!("Submission {} already in flight; ignoring submit", id);
                    return Ok(Vec::new());
                }

                let asset = self.current_asset.clone().ok_or_else(|| {
                    GrainError::system("Previewing without a current asset")
                })?;

                let id = Uuid::new_v4();
                self.submission_in_flight = Some(id);
                dispatched = true;
                vec![Effect::DispatchSubmission { id, asset }]
            }
            (_, WorkflowEvent::SubmissionSucceeded { id, result }) => {
                if !self.is_current_submission(id) {
                    return Ok(vec![Effect::IgnoreStaleCompletion(id)]);
                }

                self.submission_in_flight = None;
                let effect = Effect::PresentResult {
                    grade: result.grade.clone(),
                    head_rice_percentage: result.head_rice_percentage,
                };
                self.current_result = Some(result);
                self.mode = Mode::ResultReady;
                vec![effect]
            }
            (_, WorkflowEvent::SubmissionFailed { id, error }) => {
                if !self.is_current_submission(id) {
                    return Ok(vec![Effect::IgnoreStaleCompletion(id)]);
                }

                self.submission_in_flight = None;
                if let SubmissionError::MalformedAsset(_) = error {
                    // The asset cannot be sent; the user has to acquire a new one
                    self.current_asset = None;
                    self.mode = Mode::Idle;
                }
                vec![Effect::SurfaceError(error.into())]
            }
            (Mode::ResultReady, WorkflowEvent::ScanNext) => {
                self.current_result = None;
                self.current_asset = None;
                self.mode = Mode::Capturing;
                vec![Effect::ActivateCamera]
            }
            (Mode::ResultReady, WorkflowEvent::Reset) => {
                self.current_result = None;
                self.current_asset = None;
                self.mode = Mode::Idle;
                Vec::new()
            }
            (mode, event) => {
                warn!("Rejected event '{}' in mode {:?}", event.name(), mode);
                return Err(GrainError::InvalidTransition {
                    mode,
                    event: event.name(),
                });
            }
        };

        let surfaced = effects.iter().find_map(|effect| match effect {
            Effect::SurfaceError(failure) => Some(failure.clone()),
            _ => None,
        });
        if surfaced.is_some() {
            self.last_error = surfaced;
        } else if self.mode != from || dispatched {
            self.last_error = None;
        }

        if self.mode != from {
            debug!("'{}': {:?} -> {:?}", name, from, self.mode);
        }
        debug_assert!(self.check_invariants().is_ok(), "{:?}", self.check_invariants());

        Ok(effects)
    }

    /// Verify the structural invariants of the workflow
    pub fn check_invariants(&self) -> std::result::Result<(), &'static str> {
        if self.mode == Mode::ResultReady && self.current_result.is_none() {
            return Err("result mode without a result");
        }
        if self.mode == Mode::Previewing && self.current_asset.is_none() {
            return Err("preview mode without an asset");
        }
        if self.submission_in_flight.is_some() && self.mode != Mode::Previewing {
            return Err("submission in flight outside preview mode");
        }
        Ok(())
    }

    fn is_current_submission(&self, id: Uuid) -> bool {
        self.mode == Mode::Previewing && self.submission_in_flight == Some(id)
    }
}

fn present(asset: &ImageAsset) -> Effect {
    Effect::PresentAsset {
        origin: asset.origin(),
        mime_type: asset.mime_type().to_string(),
    }
}
