use super::interface::{CameraDevice, CapturedFrame, FrameFormat};
use super::profile::{DeviceCameraConfig, Facing};
use crate::error::CameraError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
struct MockState {
    open: Option<DeviceCameraConfig>,
    open_attempts: u32,
    close_count: u32,
    frames_captured: u64,
    last_request: Option<DeviceCameraConfig>,
}

/// Synthetic camera for tests and for running without capture hardware.
/// Produces RGB gradient frames shaped by the requested aspect ratio.
pub struct MockCameraDevice {
    available: Vec<Facing>,
    deny_permission: bool,
    long_edge: u32,
    state: Arc<Mutex<MockState>>,
}

impl MockCameraDevice {
    pub fn new() -> Self {
        Self::with_facings(&[Facing::Rear, Facing::Front])
    }

    pub fn with_facings(facings: &[Facing]) -> Self {
        Self {
            available: facings.to_vec(),
            deny_permission: false,
            long_edge: 64,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Refuse every activation as if the user declined camera access
    pub fn deny_permission(mut self) -> Self {
        self.deny_permission = true;
        self
    }

    pub fn long_edge(mut self, pixels: u32) -> Self {
        self.long_edge = pixels.max(16);
        self
    }

    /// Observer that stays valid after the device is moved into an adapter
    pub fn monitor(&self) -> MockCameraMonitor {
        MockCameraMonitor {
            state: Arc::clone(&self.state),
        }
    }

    fn frame_size(&self, config: &DeviceCameraConfig) -> (u32, u32) {
        let ratio = config.aspect_ratio;
        let short_edge = (self.long_edge * ratio.width.min(ratio.height)
            / ratio.width.max(ratio.height))
        .max(1);

        if ratio.is_portrait() {
            (short_edge, self.long_edge)
        } else {
            (self.long_edge, short_edge)
        }
    }
}

impl Default for MockCameraDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CameraDevice for MockCameraDevice {
    async fn open(&mut self, config: &DeviceCameraConfig) -> Result<(), CameraError> {
        let mut state = self.state.lock();
        state.open_attempts += 1;
        state.last_request = Some(*config);

        if self.deny_permission {
            return Err(CameraError::PermissionDenied {
                details: "camera access was declined".to_string(),
            });
        }

        if !self.available.contains(&config.facing) {
            return Err(CameraError::FacingUnavailable {
                facing: config.facing,
            });
        }

        state.open = Some(*config);
        debug!("Mock camera opened ({})", config.facing);
        Ok(())
    }

    async fn capture_frame(&mut self) -> Result<CapturedFrame, CameraError> {
        let config = self.state.lock().open.ok_or(CameraError::NotActive)?;
        let (width, height) = self.frame_size(&config);

        let frame_id = {
            let mut state = self.state.lock();
            state.frames_captured += 1;
            state.frames_captured
        };

        let shift = (frame_id % 256) as u32;
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(((x * 255 / width + shift) % 256) as u8);
                data.push(((y * 255 / height) % 256) as u8);
                data.push((((x + y) * 255 / (width + height) + shift) % 256) as u8);
            }
        }

        Ok(CapturedFrame {
            data,
            width,
            height,
            format: FrameFormat::Rgb24,
        })
    }

    fn close(&mut self) {
        let mut state = self.state.lock();
        if state.open.take().is_some() {
            state.close_count += 1;
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Read-only view of a mock device's activity
#[derive(Clone)]
pub struct MockCameraMonitor {
    state: Arc<Mutex<MockState>>,
}

impl MockCameraMonitor {
    pub fn is_open(&self) -> bool {
        self.state.lock().open.is_some()
    }

    pub fn open_attempts(&self) -> u32 {
        self.state.lock().open_attempts
    }

    pub fn close_count(&self) -> u32 {
        self.state.lock().close_count
    }

    pub fn frames_captured(&self) -> u64 {
        self.state.lock().frames_captured
    }

    pub fn last_request(&self) -> Option<DeviceCameraConfig> {
        self.state.lock().last_request
    }
}
