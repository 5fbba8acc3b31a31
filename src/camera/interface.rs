use super::profile::DeviceCameraConfig;
use crate::asset::{encode_for_transport, AssetOrigin, ImageAsset};
use crate::config::CameraConfig;
use crate::error::CameraError;
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

const SNAPSHOT_MIME: &str = "image/jpeg";

/// Pixel layout of a frame pulled from a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    /// Already JPEG-compressed
    Jpeg,
    /// Packed 8-bit RGB
    Rgb24,
}

/// A still frame pulled from an open device
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: FrameFormat,
}

/// Device capture collaborator: open a stream with exact constraints, pull
/// still frames, close.
#[async_trait]
pub trait CameraDevice: Send {
    /// Open the device with exactly the requested facing. Implementations
    /// must fail with `FacingUnavailable` rather than substitute another
    /// camera.
    async fn open(&mut self, config: &DeviceCameraConfig) -> Result<(), CameraError>;

    async fn capture_frame(&mut self) -> Result<CapturedFrame, CameraError>;

    /// Release the device. Must be synchronous and idempotent.
    fn close(&mut self);

    fn name(&self) -> &str;
}

/// Token for one activation of the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraHandle {
    id: u64,
    config: DeviceCameraConfig,
}

impl CameraHandle {
    pub fn config(&self) -> DeviceCameraConfig {
        self.config
    }
}

/// Owns the camera device exclusively and hands out one handle per activation
pub struct CameraAdapter {
    device: Box<dyn CameraDevice>,
    active: Option<CameraHandle>,
    next_handle_id: u64,
    jpeg_quality: u8,
    snapshot_timeout: Duration,
}

impl CameraAdapter {
    pub fn new(device: Box<dyn CameraDevice>) -> Self {
        Self {
            device,
            active: None,
            next_handle_id: 1,
            jpeg_quality: 85,
            snapshot_timeout: Duration::from_secs(3),
        }
    }

    pub fn with_settings(device: Box<dyn CameraDevice>, settings: &CameraConfig) -> Self {
        let mut adapter = Self::new(device);
        adapter.jpeg_quality = settings.jpeg_quality;
        adapter.snapshot_timeout = settings.snapshot_timeout();
        adapter
    }

    /// Open the device with the given constraints
    pub async fn activate(&mut self, config: DeviceCameraConfig) -> Result<CameraHandle, CameraError> {
        if let Some(previous) = self.active {
            warn!("Camera already active; releasing before re-activation");
            self.deactivate(&previous);
        }

        info!(
            "Activating {} camera ({}) on {}",
            config.facing,
            config.aspect_ratio,
            self.device.name()
        );

        if let Err(e) = self.device.open(&config).await {
            warn!("Camera activation failed: {}", e);
            // Leave nothing half-open
            self.device.close();
            return Err(e);
        }

        let handle = CameraHandle {
            id: self.next_handle_id,
            config,
        };
        self.next_handle_id += 1;
        self.active = Some(handle);

        debug!("Camera handle {} active", handle.id);
        Ok(handle)
    }

    /// Capture the current frame as a JPEG `data:` URL asset
    pub async fn snapshot(&mut self, handle: &CameraHandle) -> Result<ImageAsset, CameraError> {
        if self.active.map(|h| h.id) != Some(handle.id) {
            return Err(CameraError::NotActive);
        }

        let timeout = self.snapshot_timeout;
        let frame = tokio::time::timeout(timeout, self.device.capture_frame())
            .await
            .map_err(|_| CameraError::Capture {
                details: format!("no frame within {:?}", timeout),
            })??;

        trace!(
            "Captured {:?} frame {}x{} ({} bytes)",
            frame.format,
            frame.width,
            frame.height,
            frame.data.len()
        );

        let jpeg = self.to_jpeg(frame)?;
        let text = encode_for_transport(&jpeg, SNAPSHOT_MIME);

        ImageAsset::from_transport(text, AssetOrigin::Camera).map_err(|e| CameraError::Capture {
            details: e.to_string(),
        })
    }

    /// Release the device held by `handle`. Stale handles are ignored.
    pub fn deactivate(&mut self, handle: &CameraHandle) {
        match self.active {
            Some(active) if active.id == handle.id => {
                self.device.close();
                self.active = None;
                info!("Camera released ({})", self.device.name());
            }
            _ => debug!("Ignoring deactivate for stale camera handle {}", handle.id),
        }
    }

    /// Release whatever activation is current
    pub fn release(&mut self) {
        if let Some(active) = self.active {
            self.deactivate(&active);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_handle(&self) -> Option<CameraHandle> {
        self.active
    }

    fn to_jpeg(&self, frame: CapturedFrame) -> Result<Vec<u8>, CameraError> {
        match frame.format {
            FrameFormat::Jpeg => Ok(frame.data),
            FrameFormat::Rgb24 => {
                let image = RgbImage::from_raw(frame.width, frame.height, frame.data).ok_or_else(|| {
                    CameraError::Capture {
                        details: format!(
                            "RGB frame buffer does not match {}x{}",
                            frame.width, frame.height
                        ),
                    }
                })?;

                let mut buf = Vec::new();
                let mut encoder = JpegEncoder::new_with_quality(&mut buf, self.jpeg_quality);
                encoder.encode_image(&image).map_err(|e| CameraError::Capture {
                    details: format!("JPEG encoding failed: {}", e),
                })?;
                Ok(buf)
            }
        }
    }
}

impl Drop for CameraAdapter {
    fn drop(&mut self) {
        self.release();
    }
}
