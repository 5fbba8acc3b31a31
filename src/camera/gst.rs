use super::interface::{CameraDevice, CapturedFrame, FrameFormat};
use super::profile::{DeviceCameraConfig, Facing};
use crate::config::CameraConfig;
use crate::error::CameraError;
use async_trait::async_trait;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use std::io::ErrorKind;
use std::time::Duration;
use tracing::{debug, info, warn};

/// V4L2 still capture through GStreamer. Each facing maps to a fixed
/// `/dev/videoN`; a missing node is reported as an unavailable facing.
pub struct GstCameraDevice {
    rear_index: u32,
    front_index: u32,
    jpeg_quality: u8,
    frame_timeout: Duration,
    pipeline: Option<Pipeline>,
    sink: Option<AppSink>,
}

impl GstCameraDevice {
    pub fn new(config: &CameraConfig) -> Result<Self, CameraError> {
        gstreamer::init().map_err(|e| CameraError::DeviceOpen {
            details: format!("Failed to initialize GStreamer: {}", e),
        })?;

        Ok(Self {
            rear_index: config.rear_device_index,
            front_index: config.front_device_index,
            jpeg_quality: config.jpeg_quality,
            frame_timeout: config.snapshot_timeout(),
            pipeline: None,
            sink: None,
        })
    }

    fn device_path(&self, facing: Facing) -> String {
        let index = match facing {
            Facing::Rear => self.rear_index,
            Facing::Front => self.front_index,
        };
        format!("/dev/video{}", index)
    }

    fn build_pipeline_string(&self, device: &str, config: &DeviceCameraConfig) -> String {
        format!(
            "v4l2src device={} ! videoconvert ! \
             aspectratiocrop aspect-ratio={}/{} ! \
             jpegenc quality={} ! \
             appsink name=sink sync=false max-buffers=1 drop=true",
            device,
            config.aspect_ratio.width,
            config.aspect_ratio.height,
            self.jpeg_quality
        )
    }

    fn check_device(device: &str, facing: Facing) -> Result<(), CameraError> {
        match std::fs::File::open(device) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => Err(CameraError::PermissionDenied {
                details: format!("{}: {}", device, e),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(CameraError::FacingUnavailable { facing })
            }
            Err(e) => Err(CameraError::DeviceOpen {
                details: format!("{}: {}", device, e),
            }),
        }
    }
}

#[async_trait]
impl CameraDevice for GstCameraDevice {
    async fn open(&mut self, config: &DeviceCameraConfig) -> Result<(), CameraError> {
        let device = self.device_path(config.facing);
        Self::check_device(&device, config.facing)?;

        let pipeline_desc = self.build_pipeline_string(&device, config);
        info!("Creating GStreamer pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| CameraError::DeviceOpen {
                details: format!("Failed to create pipeline: {}", e),
            })?
            .downcast::<Pipeline>()
            .map_err(|_| CameraError::DeviceOpen {
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        let sink = pipeline
            .by_name("sink")
            .and_then(|element| element.downcast::<AppSink>().ok())
            .ok_or_else(|| CameraError::DeviceOpen {
                details: "Pipeline has no appsink".to_string(),
            })?;

        if let Err(e) = pipeline.set_state(gstreamer::State::Playing) {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(CameraError::DeviceOpen {
                details: format!("Failed to start pipeline: {}", e),
            });
        }

        self.pipeline = Some(pipeline);
        self.sink = Some(sink);
        Ok(())
    }

    async fn capture_frame(&mut self) -> Result<CapturedFrame, CameraError> {
        let sink = self.sink.clone().ok_or(CameraError::NotActive)?;
        let timeout = gstreamer::ClockTime::from_mseconds(self.frame_timeout.as_millis() as u64);

        let sample = tokio::task::spawn_blocking(move || sink.try_pull_sample(timeout))
            .await
            .map_err(|e| CameraError::Capture {
                details: format!("Frame task failed: {}", e),
            })?
            .ok_or_else(|| CameraError::Capture {
                details: "No sample from appsink".to_string(),
            })?;

        let (width, height) = sample
            .caps()
            .and_then(|caps| caps.structure(0))
            .and_then(|s| Some((s.get::<i32>("width").ok()?, s.get::<i32>("height").ok()?)))
            .map(|(w, h)| (w.max(0) as u32, h.max(0) as u32))
            .unwrap_or((0, 0));

        let buffer = sample.buffer().ok_or_else(|| CameraError::Capture {
            details: "No buffer in sample".to_string(),
        })?;
        let map = buffer.map_readable().map_err(|e| CameraError::Capture {
            details: format!("Failed to map buffer: {}", e),
        })?;

        debug!("Pulled JPEG still {}x{} ({} bytes)", width, height, map.len());

        Ok(CapturedFrame {
            data: map.as_slice().to_vec(),
            width,
            height,
            format: FrameFormat::Jpeg,
        })
    }

    fn close(&mut self) {
        self.sink = None;
        if let Some(pipeline) = self.pipeline.take() {
            if let Err(e) = pipeline.set_state(gstreamer::State::Null) {
                warn!("Failed to stop GStreamer pipeline: {}", e);
            }
        }
    }

    fn name(&self) -> &str {
        "gstreamer"
    }
}
