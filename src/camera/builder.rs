use super::interface::{CameraAdapter, CameraDevice};
use crate::config::CameraConfig;
use crate::error::{GrainError, Result};

/// Builder for the camera adapter
pub struct CameraAdapterBuilder {
    config: Option<CameraConfig>,
    device: Option<Box<dyn CameraDevice>>,
}

impl CameraAdapterBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            device: None,
        }
    }

    pub fn config(mut self, config: CameraConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn device(mut self, device: Box<dyn CameraDevice>) -> Self {
        self.device = Some(device);
        self
    }

    pub fn build(self) -> Result<CameraAdapter> {
        let device = self
            .device
            .ok_or_else(|| GrainError::system("Camera device must be specified"))?;

        Ok(match self.config {
            Some(config) => CameraAdapter::with_settings(device, &config),
            None => CameraAdapter::new(device),
        })
    }
}

impl Default for CameraAdapterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
