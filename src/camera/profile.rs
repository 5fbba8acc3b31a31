use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Which way the requested camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facing {
    Rear,
    Front,
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facing::Rear => write!(f, "rear-facing"),
            Facing::Front => write!(f, "front-facing"),
        }
    }
}

/// Requested frame aspect ratio, width:height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    pub const PORTRAIT: AspectRatio = AspectRatio {
        width: 9,
        height: 16,
    };
    pub const LANDSCAPE: AspectRatio = AspectRatio {
        width: 16,
        height: 9,
    };

    pub fn as_f64(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

/// Camera constraints requested on activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCameraConfig {
    pub facing: Facing,
    pub aspect_ratio: AspectRatio,
}

impl DeviceCameraConfig {
    pub fn for_class(class: DeviceClass) -> Self {
        match class {
            DeviceClass::Handheld => Self {
                facing: Facing::Rear,
                aspect_ratio: AspectRatio::PORTRAIT,
            },
            DeviceClass::Desktop => Self {
                facing: Facing::Front,
                aspect_ratio: AspectRatio::LANDSCAPE,
            },
        }
    }
}

/// Coarse device classification from viewport width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceClass {
    Handheld,
    Desktop,
}

/// Tracks the viewport width and derives the camera constraints for the
/// next activation. An already-open device is never reconfigured.
#[derive(Debug, Clone)]
pub struct ViewportClassifier {
    handheld_max_width: u32,
    viewport_width: u32,
}

impl ViewportClassifier {
    pub const DEFAULT_HANDHELD_MAX_WIDTH: u32 = 768;

    pub fn new(handheld_max_width: u32, viewport_width: u32) -> Self {
        Self {
            handheld_max_width,
            viewport_width,
        }
    }

    /// Record a resize notification. Returns true if the device class changed.
    pub fn on_resize(&mut self, viewport_width: u32) -> bool {
        let before = self.device_class();
        self.viewport_width = viewport_width;
        let after = self.device_class();

        if before != after {
            debug!(
                "Viewport {}px reclassified device from {:?} to {:?}",
                viewport_width, before, after
            );
        }
        before != after
    }

    pub fn viewport_width(&self) -> u32 {
        self.viewport_width
    }

    pub fn device_class(&self) -> DeviceClass {
        if self.viewport_width < self.handheld_max_width {
            DeviceClass::Handheld
        } else {
            DeviceClass::Desktop
        }
    }

    pub fn camera_config(&self) -> DeviceCameraConfig {
        DeviceCameraConfig::for_class(self.device_class())
    }
}

impl Default for ViewportClassifier {
    fn default() -> Self {
        Self::new(Self::DEFAULT_HANDHELD_MAX_WIDTH, 1280)
    }
}
