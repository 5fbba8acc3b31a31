use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GrainometerConfig {
    pub service: ServiceConfig,
    pub camera: CameraConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Base URL of the grading service
    #[serde(default = "default_service_url")]
    pub url: String,

    /// Path of the scan endpoint, relative to `url`
    #[serde(default = "default_scan_path")]
    pub scan_path: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Viewports narrower than this (logical pixels) are treated as handheld
    #[serde(default = "default_handheld_max_width")]
    pub handheld_max_width: u32,

    /// How long to wait for a still frame
    #[serde(default = "default_snapshot_timeout_ms")]
    pub snapshot_timeout_ms: u64,

    /// JPEG quality used when a device delivers raw frames
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Device index of the rear-facing camera (e.g., 0 for /dev/video0)
    #[serde(default = "default_rear_device_index")]
    pub rear_device_index: u32,

    /// Device index of the front-facing camera
    #[serde(default = "default_front_device_index")]
    pub front_device_index: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    /// Viewport width used for the initial device classification
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    /// Capacity of the workflow notice bus
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl ServiceConfig {
    /// Full URL of the scan endpoint
    pub fn scan_url(&self) -> String {
        format!(
            "{}/{}",
            self.url.trim_end_matches('/'),
            self.scan_path.trim_start_matches('/')
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl CameraConfig {
    pub fn snapshot_timeout(&self) -> Duration {
        Duration::from_millis(self.snapshot_timeout_ms)
    }
}

impl GrainometerConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("grainometer.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("service.url", default_service_url())?
            .set_default("service.scan_path", default_scan_path())?
            .set_default("service.timeout_seconds", default_timeout_seconds())?
            .set_default("camera.handheld_max_width", default_handheld_max_width())?
            .set_default("camera.snapshot_timeout_ms", default_snapshot_timeout_ms())?
            .set_default("camera.jpeg_quality", default_jpeg_quality() as u64)?
            .set_default("camera.rear_device_index", default_rear_device_index())?
            .set_default("camera.front_device_index", default_front_device_index())?
            .set_default("session.viewport_width", default_viewport_width())?
            .set_default(
                "session.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .add_source(File::with_name(&path_str).required(false))
            .add_source(
                Environment::with_prefix("GRAINOMETER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: GrainometerConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.service.url.starts_with("http://") || self.service.url.starts_with("https://")) {
            return Err(ConfigError::Message(format!(
                "Service url must be http(s), got '{}'",
                self.service.url
            )));
        }

        if self.service.timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "Service timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.camera.handheld_max_width == 0 {
            return Err(ConfigError::Message(
                "Camera handheld_max_width must be greater than 0".to_string(),
            ));
        }

        if self.camera.jpeg_quality == 0 || self.camera.jpeg_quality > 100 {
            return Err(ConfigError::Message(
                "Camera jpeg_quality must be between 1 and 100".to_string(),
            ));
        }

        if self.camera.rear_device_index == self.camera.front_device_index {
            return Err(ConfigError::Message(
                "Rear and front cameras must use different device indices".to_string(),
            ));
        }

        if self.session.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for GrainometerConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                url: default_service_url(),
                scan_path: default_scan_path(),
                timeout_seconds: default_timeout_seconds(),
            },
            camera: CameraConfig {
                handheld_max_width: default_handheld_max_width(),
                snapshot_timeout_ms: default_snapshot_timeout_ms(),
                jpeg_quality: default_jpeg_quality(),
                rear_device_index: default_rear_device_index(),
                front_device_index: default_front_device_index(),
            },
            session: SessionConfig {
                viewport_width: default_viewport_width(),
                event_bus_capacity: default_event_bus_capacity(),
            },
        }
    }
}

// Default value functions
fn default_service_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_scan_path() -> String {
    "/scan".to_string()
}
fn default_timeout_seconds() -> u64 {
    30
}

fn default_handheld_max_width() -> u32 {
    768
}
fn default_snapshot_timeout_ms() -> u64 {
    3000
}
fn default_jpeg_quality() -> u8 {
    85
}
fn default_rear_device_index() -> u32 {
    0
}
fn default_front_device_index() -> u32 {
    1
}

fn default_viewport_width() -> u32 {
    1280
}
fn default_event_bus_capacity() -> usize {
    64
}
