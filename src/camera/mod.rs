mod builder;
#[cfg(all(feature = "gstreamer", target_os = "linux"))]
mod gst;
mod interface;
mod mock;
mod profile;
#[cfg(test)]
mod tests;

pub use builder::CameraAdapterBuilder;
#[cfg(all(feature = "gstreamer", target_os = "linux"))]
pub use gst::GstCameraDevice;
pub use interface::{CameraAdapter, CameraDevice, CameraHandle, CapturedFrame, FrameFormat};
pub use mock::{MockCameraDevice, MockCameraMonitor};
pub use profile::{AspectRatio, DeviceCameraConfig, DeviceClass, Facing, ViewportClassifier};
