use super::*;
use crate::asset::AssetOrigin;
use crate::config::GrainometerConfig;
use crate::error::CameraError;

fn create_test_adapter(device: MockCameraDevice) -> CameraAdapter {
    CameraAdapterBuilder::new()
        .config(GrainometerConfig::default().camera)
        .device(Box::new(device))
        .build()
        .unwrap()
}

#[test]
fn test_handheld_classification_requests_rear_portrait() {
    let classifier = ViewportClassifier::new(768, 767);
    assert_eq!(classifier.device_class(), DeviceClass::Handheld);

    let config = classifier.camera_config();
    assert_eq!(config.facing, Facing::Rear);
    assert_eq!(config.aspect_ratio, AspectRatio::PORTRAIT);
    assert!(config.aspect_ratio.is_portrait());
}

#[test]
fn test_threshold_width_is_not_handheld() {
    let classifier = ViewportClassifier::new(768, 768);
    assert_eq!(classifier.device_class(), DeviceClass::Desktop);

    let config = classifier.camera_config();
    assert_eq!(config.facing, Facing::Front);
    assert_eq!(config.aspect_ratio, AspectRatio::LANDSCAPE);
}

#[test]
fn test_resize_reports_class_changes_only() {
    let mut classifier = ViewportClassifier::default();
    assert!(!classifier.on_resize(1024));
    assert!(classifier.on_resize(390));
    assert!(!classifier.on_resize(412));
    assert_eq!(classifier.viewport_width(), 412);
    assert!(classifier.on_resize(1440));
}

#[test]
fn test_aspect_ratio_display() {
    assert_eq!(AspectRatio::PORTRAIT.to_string(), "9:16");
    assert!((AspectRatio::LANDSCAPE.as_f64() - 16.0 / 9.0).abs() < f64::EPSILON);
    assert_eq!(Facing::Rear.to_string(), "rear-facing");
}

#[tokio::test]
async fn test_activate_snapshot_deactivate() {
    let device = MockCameraDevice::new();
    let monitor = device.monitor();
    let mut adapter = create_test_adapter(device);

    let config = DeviceCameraConfig::for_class(DeviceClass::Handheld);
    let handle = adapter.activate(config).await.unwrap();
    assert!(adapter.is_active());
    assert!(monitor.is_open());
    assert_eq!(monitor.last_request(), Some(config));
    assert_eq!(handle.config(), config);

    let asset = adapter.snapshot(&handle).await.unwrap();
    assert_eq!(asset.mime_type(), "image/jpeg");
    assert_eq!(asset.origin(), AssetOrigin::Camera);
    assert!(asset.is_transport_encoded());

    let bytes = asset.to_bytes().unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

    // Repeated snapshots while active are allowed
    adapter.snapshot(&handle).await.unwrap();
    assert_eq!(monitor.frames_captured(), 2);

    adapter.deactivate(&handle);
    assert!(!adapter.is_active());
    assert!(!monitor.is_open());
    assert_eq!(monitor.close_count(), 1);
}

#[tokio::test]
async fn test_snapshot_after_deactivate_fails() {
    let mut adapter = create_test_adapter(MockCameraDevice::new());
    let handle = adapter
        .activate(DeviceCameraConfig::for_class(DeviceClass::Desktop))
        .await
        .unwrap();
    adapter.deactivate(&handle);

    let result = adapter.snapshot(&handle).await;
    assert_eq!(result.unwrap_err(), CameraError::NotActive);
}

#[tokio::test]
async fn test_permission_denied_leaves_camera_closed() {
    let device = MockCameraDevice::new().deny_permission();
    let monitor = device.monitor();
    let mut adapter = create_test_adapter(device);

    let result = adapter
        .activate(DeviceCameraConfig::for_class(DeviceClass::Handheld))
        .await;

    assert!(matches!(result, Err(CameraError::PermissionDenied { .. })));
    assert!(!adapter.is_active());
    assert!(!monitor.is_open());
}

#[tokio::test]
async fn test_missing_facing_is_not_substituted() {
    let device = MockCameraDevice::with_facings(&[Facing::Front]);
    let monitor = device.monitor();
    let mut adapter = create_test_adapter(device);

    let result = adapter
        .activate(DeviceCameraConfig::for_class(DeviceClass::Handheld))
        .await;

    assert_eq!(
        result.unwrap_err(),
        CameraError::FacingUnavailable {
            facing: Facing::Rear
        }
    );
    assert_eq!(monitor.open_attempts(), 1);
    assert!(!monitor.is_open());
}

#[tokio::test]
async fn test_reactivation_releases_previous_handle() {
    let device = MockCameraDevice::new();
    let monitor = device.monitor();
    let mut adapter = create_test_adapter(device);

    let first = adapter
        .activate(DeviceCameraConfig::for_class(DeviceClass::Desktop))
        .await
        .unwrap();
    let second = adapter
        .activate(DeviceCameraConfig::for_class(DeviceClass::Handheld))
        .await
        .unwrap();

    assert_ne!(first, second);
    assert_eq!(monitor.close_count(), 1);
    assert!(adapter.snapshot(&first).await.is_err());
    assert!(adapter.snapshot(&second).await.is_ok());

    // Stale handle must not close the current activation
    adapter.deactivate(&first);
    assert!(adapter.is_active());
}

#[tokio::test]
async fn test_drop_releases_device() {
    let device = MockCameraDevice::new();
    let monitor = device.monitor();
    {
        let mut adapter = create_test_adapter(device);
        adapter
            .activate(DeviceCameraConfig::for_class(DeviceClass::Desktop))
            .await
            .unwrap();
        assert!(monitor.is_open());
    }
    assert!(!monitor.is_open());
}

#[test]
fn test_builder_requires_device() {
    let result = CameraAdapterBuilder::new().build();
    match result {
        Err(crate::error::GrainError::System { message }) => {
            assert!(message.contains("Camera device must be specified"));
        }
        _ => panic!("Expected system error for missing device"),
    }
}
