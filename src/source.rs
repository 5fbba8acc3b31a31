//! Acquisition sources: the camera and the file picker behind one capability.

use crate::asset::{AssetOrigin, ImageAsset, LocalFile};
use crate::camera::{CameraAdapter, CameraHandle};
use crate::error::{GrainError, Result};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, warn};

/// Something that eventually yields one image
#[async_trait]
pub trait AcquisitionSource: Send {
    async fn acquire(&mut self) -> Result<ImageAsset>;

    fn origin(&self) -> AssetOrigin;
}

type Trigger<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Takes a snapshot from an active camera once the shutter future resolves
pub struct CameraSource<'a> {
    adapter: &'a mut CameraAdapter,
    handle: CameraHandle,
    shutter: Option<Trigger<'a, ()>>,
}

impl<'a> CameraSource<'a> {
    pub fn new<S>(adapter: &'a mut CameraAdapter, handle: CameraHandle, shutter: S) -> Self
    where
        S: Future<Output = ()> + Send + 'a,
    {
        Self {
            adapter,
            handle,
            shutter: Some(Box::pin(shutter)),
        }
    }
}

#[async_trait]
impl<'a> AcquisitionSource for CameraSource<'a> {
    async fn acquire(&mut self) -> Result<ImageAsset> {
        if let Some(shutter) = self.shutter.take() {
            shutter.await;
        }
        debug!("Shutter released");
        Ok(self.adapter.snapshot(&self.handle).await?)
    }

    fn origin(&self) -> AssetOrigin {
        AssetOrigin::Camera
    }
}

/// Reads whichever local file the picker eventually returns
pub struct FileSource<'a> {
    pick: Option<Trigger<'a, Option<LocalFile>>>,
}

impl<'a> FileSource<'a> {
    pub fn new<P>(pick: P) -> Self
    where
        P: Future<Output = Option<LocalFile>> + Send + 'a,
    {
        Self {
            pick: Some(Box::pin(pick)),
        }
    }

    /// A file that is already chosen
    pub fn ready(file: LocalFile) -> Self {
        Self::new(async move { Some(file) })
    }
}

#[async_trait]
impl<'a> AcquisitionSource for FileSource<'a> {
    async fn acquire(&mut self) -> Result<ImageAsset> {
        let picked = match self.pick.take() {
            Some(pick) => pick.await,
            None => None,
        };

        match picked {
            Some(file) => ImageAsset::from_local_file(&file).await,
            None => Err(GrainError::SelectionCancelled),
        }
    }

    fn origin(&self) -> AssetOrigin {
        AssetOrigin::File
    }
}

/// Run two sources concurrently and return the first image produced. The
/// first real failure ends the race; a cancelled file pick only drops that
/// source out so the other may still complete.
pub async fn first_acquired(
    first: &mut dyn AcquisitionSource,
    second: &mut dyn AcquisitionSource,
) -> Result<ImageAsset> {
    let first_origin = first.origin();
    let second_origin = second.origin();
    let mut first_fut = first.acquire();
    let mut second_fut = second.acquire();

    let mut first_done = false;
    let mut second_done = false;

    loop {
        let (origin, result) = tokio::select! {
            result = &mut first_fut, if !first_done => {
                first_done = true;
                (first_origin, result)
            }
            result = &mut second_fut, if !second_done => {
                second_done = true;
                (second_origin, result)
            }
            else => return Err(GrainError::SelectionCancelled),
        };

        match result {
            Ok(asset) => return Ok(asset),
            Err(GrainError::SelectionCancelled) => {
                debug!("{:?} source was cancelled", origin);
            }
            Err(e) => {
                warn!("{:?} source failed: {}", origin, e);
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{DeviceCameraConfig, DeviceClass, MockCameraDevice};
    use std::io::Write;
    use tokio::sync::oneshot;

    fn jpeg_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
        file.write_all(&[0xFF, 0xD8, 0xFF, 0xD9]).unwrap();
        file
    }

    #[tokio::test]
    async fn test_file_wins_when_shutter_never_fires() {
        let file = jpeg_file();
        let mut adapter = CameraAdapter::new(Box::new(MockCameraDevice::new()));
        let handle = adapter
            .activate(DeviceCameraConfig::for_class(DeviceClass::Handheld))
            .await
            .unwrap();

        let (_shutter_tx, shutter_rx) = oneshot::channel::<()>();
        let mut camera = CameraSource::new(&mut adapter, handle, async move {
            let _ = shutter_rx.await;
            std::future::pending::<()>().await
        });
        let mut picker = FileSource::ready(LocalFile::new(file.path()));

        let asset = first_acquired(&mut camera, &mut picker).await.unwrap();
        assert_eq!(asset.origin(), AssetOrigin::File);
        assert_eq!(asset.to_bytes().unwrap().as_ref(), &[0xFF, 0xD8, 0xFF, 0xD9]);
    }

    #[tokio::test]
    async fn test_snapshot_wins_when_picker_is_pending() {
        let mut adapter = CameraAdapter::new(Box::new(MockCameraDevice::new()));
        let handle = adapter
            .activate(DeviceCameraConfig::for_class(DeviceClass::Desktop))
            .await
            .unwrap();

        let mut camera = CameraSource::new(&mut adapter, handle, async {});
        let mut picker = FileSource::new(std::future::pending::<Option<LocalFile>>());

        let asset = first_acquired(&mut camera, &mut picker).await.unwrap();
        assert_eq!(asset.origin(), AssetOrigin::Camera);
        assert_eq!(asset.mime_type(), "image/jpeg");
    }

    #[tokio::test]
    async fn test_cancelled_pick_lets_camera_finish() {
        let mut adapter = CameraAdapter::new(Box::new(MockCameraDevice::new()));
        let handle = adapter
            .activate(DeviceCameraConfig::for_class(DeviceClass::Desktop))
            .await
            .unwrap();

        let (shutter_tx, shutter_rx) = oneshot::channel::<()>();
        let mut camera = CameraSource::new(&mut adapter, handle, async move {
            let _ = shutter_rx.await;
        });
        let mut picker = FileSource::new(async move {
            // Fire the shutter only after the picker has given up
            let _ = shutter_tx.send(());
            None
        });

        let asset = first_acquired(&mut camera, &mut picker).await.unwrap();
        assert_eq!(asset.origin(), AssetOrigin::Camera);
    }

    #[tokio::test]
    async fn test_camera_failure_after_cancelled_pick_is_reported() {
        let mut adapter = CameraAdapter::new(Box::new(MockCameraDevice::new()));
        let handle = adapter
            .activate(DeviceCameraConfig::for_class(DeviceClass::Desktop))
            .await
            .unwrap();
        adapter.deactivate(&handle);

        let mut camera = CameraSource::new(&mut adapter, handle, async {});
        let mut picker = FileSource::new(async { None });

        let result = first_acquired(&mut camera, &mut picker).await;
        assert!(matches!(
            result,
            Err(GrainError::Camera(crate::error::CameraError::NotActive))
        ));
    }

    #[tokio::test]
    async fn test_unreadable_pick_ends_race_while_shutter_waits() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("gone.jpg");
        let mut adapter = CameraAdapter::new(Box::new(MockCameraDevice::new()));
        let handle = adapter
            .activate(DeviceCameraConfig::for_class(DeviceClass::Desktop))
            .await
            .unwrap();

        let mut camera = CameraSource::new(&mut adapter, handle, std::future::pending::<()>());
        let mut picker = FileSource::ready(LocalFile::new(missing));

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            first_acquired(&mut camera, &mut picker),
        )
        .await
        .expect("race did not end on a failed pick");
        assert!(matches!(result, Err(GrainError::Io(_))));
    }

    #[tokio::test]
    async fn test_only_cancellations_report_cancelled() {
        let mut first = FileSource::new(async { None });
        let mut second = FileSource::new(async { None });

        let result = first_acquired(&mut first, &mut second).await;
        assert!(matches!(result, Err(GrainError::SelectionCancelled)));
    }
}
