use super::{AssetOrigin, ImageAsset};
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_MIME: &str = "application/octet-stream";

/// A local file chosen through the file picker
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
    declared_mime: Option<String>,
}

impl LocalFile {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            declared_mime: None,
        }
    }

    /// Use the MIME type reported by the picker instead of the extension
    pub fn with_mime<S: Into<String>>(mut self, mime_type: S) -> Self {
        self.declared_mime = Some(mime_type.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    pub fn mime_type(&self) -> String {
        self.declared_mime
            .clone()
            .unwrap_or_else(|| mime_from_extension(&self.path).to_string())
    }
}

/// Infer a MIME type from a file extension
pub fn mime_from_extension(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("gif") => "image/gif",
        _ => DEFAULT_MIME,
    }
}

impl ImageAsset {
    /// Read a local file into an asset. The bytes are kept raw; only camera
    /// snapshots go through the transport encoding.
    pub async fn from_local_file(file: &LocalFile) -> Result<Self> {
        let bytes = tokio::fs::read(file.path()).await?;
        let mime_type = file.mime_type();

        debug!(
            "Read local file {} ({} bytes, {})",
            file.path().display(),
            bytes.len(),
            mime_type
        );

        let asset = ImageAsset::from_bytes(bytes, mime_type, AssetOrigin::File);
        Ok(match file.file_name() {
            Some(name) => asset.with_file_name(name),
            None => asset,
        })
    }
}
