//! ImageAsset codec: the single in-memory shape for acquired images.
//!
//! Camera snapshots are held in their transport (`data:` URL) form and local
//! files as raw bytes. Both decode to the same `(bytes, mime)` pair when
//! submitted.

mod codec;
mod file;

pub use codec::{decode_from_transport, encode_for_transport};
pub use file::{mime_from_extension, LocalFile};

use crate::error::AssetError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Where an asset came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetOrigin {
    Camera,
    File,
    /// Annotated image returned by the grading service
    Service,
}

#[derive(Clone, PartialEq)]
enum AssetPayload {
    Raw(Arc<Vec<u8>>),
    Transport(Arc<str>),
}

/// An acquired image. Immutable once created and cheap to clone.
#[derive(Clone)]
pub struct ImageAsset {
    mime_type: String,
    payload: AssetPayload,
    origin: AssetOrigin,
    file_name: Option<String>,
    acquired_at: DateTime<Utc>,
}

impl ImageAsset {
    pub fn from_bytes<S: Into<String>>(bytes: Vec<u8>, mime_type: S, origin: AssetOrigin) -> Self {
        Self {
            mime_type: mime_type.into(),
            payload: AssetPayload::Raw(Arc::new(bytes)),
            origin,
            file_name: None,
            acquired_at: Utc::now(),
        }
    }

    /// Wrap a `data:` URL. Only the header is checked here; the payload is
    /// decoded when the asset is submitted.
    pub fn from_transport<S: Into<String>>(text: S, origin: AssetOrigin) -> Result<Self, AssetError> {
        let text: String = text.into();
        let (mime_type, _) = codec::split_transport(&text)?;
        let mime_type = mime_type.to_string();

        Ok(Self {
            mime_type,
            payload: AssetPayload::Transport(Arc::from(text)),
            origin,
            file_name: None,
            acquired_at: Utc::now(),
        })
    }

    /// Name the asset after the file it was read from
    pub fn with_file_name<S: Into<String>>(mut self, file_name: S) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn origin(&self) -> AssetOrigin {
        self.origin
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }

    pub fn is_transport_encoded(&self) -> bool {
        matches!(self.payload, AssetPayload::Transport(_))
    }

    /// Raw image bytes, decoding the transport form if needed
    pub fn to_bytes(&self) -> Result<Cow<'_, [u8]>, AssetError> {
        match &self.payload {
            AssetPayload::Raw(bytes) => Ok(Cow::Borrowed(bytes.as_slice())),
            AssetPayload::Transport(text) => {
                let (bytes, _) = decode_from_transport(text)?;
                Ok(Cow::Owned(bytes))
            }
        }
    }

    /// Self-contained URI suitable for rendering a preview
    pub fn preview_uri(&self) -> Cow<'_, str> {
        match &self.payload {
            AssetPayload::Raw(bytes) => Cow::Owned(encode_for_transport(bytes, &self.mime_type)),
            AssetPayload::Transport(text) => Cow::Borrowed(text),
        }
    }

    /// True when both assets hold the same encoded content
    pub fn same_content(&self, other: &ImageAsset) -> bool {
        self.mime_type == other.mime_type && self.payload == other.payload
    }

    fn stored_len(&self) -> usize {
        match &self.payload {
            AssetPayload::Raw(bytes) => bytes.len(),
            AssetPayload::Transport(text) => text.len(),
        }
    }
}

impl fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAsset")
            .field("mime_type", &self.mime_type)
            .field("origin", &self.origin)
            .field("transport_encoded", &self.is_transport_encoded())
            .field("stored_len", &self.stored_len())
            .field("file_name", &self.file_name)
            .field("acquired_at", &self.acquired_at)
            .finish()
    }
}
