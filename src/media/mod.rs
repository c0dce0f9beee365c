//! Media host abstraction.
//!
//! The media host stores the image bytes. Objects are identified by an
//! opaque public id and served from a stable `secure_url`. Uploads go
//! straight from the client to the host using a server-minted
//! [`UploadAuthorization`](crate::signature::UploadAuthorization); deletes
//! are admin calls made by the server with the API secret.

mod cloudinary;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::MediaError;
use crate::signature::UploadAuthorization;

pub use cloudinary::{image_endpoint, Cloudinary, DEFAULT_CLOUDINARY_BASE_URL};

/// A file picked for upload.
#[derive(Debug, Clone)]
pub struct ImageFile {
    /// Original file name, forwarded to the host
    pub file_name: String,

    /// MIME type as reported by the picker or guessed by the caller
    pub content_type: String,

    pub bytes: Bytes,
}

impl ImageFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Whether the declared content type is an image type.
    pub fn is_image(&self) -> bool {
        self.content_type
            .trim()
            .to_ascii_lowercase()
            .starts_with("image/")
    }
}

/// What the host returns for a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedAsset {
    pub secure_url: String,
    pub public_id: String,
}

/// Server-side admin operations on the media host.
#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Irreversibly delete an object.
    ///
    /// Returns [`MediaError::NotFound`] if the host reports no such object.
    async fn destroy(&self, public_id: &str) -> Result<(), MediaError>;
}

/// Client-side direct uploads.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    /// Upload one file with a previously minted authorization.
    async fn upload(
        &self,
        file: &ImageFile,
        authorization: &UploadAuthorization,
    ) -> Result<UploadedAsset, MediaError>;
}
