//! Upload flow: signature, direct upload, then metadata row.
//!
//! ```text
//! UploadForm ──validate──► request_signature ──► MediaUploader::upload ──► insert_record
//!     │                          │                       │                      │
//!     └─ Validation              └─ nothing written      └─ no row              └─ orphaned object (warn)
//! ```
//!
//! The two writes are not atomic. A failed insert leaves the object at the
//! media host with no row pointing at it; that window is logged, not undone.

use tracing::{debug, info, warn};

use crate::error::GalleryError;
use crate::media::{ImageFile, MediaUploader};
use crate::store::{ImageRecord, NewImage};

use super::{ImageRecords, SignatureSource};

/// What the user filled in on the upload page.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub title: String,
    pub description: String,
    pub file: Option<ImageFile>,
}

impl UploadForm {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            file: None,
        }
    }

    pub fn with_file(mut self, file: ImageFile) -> Self {
        self.file = Some(file);
        self
    }

    /// Check the form without touching the network.
    ///
    /// Returns the picked file together with the trimmed title and the
    /// description (`None` when blank).
    pub fn validate(&self) -> Result<(&ImageFile, String, Option<String>), GalleryError> {
        let file = self
            .file
            .as_ref()
            .ok_or_else(|| GalleryError::Validation("Please select an image to upload.".into()))?;

        if !file.is_image() {
            return Err(GalleryError::Validation(
                "Please select an image file.".to_string(),
            ));
        }

        let title = self.title.trim();
        if title.is_empty() {
            return Err(GalleryError::Validation("Title is required".to_string()));
        }

        let description = Some(self.description.trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Ok((file, title.to_string(), description))
    }
}

/// Where an upload attempt stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Validate,
    Signature,
    DirectUpload,
    PersistMetadata,
}

impl UploadStage {
    pub fn as_str(self) -> &'static str {
        match self {
            UploadStage::Validate => "validate",
            UploadStage::Signature => "signature",
            UploadStage::DirectUpload => "direct_upload",
            UploadStage::PersistMetadata => "persist_metadata",
        }
    }
}

/// Runs one upload attempt against the three collaborators.
pub struct UploadOrchestrator<'a, G: ?Sized, U: ?Sized, R: ?Sized> {
    signatures: &'a G,
    uploader: &'a U,
    records: &'a R,
}

impl<'a, G, U, R> UploadOrchestrator<'a, G, U, R>
where
    G: SignatureSource + ?Sized,
    U: MediaUploader + ?Sized,
    R: ImageRecords + ?Sized,
{
    pub fn new(signatures: &'a G, uploader: &'a U, records: &'a R) -> Self {
        Self {
            signatures,
            uploader,
            records,
        }
    }

    /// Upload the form's file and record it.
    ///
    /// On success exactly one record exists for the returned object.
    pub async fn upload(&self, form: &UploadForm) -> Result<ImageRecord, GalleryError> {
        self.run(form).await.map_err(|(stage, err)| {
            debug!(stage = stage.as_str(), error = %err, "Upload abandoned");
            err
        })
    }

    async fn run(&self, form: &UploadForm) -> Result<ImageRecord, (UploadStage, GalleryError)> {
        let (file, title, description) =
            form.validate().map_err(|e| (UploadStage::Validate, e))?;

        let authorization = self
            .signatures
            .request_signature()
            .await
            .map_err(|e| (UploadStage::Signature, e))?;

        let asset = self
            .uploader
            .upload(file, &authorization)
            .await
            .map_err(|e| (UploadStage::DirectUpload, GalleryError::from(e)))?;

        let image = NewImage {
            title,
            description,
            image_url: asset.secure_url,
            cloudinary_public_id: asset.public_id.clone(),
        };

        match self.records.insert_record(&image).await {
            Ok(record) => {
                info!(id = %record.id, public_id = %record.cloudinary_public_id, "Image uploaded");
                Ok(record)
            }
            Err(e) => {
                warn!(
                    public_id = %asset.public_id,
                    error = %e,
                    "Metadata insert failed; media object is orphaned"
                );
                Err((UploadStage::PersistMetadata, e))
            }
        }
    }
}
