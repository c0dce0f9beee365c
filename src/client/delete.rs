//! Delete flow and the in-memory gallery it updates.
//!
//! Order is fixed: remote object, then row, then the local list. The remote
//! result is checked; anything but success or "already gone" stops the flow
//! with both the row and the object still in place.

use tracing::{info, warn};

use crate::error::GalleryError;
use crate::store::ImageRecord;

use super::{ImageRecords, RemoteMedia, Removal};

/// The user's images as currently shown, newest first.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    images: Vec<ImageRecord>,
}

impl Gallery {
    pub fn new(mut images: Vec<ImageRecord>) -> Self {
        images.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Self { images }
    }

    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ImageRecord> {
        self.images.iter().find(|image| image.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Drop one image from the list.
    pub fn remove(&mut self, id: &str) -> Option<ImageRecord> {
        let index = self.images.iter().position(|image| image.id == id)?;
        Some(self.images.remove(index))
    }
}

/// Runs one delete against the media endpoint and the record store.
///
/// Takes the gallery by `&mut`, so a second delete cannot start while one
/// is in flight.
pub struct DeleteOrchestrator<'a, M: ?Sized, R: ?Sized> {
    media: &'a M,
    records: &'a R,
}

impl<'a, M, R> DeleteOrchestrator<'a, M, R>
where
    M: RemoteMedia + ?Sized,
    R: ImageRecords + ?Sized,
{
    pub fn new(media: &'a M, records: &'a R) -> Self {
        Self { media, records }
    }

    /// Delete one image everywhere it lives.
    pub async fn delete(
        &self,
        gallery: &mut Gallery,
        image: &ImageRecord,
    ) -> Result<(), GalleryError> {
        let remote = self
            .media
            .delete_remote(&image.cloudinary_public_id)
            .await?;
        if remote == Removal::AlreadyAbsent {
            info!(public_id = %image.cloudinary_public_id, "Media object already absent");
        }

        match self.records.delete_record(&image.id).await {
            Ok(Removal::Removed) => {}
            Ok(Removal::AlreadyAbsent) => info!(id = %image.id, "Image row already absent"),
            Err(e) => {
                warn!(
                    id = %image.id,
                    public_id = %image.cloudinary_public_id,
                    error = %e,
                    "Row delete failed after media delete; row is dangling"
                );
                return Err(e);
            }
        }

        gallery.remove(&image.id);
        Ok(())
    }
}
