//! Client flow tests against in-memory collaborators.
//!
//! Tests verify:
//! - Invalid uploads never request a signature
//! - A failed direct upload writes no row
//! - A successful upload yields exactly one row for the new object
//! - Delete removes object, row and gallery entry, in that order
//! - A failed remote delete leaves everything in place
//! - The same flows run through `GalleryClient` against a served router

use cloud_gallery::client::{
    Action, DeleteOrchestrator, Gallery, GalleryClient, ImageRecords, Notice, RemoteMedia,
    Removal, UploadForm, UploadOrchestrator,
};
use cloud_gallery::error::{GalleryError, MediaError};
use cloud_gallery::forms::LoginForm;
use cloud_gallery::media::{ImageFile, MediaHost};
use cloud_gallery::signature::UploadSigner;

use super::test_utils::{png, spawn_server, FakeBackend, FakeMediaHost, MemoryStore};

fn backend() -> FakeBackend {
    let store = MemoryStore::new().with_user("alice@example.com", "pw");
    let token = store.session_for("alice@example.com");
    FakeBackend::new(store, FakeMediaHost::new(), token)
}

// =============================================================================
// Upload
// =============================================================================

#[tokio::test]
async fn test_non_image_rejected_before_signature() {
    let backend = backend();
    let orchestrator = UploadOrchestrator::new(&backend, &backend.media, &backend);

    let form = UploadForm::new("Notes", "")
        .with_file(ImageFile::new("notes.pdf", "application/pdf", vec![1u8, 2, 3]));
    let err = orchestrator.upload(&form).await.unwrap_err();

    assert!(matches!(err, GalleryError::Validation(_)));
    assert_eq!(backend.signature_requests(), 0);
    assert_eq!(backend.media.upload_calls(), 0);
    assert_eq!(backend.store.image_count(), 0);
}

#[tokio::test]
async fn test_missing_file_and_blank_title_rejected() {
    let backend = backend();
    let orchestrator = UploadOrchestrator::new(&backend, &backend.media, &backend);

    assert!(orchestrator.upload(&UploadForm::new("Cat", "")).await.is_err());
    assert!(orchestrator
        .upload(&UploadForm::new("  ", "").with_file(png("cat.png")))
        .await
        .is_err());
    assert_eq!(backend.signature_requests(), 0);
}

#[tokio::test]
async fn test_successful_upload_creates_one_record() {
    let backend = backend();
    let orchestrator = UploadOrchestrator::new(&backend, &backend.media, &backend);

    let form = UploadForm::new(" Cat ", "On a mat").with_file(png("cat.png"));
    let record = orchestrator.upload(&form).await.unwrap();

    assert_eq!(record.title, "Cat");
    assert_eq!(record.description.as_deref(), Some("On a mat"));
    assert!(backend.media.contains(&record.cloudinary_public_id));
    assert_eq!(backend.signature_requests(), 1);

    let images = backend.store.images();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].cloudinary_public_id, record.cloudinary_public_id);
    assert_eq!(images[0].image_url, record.image_url);
}

#[tokio::test]
async fn test_rejected_signature_writes_nothing() {
    let backend = backend().with_signer(UploadSigner::new("wrong-secret"));
    let orchestrator = UploadOrchestrator::new(&backend, &backend.media, &backend);

    let err = orchestrator
        .upload(&UploadForm::new("Cat", "").with_file(png("cat.png")))
        .await
        .unwrap_err();

    assert!(matches!(err, GalleryError::Upstream(ref m) if m == "Invalid Signature"));
    assert_eq!(
        Notice::failure(Action::Upload, &err).description,
        "Invalid Signature"
    );
    assert_eq!(backend.media.object_count(), 0);
    assert_eq!(backend.store.image_count(), 0);
}

#[tokio::test]
async fn test_failed_direct_upload_writes_no_row() {
    let backend = backend();
    backend
        .media
        .fail_upload(MediaError::Connection("reset".to_string()));
    let orchestrator = UploadOrchestrator::new(&backend, &backend.media, &backend);

    let result = orchestrator
        .upload(&UploadForm::new("Cat", "").with_file(png("cat.png")))
        .await;

    assert!(matches!(result, Err(GalleryError::Upstream(_))));
    assert_eq!(backend.signature_requests(), 1);
    assert_eq!(backend.store.image_count(), 0);
}

#[tokio::test]
async fn test_failed_insert_leaves_orphaned_object() {
    let backend = backend();
    backend.store.fail_inserts();
    let orchestrator = UploadOrchestrator::new(&backend, &backend.media, &backend);

    let result = orchestrator
        .upload(&UploadForm::new("Cat", "").with_file(png("cat.png")))
        .await;

    assert!(result.is_err());
    assert_eq!(backend.store.image_count(), 0);
    // Not compensated: the object stays at the host
    assert_eq!(backend.media.object_count(), 1);
}

// =============================================================================
// Delete
// =============================================================================

async fn uploaded(backend: &FakeBackend, names: &[&str]) -> Gallery {
    let orchestrator = UploadOrchestrator::new(backend, &backend.media, backend);
    for name in names {
        let form = UploadForm::new(*name, "").with_file(png(&format!("{}.png", name)));
        orchestrator.upload(&form).await.unwrap();
    }
    Gallery::new(backend.store.images())
}

#[tokio::test]
async fn test_delete_removes_object_row_and_entry() {
    let backend = backend();
    let mut gallery = uploaded(&backend, &["cat", "dog"]).await;
    let cat = gallery
        .images()
        .iter()
        .find(|i| i.title == "cat")
        .cloned()
        .unwrap();

    DeleteOrchestrator::new(&backend, &backend)
        .delete(&mut gallery, &cat)
        .await
        .unwrap();

    assert!(!backend.media.contains(&cat.cloudinary_public_id));
    assert_eq!(backend.media.object_count(), 1);
    assert_eq!(backend.store.image_count(), 1);
    assert!(!gallery.contains(&cat.id));
    assert_eq!(gallery.len(), 1);
}

#[tokio::test]
async fn test_delete_tolerates_absent_object() {
    let backend = backend();
    let mut gallery = uploaded(&backend, &["cat"]).await;
    let cat = gallery.images()[0].clone();

    // Someone already removed the object at the host
    backend.media.destroy(&cat.cloudinary_public_id).await.unwrap();

    DeleteOrchestrator::new(&backend, &backend)
        .delete(&mut gallery, &cat)
        .await
        .unwrap();

    assert_eq!(backend.store.image_count(), 0);
    assert!(gallery.is_empty());
}

#[tokio::test]
async fn test_delete_tolerates_absent_row() {
    let backend = backend();
    let mut gallery = uploaded(&backend, &["cat"]).await;
    let cat = gallery.images()[0].clone();

    let mut stale = cat.clone();
    stale.id = "does-not-exist".to_string();
    let mut stale_gallery = Gallery::new(vec![stale.clone()]);

    DeleteOrchestrator::new(&backend, &backend)
        .delete(&mut stale_gallery, &stale)
        .await
        .unwrap();

    assert!(stale_gallery.is_empty());
    assert!(!backend.media.contains(&cat.cloudinary_public_id));
    // The real row is untouched
    assert_eq!(backend.store.image_count(), 1);
    assert!(gallery.remove(&cat.id).is_some());
}

#[tokio::test]
async fn test_failed_remote_delete_keeps_row_and_entry() {
    let backend = backend();
    let mut gallery = uploaded(&backend, &["cat"]).await;
    let cat = gallery.images()[0].clone();
    backend
        .media
        .fail_destroy(MediaError::Rejected("Invalid Signature".to_string()));

    let err = DeleteOrchestrator::new(&backend, &backend)
        .delete(&mut gallery, &cat)
        .await
        .unwrap_err();

    assert!(matches!(err, GalleryError::Upstream(_)));
    assert_eq!(Notice::failure(Action::Delete, &err).title, "Delete failed");
    assert!(backend.media.contains(&cat.cloudinary_public_id));
    assert_eq!(backend.store.image_count(), 1);
    assert!(gallery.contains(&cat.id));
}

// =============================================================================
// Over HTTP
// =============================================================================

#[tokio::test]
async fn test_client_flows_against_served_router() {
    let store = MemoryStore::new().with_user("alice@example.com", "pw");
    let media = FakeMediaHost::new();
    let base_url = spawn_server(store.clone(), media.clone()).await;
    let client = GalleryClient::new(&base_url).unwrap();

    let principal = client
        .login(&LoginForm::new("alice@example.com", "pw"))
        .await
        .unwrap();
    assert_eq!(principal.email.as_deref(), Some("alice@example.com"));
    assert!(client.auth_state().is_signed_in());

    let uploads = UploadOrchestrator::new(&client, &media, &client);
    let form = UploadForm::new("Cat", "On a mat").with_file(png("cat.png"));
    let record = uploads.upload(&form).await.unwrap();
    assert_eq!(store.image_count(), 1);
    assert!(media.contains(&record.cloudinary_public_id));

    let mut gallery = client.load_gallery().await.unwrap();
    assert_eq!(gallery.len(), 1);
    assert_eq!(gallery.images()[0].id, record.id);

    DeleteOrchestrator::new(&client, &client)
        .delete(&mut gallery, &record)
        .await
        .unwrap();
    assert_eq!(store.image_count(), 0);
    assert_eq!(media.object_count(), 0);
    assert!(gallery.is_empty());

    // Both targets are gone now
    assert_eq!(
        client.delete_remote(&record.cloudinary_public_id).await.unwrap(),
        Removal::AlreadyAbsent
    );
    assert_eq!(
        client.delete_record(&record.id).await.unwrap(),
        Removal::AlreadyAbsent
    );

    client.logout().await.unwrap();
    assert!(!client.auth_state().is_signed_in());
    assert!(matches!(
        client.load_gallery().await,
        Err(GalleryError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn test_client_reports_object_already_absent_at_host() {
    let store = MemoryStore::new().with_user("alice@example.com", "pw");
    let media = FakeMediaHost::new();
    let base_url = spawn_server(store.clone(), media.clone()).await;
    let client = GalleryClient::new(&base_url).unwrap();
    client
        .login(&LoginForm::new("alice@example.com", "pw"))
        .await
        .unwrap();

    let record = UploadOrchestrator::new(&client, &media, &client)
        .upload(&UploadForm::new("Cat", "").with_file(png("cat.png")))
        .await
        .unwrap();
    media.destroy(&record.cloudinary_public_id).await.unwrap();

    assert_eq!(
        client.delete_remote(&record.cloudinary_public_id).await.unwrap(),
        Removal::AlreadyAbsent
    );
    // The row is still there and is removed normally
    assert_eq!(
        client.delete_record(&record.id).await.unwrap(),
        Removal::Removed
    );
    assert_eq!(store.image_count(), 0);
}
