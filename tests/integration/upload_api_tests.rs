//! Upload handshake and media delete endpoint tests.
//!
//! Tests verify:
//! - Signatures are only issued to signed-in callers
//! - Issued signatures verify with the media host's secret
//! - The media delete endpoint requires a session and a public id
//! - Only objects referenced by one of the caller's images are destroyed
//! - Already-absent objects count as deleted

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use cloud_gallery::error::MediaError;
use cloud_gallery::signature::{current_timestamp, UploadAuthorization, UploadSigner};

use super::test_utils::{
    session_cookie, test_router, FakeMediaHost, MemoryStore, API_SECRET,
};

fn signed_in() -> (MemoryStore, String) {
    signed_in_owning(&[])
}

/// Alice, signed in, with one image row per public id.
fn signed_in_owning(public_ids: &[&str]) -> (MemoryStore, String) {
    let store = MemoryStore::new().with_user("alice@example.com", "pw");
    let token = store.session_for("alice@example.com");
    for (minutes_ago, public_id) in public_ids.iter().enumerate() {
        store.seed_image(&token, public_id, public_id, minutes_ago as i64);
    }
    (store, session_cookie(&token))
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

fn delete_media(public_id: Option<&str>, cookie: Option<&str>) -> Request<Body> {
    let uri = match public_id {
        Some(id) => format!("/api/cloudinary/delete?publicId={}", urlencoding::encode(id)),
        None => "/api/cloudinary/delete".to_string(),
    };
    let mut builder = Request::builder().method(Method::DELETE).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

// =============================================================================
// Signature Endpoint
// =============================================================================

#[tokio::test]
async fn test_signature_requires_session() {
    let router = test_router(MemoryStore::new(), FakeMediaHost::new());

    let request = Request::builder()
        .uri("/api/cloudinary/signature")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Unauthorized");
}

#[tokio::test]
async fn test_signature_verifies_with_api_secret() {
    let (store, cookie) = signed_in();
    let router = test_router(store, FakeMediaHost::new());

    let request = Request::builder()
        .uri("/api/cloudinary/signature")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();

    let before = current_timestamp();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let authorization: UploadAuthorization = serde_json::from_value(json).unwrap();
    assert!(authorization.timestamp >= before);
    assert!(authorization.timestamp <= current_timestamp());
    assert!(UploadSigner::new(API_SECRET).verify(&authorization).is_ok());
    assert!(UploadSigner::new("other-secret").verify(&authorization).is_err());
}

#[tokio::test]
async fn test_signature_fails_without_secret() {
    let (store, cookie) = signed_in();
    let router = cloud_gallery::server::create_router(
        store,
        FakeMediaHost::new(),
        UploadSigner::new(""),
        cloud_gallery::server::RouterConfig::new(super::test_utils::COOKIE_SECRET)
            .with_tracing(false),
    );

    let request = Request::builder()
        .uri("/api/cloudinary/signature")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Internal Server Error");
}

// =============================================================================
// Media Delete Endpoint
// =============================================================================

#[tokio::test]
async fn test_delete_media_requires_session() {
    let media = FakeMediaHost::new().with_object("gallery/a");
    let router = test_router(MemoryStore::new(), media.clone());

    let response = router
        .oneshot(delete_media(Some("gallery/a"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(media.contains("gallery/a"));
    assert_eq!(media.destroy_calls(), 0);
}

#[tokio::test]
async fn test_delete_media_requires_public_id() {
    let (store, cookie) = signed_in();
    let media = FakeMediaHost::new();
    let router = test_router(store, media.clone());

    let response = router
        .clone()
        .oneshot(delete_media(None, Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Public ID is required");

    let response = router
        .oneshot(delete_media(Some(""), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(media.destroy_calls(), 0);
}

#[tokio::test]
async fn test_delete_media_removes_object() {
    let (store, cookie) = signed_in_owning(&["gallery/a", "gallery/b"]);
    let media = FakeMediaHost::new()
        .with_object("gallery/a")
        .with_object("gallery/b");
    let router = test_router(store, media.clone());

    let response = router
        .oneshot(delete_media(Some("gallery/a"), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["already_absent"], false);
    assert!(!media.contains("gallery/a"));
    assert!(media.contains("gallery/b"));
}

#[tokio::test]
async fn test_delete_media_already_absent_succeeds() {
    let (store, cookie) = signed_in_owning(&["gallery/missing"]);
    let media = FakeMediaHost::new();
    let router = test_router(store, media.clone());

    let response = router
        .oneshot(delete_media(Some("gallery/missing"), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["already_absent"], true);
    assert_eq!(media.destroy_calls(), 1);
}

#[tokio::test]
async fn test_delete_media_without_owned_image_is_404() {
    let (store, cookie) = signed_in();
    let media = FakeMediaHost::new().with_object("gallery/a");
    let router = test_router(store, media.clone());

    let response = router
        .oneshot(delete_media(Some("gallery/a"), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Image not found");
    assert!(media.contains("gallery/a"));
    assert_eq!(media.destroy_calls(), 0);
}

#[tokio::test]
async fn test_delete_media_of_another_user_is_refused() {
    let store = MemoryStore::new()
        .with_user("alice@example.com", "pw")
        .with_user("bob@example.com", "pw");
    let alice = store.session_for("alice@example.com");
    let bob = store.session_for("bob@example.com");
    store.seed_image(&alice, "Cat", "gallery/alice-cat", 0);
    let media = FakeMediaHost::new().with_object("gallery/alice-cat");
    let router = test_router(store.clone(), media.clone());

    let response = router
        .oneshot(delete_media(Some("gallery/alice-cat"), Some(&session_cookie(&bob))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(media.contains("gallery/alice-cat"));
    assert_eq!(media.destroy_calls(), 0);
    assert_eq!(store.image_count(), 1);
}

#[tokio::test]
async fn test_delete_media_host_failure_is_500() {
    let (store, cookie) = signed_in_owning(&["gallery/a"]);
    let media = FakeMediaHost::new().with_object("gallery/a");
    media.fail_destroy(MediaError::Connection("timed out".to_string()));
    let router = test_router(store, media.clone());

    let response = router
        .oneshot(delete_media(Some("gallery/a"), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Internal Server Error");
    assert!(media.contains("gallery/a"));
}
