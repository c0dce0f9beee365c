//! Image row endpoint tests.
//!
//! Tests verify:
//! - Rows are created, listed newest first and scoped to their owner
//! - Missing metadata is rejected before reaching the store
//! - Bodies missing required fields get a 400 `{ "error": ... }`
//! - Deleting an absent row answers 404

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use cloud_gallery::store::ImageRecord;

use super::test_utils::{session_cookie, test_router, FakeMediaHost, MemoryStore};

fn create(cookie: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/images")
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn list(cookie: &str) -> Request<Body> {
    Request::builder()
        .uri("/api/images")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

fn delete(cookie: &str, id: &str) -> Request<Body> {
    Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/images/{}", id))
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_create_image_record() {
    let store = MemoryStore::new().with_user("alice@example.com", "pw");
    let cookie = session_cookie(&store.session_for("alice@example.com"));
    let router = test_router(store.clone(), FakeMediaHost::new());

    let response = router
        .oneshot(create(
            &cookie,
            serde_json::json!({
                "title": "  Sunset ",
                "description": "   ",
                "image_url": "https://res.example.com/sunset.png",
                "cloudinary_public_id": "gallery/sunset"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let record: ImageRecord = body_json(response).await;
    assert_eq!(record.title, "Sunset");
    assert_eq!(record.description, None);
    assert_eq!(record.user_id.as_deref(), Some("user-1"));
    assert_eq!(store.image_count(), 1);
}

#[tokio::test]
async fn test_create_image_requires_title() {
    let store = MemoryStore::new().with_user("alice@example.com", "pw");
    let cookie = session_cookie(&store.session_for("alice@example.com"));
    let router = test_router(store.clone(), FakeMediaHost::new());

    let response = router
        .oneshot(create(
            &cookie,
            serde_json::json!({
                "title": "   ",
                "image_url": "https://res.example.com/sunset.png",
                "cloudinary_public_id": "gallery/sunset"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(store.image_count(), 0);
}

#[tokio::test]
async fn test_create_image_without_title_field_is_400() {
    let store = MemoryStore::new().with_user("alice@example.com", "pw");
    let cookie = session_cookie(&store.session_for("alice@example.com"));
    let router = test_router(store.clone(), FakeMediaHost::new());

    let response = router
        .oneshot(create(
            &cookie,
            serde_json::json!({
                "image_url": "https://res.example.com/sunset.png",
                "cloudinary_public_id": "gallery/sunset"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json: serde_json::Value = body_json(response).await;
    assert_eq!(json["error"], "Title is required");
    assert_eq!(store.image_count(), 0);
}

#[tokio::test]
async fn test_create_image_malformed_body_is_400() {
    let store = MemoryStore::new().with_user("alice@example.com", "pw");
    let cookie = session_cookie(&store.session_for("alice@example.com"));
    let router = test_router(store.clone(), FakeMediaHost::new());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/images")
        .header(header::COOKIE, &cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"title\": 42"))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json: serde_json::Value = body_json(response).await;
    assert!(json["error"].as_str().is_some_and(|m| !m.is_empty()));
    assert_eq!(store.image_count(), 0);
}

#[tokio::test]
async fn test_create_image_store_failure_is_500() {
    let store = MemoryStore::new().with_user("alice@example.com", "pw");
    let cookie = session_cookie(&store.session_for("alice@example.com"));
    store.fail_inserts();
    let router = test_router(store.clone(), FakeMediaHost::new());

    let response = router
        .oneshot(create(
            &cookie,
            serde_json::json!({
                "title": "Sunset",
                "image_url": "https://res.example.com/sunset.png",
                "cloudinary_public_id": "gallery/sunset"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(store.image_count(), 0);
}

#[tokio::test]
async fn test_list_is_scoped_and_newest_first() {
    let store = MemoryStore::new()
        .with_user("alice@example.com", "pw")
        .with_user("bob@example.com", "pw");
    let alice = store.session_for("alice@example.com");
    let bob = store.session_for("bob@example.com");
    store.seed_image(&alice, "Old", "gallery/old", 60);
    store.seed_image(&alice, "New", "gallery/new", 1);
    store.seed_image(&bob, "Bob's", "gallery/bob", 30);
    let router = test_router(store, FakeMediaHost::new());

    let response = router.oneshot(list(&session_cookie(&alice))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let images: Vec<ImageRecord> = body_json(response).await;
    let titles: Vec<_> = images.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["New", "Old"]);
}

#[tokio::test]
async fn test_list_requires_session() {
    let router = test_router(MemoryStore::new(), FakeMediaHost::new());

    let request = Request::builder()
        .uri("/api/images")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_delete_row_and_absent_row() {
    let store = MemoryStore::new().with_user("alice@example.com", "pw");
    let token = store.session_for("alice@example.com");
    let record = store.seed_image(&token, "Sunset", "gallery/sunset", 5);
    let cookie = session_cookie(&token);
    let router = test_router(store.clone(), FakeMediaHost::new());

    let response = router
        .clone()
        .oneshot(delete(&cookie, &record.id))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(store.image_count(), 0);

    // Second delete of the same row
    let response = router.oneshot(delete(&cookie, &record.id)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json: serde_json::Value = body_json(response).await;
    assert_eq!(json["error"], "Image not found");
}

#[tokio::test]
async fn test_cannot_delete_another_users_row() {
    let store = MemoryStore::new()
        .with_user("alice@example.com", "pw")
        .with_user("bob@example.com", "pw");
    let alice = store.session_for("alice@example.com");
    let bob = store.session_for("bob@example.com");
    let record = store.seed_image(&alice, "Mine", "gallery/mine", 5);
    let router = test_router(store.clone(), FakeMediaHost::new());

    let response = router
        .oneshot(delete(&session_cookie(&bob), &record.id))
        .await
        .unwrap();
    // Invisible rows look absent
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(store.image_count(), 1);
}
