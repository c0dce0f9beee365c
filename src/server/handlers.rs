//! HTTP request handlers for the gallery API.
//!
//! # Endpoints
//!
//! - `GET /api/cloudinary/signature` - Mint an upload authorization
//! - `DELETE /api/cloudinary/delete?publicId=...` - Destroy a media object
//! - `POST /api/auth/register` / `login` / `logout` - Session lifecycle
//! - `GET /api/session` - Current principal
//! - `GET|POST /api/images`, `DELETE /api/images/{id}` - Image rows
//! - `GET /health` - Health check

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use validator::Validate;

use crate::error::{GalleryError, MediaError, StoreError};
use crate::forms::{LoginForm, RegisterForm};
use crate::media::MediaHost;
use crate::signature::{UploadAuthorization, UploadSigner};
use crate::store::{ImageRecord, NewImage, Principal, Registration, SessionStore};

use super::session::{CurrentSession, MaybeSession, SessionCookies};

// =============================================================================
// Application State
// =============================================================================

/// Public settings the upload view hands to the browser.
#[derive(Debug, Clone, Default)]
pub struct DirectUploadConfig {
    /// Full direct-upload URL of the media host
    pub upload_url: String,

    /// Public API key sent with each upload
    pub api_key: String,
}

/// Shared application state.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<S: SessionStore, M: MediaHost> {
    /// Authentication and image rows
    pub store: Arc<S>,

    /// Media host for admin deletes
    pub media: Arc<M>,

    /// Signs upload authorizations with the media host's API secret
    pub signer: Arc<UploadSigner>,

    /// Session cookie codec
    pub cookies: SessionCookies,

    /// Settings rendered into the upload view
    pub direct_upload: DirectUploadConfig,
}

impl<S: SessionStore, M: MediaHost> AppState<S, M> {
    pub fn new(store: S, media: M, signer: UploadSigner, cookies: SessionCookies) -> Self {
        Self {
            store: Arc::new(store),
            media: Arc::new(media),
            signer: Arc::new(signer),
            cookies,
            direct_upload: DirectUploadConfig::default(),
        }
    }

    pub fn with_direct_upload(mut self, direct_upload: DirectUploadConfig) -> Self {
        self.direct_upload = direct_upload;
        self
    }
}

impl<S: SessionStore, M: MediaHost> Clone for AppState<S, M> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            media: Arc::clone(&self.media),
            signer: Arc::clone(&self.signer),
            cookies: self.cookies.clone(),
            direct_upload: self.direct_upload.clone(),
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// JSON body extractor whose rejections use the `{ "error": ... }` shape.
///
/// Missing fields mostly deserialize to empty values and are then reported by
/// validation; anything serde still refuses becomes a 400.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(GalleryError))]
pub struct JsonBody<T>(pub T);

impl From<JsonRejection> for GalleryError {
    fn from(rejection: JsonRejection) -> Self {
        GalleryError::Validation(rejection.body_text())
    }
}

/// Query parameters for the media delete endpoint.
#[derive(Debug, Deserialize)]
pub struct DeleteMediaParams {
    /// Public id of the object to destroy
    #[serde(rename = "publicId", default)]
    pub public_id: Option<String>,
}

/// Body for creating an image row.
#[derive(Debug, Deserialize)]
pub struct CreateImageRequest {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub image_url: String,

    #[serde(default)]
    pub cloudinary_public_id: String,
}

impl CreateImageRequest {
    /// Trim the title and drop an empty description.
    pub fn into_new_image(self) -> NewImage {
        NewImage {
            title: self.title.trim().to_string(),
            description: self
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            image_url: self.image_url,
            cloudinary_public_id: self.cloudinary_public_id,
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error body: `{ "error": "..." }`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            status: None,
        }
    }

    pub fn with_status(error: impl Into<String>, status: StatusCode) -> Self {
        Self {
            error: error.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Body of a successful media delete.
#[derive(Debug, Serialize, Deserialize)]
pub struct MediaDeleteResponse {
    pub success: bool,

    /// True when the host no longer had the object
    #[serde(default)]
    pub already_absent: bool,
}

/// Body of session-related responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user: Principal,
}

/// Body of the registration response.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user: Principal,

    /// False when the account awaits email confirmation
    pub session_started: bool,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert GalleryError to HTTP response.
///
/// 401, 400 and 404 carry their message; everything else becomes a generic 500
/// with the real cause logged.
impl IntoResponse for GalleryError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            GalleryError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message.clone()),
            GalleryError::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            GalleryError::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            GalleryError::Upstream(_) | GalleryError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
            ),
        };

        if status.is_server_error() {
            error!(
                error_type = self.kind(),
                status = status.as_u16(),
                "Server error: {}",
                self
            );
        } else {
            debug!(
                error_type = self.kind(),
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

fn with_cookie(mut response: Response, cookie: Option<header::HeaderValue>) -> Response {
    if let Some(cookie) = cookie {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}

// =============================================================================
// Upload Handshake
// =============================================================================

/// Mint an upload authorization.
///
/// # Endpoint
///
/// `GET /api/cloudinary/signature`
///
/// # Response
///
/// - `200 OK`: `{ "signature": "...", "timestamp": 1735689600 }`
/// - `401 Unauthorized`: no valid session
/// - `500 Internal Server Error`: signing secret missing
pub async fn signature_handler<S, M>(
    State(state): State<AppState<S, M>>,
    session: CurrentSession,
) -> Result<Json<UploadAuthorization>, GalleryError>
where
    S: SessionStore + 'static,
    M: MediaHost + 'static,
{
    let authorization = state.signer.authorize()?;
    debug!(
        user_id = %session.principal.id,
        timestamp = authorization.timestamp,
        "Issued upload authorization"
    );
    Ok(Json(authorization))
}

/// Destroy a media object the caller owns.
///
/// Ownership means the caller can see an image row referencing the object;
/// the host is never contacted otherwise.
///
/// # Endpoint
///
/// `DELETE /api/cloudinary/delete?publicId={public_id}`
///
/// # Response
///
/// - `200 OK`: `{ "success": true, "already_absent": false }`
///   (`already_absent` is true when the host no longer had the object)
/// - `400 Bad Request`: `publicId` missing
/// - `401 Unauthorized`: no valid session
/// - `404 Not Found`: no image of the caller references `publicId`
/// - `500 Internal Server Error`: media host or store failure
pub async fn delete_media_handler<S, M>(
    State(state): State<AppState<S, M>>,
    session: CurrentSession,
    Query(params): Query<DeleteMediaParams>,
) -> Result<Json<MediaDeleteResponse>, GalleryError>
where
    S: SessionStore + 'static,
    M: MediaHost + 'static,
{
    let public_id = params
        .public_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| GalleryError::Validation("Public ID is required".to_string()))?;

    let owned = state
        .store
        .find_image_by_public_id(&session.access_token, &public_id)
        .await?;
    if owned.is_none() {
        warn!(
            user_id = %session.principal.id,
            public_id = %public_id,
            "Refused media delete: no image of the caller references it"
        );
        return Err(GalleryError::NotFound("Image not found".to_string()));
    }

    let already_absent = match state.media.destroy(&public_id).await {
        Ok(()) => {
            info!(user_id = %session.principal.id, public_id = %public_id, "Deleted media object");
            false
        }
        Err(MediaError::NotFound(_)) => {
            debug!(public_id = %public_id, "Media object already absent");
            true
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Json(MediaDeleteResponse {
        success: true,
        already_absent,
    }))
}

// =============================================================================
// Session Lifecycle
// =============================================================================

/// Create an account.
///
/// `POST /api/auth/register` with `{ email, password, confirm_password }`.
/// Sets the session cookie when the store starts a session right away.
pub async fn register_handler<S, M>(
    State(state): State<AppState<S, M>>,
    JsonBody(form): JsonBody<RegisterForm>,
) -> Result<Response, GalleryError>
where
    S: SessionStore + 'static,
    M: MediaHost + 'static,
{
    form.validate()?;

    let registration = state.store.sign_up(&form.credentials()).await?;
    let (user, cookie) = match registration {
        Registration::Active(session) => {
            let cookie = state.cookies.set_cookie(&session.access_token);
            (session.principal, cookie)
        }
        Registration::PendingConfirmation(principal) => (principal, None),
    };
    let session_started = cookie.is_some();
    info!(user_id = %user.id, session_started, "Registered account");

    let body = RegisterResponse {
        user,
        session_started,
    };
    Ok(with_cookie(
        (StatusCode::CREATED, Json(body)).into_response(),
        cookie,
    ))
}

/// Log in and set the session cookie.
///
/// `POST /api/auth/login` with `{ email, password }`.
pub async fn login_handler<S, M>(
    State(state): State<AppState<S, M>>,
    JsonBody(form): JsonBody<LoginForm>,
) -> Result<Response, GalleryError>
where
    S: SessionStore + 'static,
    M: MediaHost + 'static,
{
    form.validate()?;

    let session = state.store.sign_in(&form.credentials()).await?;
    let cookie = state.cookies.set_cookie(&session.access_token);
    info!(user_id = %session.principal.id, "Logged in");

    Ok(with_cookie(
        Json(SessionResponse {
            user: session.principal,
        })
        .into_response(),
        cookie,
    ))
}

/// Log out and clear the session cookie.
///
/// `POST /api/auth/logout`. Always succeeds; revoking the token at the
/// store is best effort.
pub async fn logout_handler<S, M>(
    State(state): State<AppState<S, M>>,
    MaybeSession(session): MaybeSession,
) -> Response
where
    S: SessionStore + 'static,
    M: MediaHost + 'static,
{
    if let Some(session) = session {
        if let Err(e) = state.store.sign_out(&session.access_token).await {
            warn!(user_id = %session.principal.id, error = %e, "Store sign-out failed");
        }
    }

    with_cookie(
        StatusCode::NO_CONTENT.into_response(),
        state.cookies.clear_cookie(),
    )
}

/// `GET /api/session`: the current principal, or 401.
pub async fn session_handler(session: CurrentSession) -> Json<SessionResponse> {
    Json(SessionResponse {
        user: session.principal,
    })
}

// =============================================================================
// Image Rows
// =============================================================================

/// `GET /api/images`: the caller's images, newest first.
pub async fn list_images_handler<S, M>(
    State(state): State<AppState<S, M>>,
    session: CurrentSession,
) -> Result<Json<Vec<ImageRecord>>, GalleryError>
where
    S: SessionStore + 'static,
    M: MediaHost + 'static,
{
    let images = state.store.list_images(&session.access_token).await?;
    Ok(Json(images))
}

/// `POST /api/images`: persist metadata for an uploaded object.
///
/// A failure here leaves the already-uploaded object orphaned at the media
/// host; it is logged with its public id and not cleaned up.
pub async fn create_image_handler<S, M>(
    State(state): State<AppState<S, M>>,
    session: CurrentSession,
    JsonBody(request): JsonBody<CreateImageRequest>,
) -> Result<(StatusCode, Json<ImageRecord>), GalleryError>
where
    S: SessionStore + 'static,
    M: MediaHost + 'static,
{
    let image = request.into_new_image();
    image.validate()?;

    match state
        .store
        .insert_image(&session.access_token, &image)
        .await
    {
        Ok(record) => {
            info!(
                user_id = %session.principal.id,
                image_id = %record.id,
                public_id = %record.cloudinary_public_id,
                "Stored image record"
            );
            Ok((StatusCode::CREATED, Json(record)))
        }
        Err(e) => {
            warn!(
                public_id = %image.cloudinary_public_id,
                error = %e,
                "Image record insert failed, media object is orphaned"
            );
            Err(e.into())
        }
    }
}

/// `DELETE /api/images/{id}`: remove one of the caller's rows.
///
/// 204 when a row was removed, 404 when the caller has no row with that id
/// (already deleted, or never theirs).
pub async fn delete_image_handler<S, M>(
    State(state): State<AppState<S, M>>,
    session: CurrentSession,
    Path(id): Path<String>,
) -> Result<StatusCode, GalleryError>
where
    S: SessionStore + 'static,
    M: MediaHost + 'static,
{
    match state.store.delete_image(&session.access_token, &id).await {
        Ok(()) => {
            info!(user_id = %session.principal.id, image_id = %id, "Deleted image record");
            Ok(StatusCode::NO_CONTENT)
        }
        Err(e @ StoreError::NotFound(_)) => {
            debug!(image_id = %id, "Image record already absent");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
