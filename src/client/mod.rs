//! Client-side flows against a running gallery server.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  UploadOrchestrator          DeleteOrchestrator   AuthState  │
//! └──────┬──────────────┬──────────────┬─────────────────┬───────┘
//!        │              │              │                 │
//!        ▼              ▼              ▼                 ▼
//!  SignatureSource  MediaUploader  RemoteMedia     (publish on
//!  ImageRecords     (Cloudinary)   ImageRecords     login/logout)
//!        │                             │
//!        └──────────── GalleryClient ──┘
//!                   (reqwest + cookie jar)
//! ```
//!
//! The orchestrators only see the seam traits, so they run the same against
//! the real server and against in-memory fakes.

mod auth_state;
mod delete;
mod notice;
mod upload;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;
use validator::Validate;

use crate::error::GalleryError;
use crate::forms::{LoginForm, RegisterForm};
use crate::server::{MediaDeleteResponse, RegisterResponse, SessionResponse};
use crate::signature::UploadAuthorization;
use crate::store::{ImageRecord, NewImage, Principal};

pub use auth_state::{AuthState, AuthSubscription};
pub use delete::{DeleteOrchestrator, Gallery};
pub use notice::{Action, Notice, GENERIC_FAILURE};
pub use upload::{UploadForm, UploadOrchestrator, UploadStage};

/// Default timeout for calls to the gallery server.
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Seams
// =============================================================================

/// Outcome of a delete that tolerates an already-missing target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    AlreadyAbsent,
}

/// Source of upload authorizations.
#[async_trait]
pub trait SignatureSource: Send + Sync {
    async fn request_signature(&self) -> Result<UploadAuthorization, GalleryError>;
}

/// The caller's image rows.
#[async_trait]
pub trait ImageRecords: Send + Sync {
    async fn insert_record(&self, image: &NewImage) -> Result<ImageRecord, GalleryError>;

    async fn delete_record(&self, id: &str) -> Result<Removal, GalleryError>;
}

/// Remote media deletes, proxied through the server.
#[async_trait]
pub trait RemoteMedia: Send + Sync {
    async fn delete_remote(&self, public_id: &str) -> Result<Removal, GalleryError>;
}

// =============================================================================
// GalleryClient
// =============================================================================

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for the gallery server's JSON API.
///
/// Holds a cookie jar, so the session cookie set by `login` rides along on
/// every later call.
pub struct GalleryClient {
    client: Client,
    base_url: Url,
    auth: AuthState,
}

impl GalleryClient {
    /// Create a client for the server at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, GalleryError> {
        Self::with_timeout(base_url, DEFAULT_CLIENT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, GalleryError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| GalleryError::Internal(format!("Invalid server URL: {}", e)))?;
        let client = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|e| GalleryError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            auth: AuthState::new(),
        })
    }

    /// Authentication state observers can subscribe to.
    pub fn auth_state(&self) -> &AuthState {
        &self.auth
    }

    fn url(&self, path: &str) -> Result<Url, GalleryError> {
        self.base_url
            .join(path)
            .map_err(|e| GalleryError::Internal(format!("Invalid request path {}: {}", path, e)))
    }

    /// Create an account.
    ///
    /// The form is validated first; a mismatch never reaches the network.
    /// Publishes the new principal when the server started a session.
    pub async fn register(&self, form: &RegisterForm) -> Result<RegisterResponse, GalleryError> {
        form.validate()?;

        let response = self
            .client
            .post(self.url("/api/auth/register")?)
            .json(form)
            .send()
            .await
            .map_err(connection_error)?;
        let body: RegisterResponse = decode(check(response).await?).await?;

        if body.session_started {
            self.auth.publish(Some(body.user.clone()));
        }
        Ok(body)
    }

    /// Log in and publish the principal.
    pub async fn login(&self, form: &LoginForm) -> Result<Principal, GalleryError> {
        form.validate()?;

        let response = self
            .client
            .post(self.url("/api/auth/login")?)
            .json(form)
            .send()
            .await
            .map_err(connection_error)?;
        let body: SessionResponse = decode(check(response).await?).await?;

        self.auth.publish(Some(body.user.clone()));
        Ok(body.user)
    }

    /// Log out. Subscribers see `None` even if the server call fails.
    pub async fn logout(&self) -> Result<(), GalleryError> {
        let result = self.end_session().await;
        self.auth.publish(None);
        result
    }

    async fn end_session(&self) -> Result<(), GalleryError> {
        let response = self
            .client
            .post(self.url("/api/auth/logout")?)
            .send()
            .await
            .map_err(connection_error)?;
        check(response).await?;
        Ok(())
    }

    /// Ask the server who is signed in and publish the answer.
    pub async fn refresh_session(&self) -> Result<Option<Principal>, GalleryError> {
        let response = self
            .client
            .get(self.url("/api/session")?)
            .send()
            .await
            .map_err(connection_error)?;

        let principal = if response.status() == StatusCode::UNAUTHORIZED {
            None
        } else {
            let body: SessionResponse = decode(check(response).await?).await?;
            Some(body.user)
        };

        self.auth.publish(principal.clone());
        Ok(principal)
    }

    /// Fetch the caller's images.
    pub async fn load_gallery(&self) -> Result<Gallery, GalleryError> {
        let response = self
            .client
            .get(self.url("/api/images")?)
            .send()
            .await
            .map_err(connection_error)?;
        let images: Vec<ImageRecord> = decode(check(response).await?).await?;
        Ok(Gallery::new(images))
    }
}

#[async_trait]
impl SignatureSource for GalleryClient {
    async fn request_signature(&self) -> Result<UploadAuthorization, GalleryError> {
        let response = self
            .client
            .get(self.url("/api/cloudinary/signature")?)
            .send()
            .await
            .map_err(connection_error)?;
        decode(check(response).await?).await
    }
}

#[async_trait]
impl ImageRecords for GalleryClient {
    async fn insert_record(&self, image: &NewImage) -> Result<ImageRecord, GalleryError> {
        let response = self
            .client
            .post(self.url("/api/images")?)
            .json(image)
            .send()
            .await
            .map_err(connection_error)?;
        decode(check(response).await?).await
    }

    async fn delete_record(&self, id: &str) -> Result<Removal, GalleryError> {
        let path = format!("/api/images/{}", urlencoding::encode(id));
        let response = self
            .client
            .delete(self.url(&path)?)
            .send()
            .await
            .map_err(connection_error)?;
        match check(response).await {
            Ok(_) => Ok(Removal::Removed),
            Err(GalleryError::NotFound(_)) => Ok(Removal::AlreadyAbsent),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl RemoteMedia for GalleryClient {
    async fn delete_remote(&self, public_id: &str) -> Result<Removal, GalleryError> {
        let mut url = self.url("/api/cloudinary/delete")?;
        url.query_pairs_mut().append_pair("publicId", public_id);

        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(connection_error)?;
        // 404: none of the caller's images references the object any more
        let response = match check(response).await {
            Ok(response) => response,
            Err(GalleryError::NotFound(_)) => return Ok(Removal::AlreadyAbsent),
            Err(e) => return Err(e),
        };

        let body: MediaDeleteResponse = decode(response).await?;
        Ok(if body.already_absent {
            Removal::AlreadyAbsent
        } else {
            Removal::Removed
        })
    }
}

fn connection_error(err: reqwest::Error) -> GalleryError {
    GalleryError::Upstream(format!("Request failed: {}", err))
}

/// Pass successful responses through; turn `{ "error": ... }` bodies into
/// the matching error kind.
async fn check(response: Response) -> Result<Response, GalleryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .map(|body| body.error)
        .unwrap_or_default();
    debug!(status = status.as_u16(), error = %message, "Server rejected request");

    Err(classify_status(status, message))
}

fn classify_status(status: StatusCode, message: String) -> GalleryError {
    match status {
        StatusCode::UNAUTHORIZED => GalleryError::Unauthorized(message),
        StatusCode::BAD_REQUEST => GalleryError::Validation(message),
        StatusCode::NOT_FOUND => GalleryError::NotFound(message),
        _ => GalleryError::Upstream(message),
    }
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, GalleryError> {
    response
        .json::<T>()
        .await
        .map_err(|e| GalleryError::Upstream(format!("Unexpected server response: {}", e)))
}
