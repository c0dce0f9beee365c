//! Supabase-backed session store.
//!
//! Authentication goes through the GoTrue API (`/auth/v1/*`) and image rows
//! through PostgREST (`/rest/v1/images`). Every request carries the project's
//! anon key in the `apikey` header; row requests additionally carry the
//! caller's access token so row-level security scopes them to their owner.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::error::StoreError;

use super::{
    Credentials, ImageRecord, NewImage, Principal, Registration, Session, SessionStore,
};

/// Table holding image rows.
const IMAGES_TABLE: &str = "images";

/// Default timeout for store requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for a Supabase project.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyzcompany.supabase.co`
    pub url: String,

    /// Public anon key
    pub anon_key: String,

    /// Per-request timeout
    pub timeout: Duration,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// [`SessionStore`] talking to a Supabase project over HTTP.
#[derive(Clone)]
pub struct SupabaseStore {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseStore {
    pub fn new(config: SupabaseConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key,
        })
    }

    /// Project base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn rest_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, IMAGES_TABLE)
    }

    fn anon(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    fn authed(&self, builder: RequestBuilder, access_token: &str) -> RequestBuilder {
        builder
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
    }
}

// =============================================================================
// Wire Types
// =============================================================================

/// Body returned by signup and token grants.
///
/// Signup with email confirmation enabled returns the bare user object
/// instead of a session, hence the flattened optional fields.
#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(default)]
    access_token: Option<String>,

    #[serde(default)]
    user: Option<Principal>,

    #[serde(default)]
    id: Option<String>,

    #[serde(default)]
    email: Option<String>,
}

impl AuthResponse {
    fn principal(&self) -> Option<Principal> {
        self.user.clone().or_else(|| {
            self.id.clone().map(|id| Principal {
                id,
                email: self.email.clone(),
            })
        })
    }
}

/// The shapes GoTrue and PostgREST use for error bodies.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,

    #[serde(default)]
    msg: Option<String>,

    #[serde(default)]
    error_description: Option<String>,

    #[serde(default)]
    error: Option<String>,
}

impl ApiErrorBody {
    fn into_message(self, status: StatusCode) -> String {
        [self.message, self.msg, self.error_description, self.error]
            .into_iter()
            .flatten()
            .find(|m| !m.is_empty())
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
    }
}

// =============================================================================
// Response Handling
// =============================================================================

async fn send(builder: RequestBuilder) -> Result<Response, StoreError> {
    builder
        .send()
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))
}

/// Turn a non-success response into a `StoreError`.
async fn rejection(response: Response) -> StoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .unwrap_or_default()
        .into_message(status);

    classify_rejection(status, message)
}

fn classify_rejection(status: StatusCode, message: String) -> StoreError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Unauthenticated,
        _ => StoreError::Rejected {
            status: status.as_u16(),
            message,
        },
    }
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, StoreError> {
    response
        .json::<T>()
        .await
        .map_err(|e| StoreError::Decode(e.to_string()))
}

// =============================================================================
// SessionStore
// =============================================================================

#[async_trait]
impl SessionStore for SupabaseStore {
    async fn sign_up(&self, credentials: &Credentials) -> Result<Registration, StoreError> {
        let response = send(
            self.anon(self.client.post(self.auth_url("signup")))
                .json(credentials),
        )
        .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let body: AuthResponse = decode(response).await?;
        let principal = body
            .principal()
            .ok_or_else(|| StoreError::Decode("signup response has no user".to_string()))?;

        Ok(match body.access_token {
            Some(access_token) => Registration::Active(Session {
                access_token,
                principal,
            }),
            None => {
                debug!(user_id = %principal.id, "Signup pending email confirmation");
                Registration::PendingConfirmation(principal)
            }
        })
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, StoreError> {
        let response = send(
            self.anon(
                self.client
                    .post(self.auth_url("token"))
                    .query(&[("grant_type", "password")]),
            )
            .json(credentials),
        )
        .await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .unwrap_or_default()
                .into_message(status);
            return Err(StoreError::InvalidCredentials(message));
        }
        if !status.is_success() {
            return Err(rejection(response).await);
        }

        let body: AuthResponse = decode(response).await?;
        let principal = body.principal();
        match (body.access_token, principal) {
            (Some(access_token), Some(principal)) => Ok(Session {
                access_token,
                principal,
            }),
            _ => Err(StoreError::Decode(
                "token response has no session".to_string(),
            )),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), StoreError> {
        let response = send(self.authed(self.client.post(self.auth_url("logout")), access_token))
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(rejection(response).await)
        }
    }

    async fn principal(&self, access_token: &str) -> Result<Principal, StoreError> {
        let response =
            send(self.authed(self.client.get(self.auth_url("user")), access_token)).await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        decode(response).await
    }

    async fn insert_image(
        &self,
        access_token: &str,
        image: &NewImage,
    ) -> Result<ImageRecord, StoreError> {
        let response = send(
            self.authed(self.client.post(self.rest_url()), access_token)
                .header("Prefer", "return=representation")
                .json(image),
        )
        .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let mut rows: Vec<ImageRecord> = decode(response).await?;
        rows.pop()
            .ok_or_else(|| StoreError::Decode("insert returned no rows".to_string()))
    }

    async fn list_images(&self, access_token: &str) -> Result<Vec<ImageRecord>, StoreError> {
        let response = send(
            self.authed(self.client.get(self.rest_url()), access_token)
                .query(&[("select", "*"), ("order", "created_at.desc")]),
        )
        .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        decode(response).await
    }

    async fn find_image_by_public_id(
        &self,
        access_token: &str,
        public_id: &str,
    ) -> Result<Option<ImageRecord>, StoreError> {
        let filter = format!("eq.{}", public_id);
        let response = send(
            self.authed(self.client.get(self.rest_url()), access_token).query(&[
                ("select", "*"),
                ("cloudinary_public_id", filter.as_str()),
                ("limit", "1"),
            ]),
        )
        .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let mut rows: Vec<ImageRecord> = decode(response).await?;
        Ok(rows.pop())
    }

    async fn delete_image(&self, access_token: &str, id: &str) -> Result<(), StoreError> {
        let filter = format!("eq.{}", id);
        let response = send(
            self.authed(self.client.delete(self.rest_url()), access_token)
                .query(&[("id", filter.as_str())])
                .header("Prefer", "return=representation"),
        )
        .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        // Row-level security hides other users' rows, so "not mine" and
        // "already gone" both come back as an empty representation
        let rows: Vec<serde_json::Value> = decode(response).await?;
        if rows.is_empty() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
