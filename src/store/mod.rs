//! Session store abstraction.
//!
//! The session store is the external authentication and database service:
//! it checks credentials, issues access tokens, and keeps one row per
//! uploaded image. Rows are scoped to their creator by the store itself, so
//! every row call carries the caller's access token.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │     server / client flows    │
//! └──────────────┬───────────────┘
//!                │
//!                ▼
//! ┌──────────────────────────────┐
//! │     SessionStore trait       │
//! └──────────────┬───────────────┘
//!                │
//!                ▼
//! ┌──────────────────────────────┐
//! │  SupabaseStore (GoTrue auth  │
//! │  + PostgREST `images` table) │
//! └──────────────────────────────┘
//! ```

mod supabase;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::error::StoreError;

pub use supabase::{SupabaseConfig, SupabaseStore};

// =============================================================================
// Types
// =============================================================================

/// Email/password pair sent to the store.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Identity carried by a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,

    #[serde(default)]
    pub email: Option<String>,
}

/// A live session: the store's access token and who it belongs to.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub principal: Principal,
}

/// Outcome of a sign-up.
#[derive(Debug, Clone)]
pub enum Registration {
    /// Account is usable immediately
    Active(Session),

    /// Account exists but the email must be confirmed before logging in
    PendingConfirmation(Principal),
}

impl Registration {
    pub fn principal(&self) -> &Principal {
        match self {
            Registration::Active(session) => &session.principal,
            Registration::PendingConfirmation(principal) => principal,
        }
    }
}

/// Metadata for a freshly uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewImage {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[validate(length(min = 1, message = "Image URL is required"))]
    pub image_url: String,

    #[validate(length(min = 1, message = "Public ID is required"))]
    pub cloudinary_public_id: String,
}

/// A row of the `images` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    pub image_url: String,

    pub cloudinary_public_id: String,

    pub created_at: DateTime<Utc>,

    /// Owning principal, when the store exposes the scoping column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Row ids may be uuids or bigints depending on the table definition.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

// =============================================================================
// SessionStore Trait
// =============================================================================

/// Authentication and row storage backend.
///
/// Row operations are always scoped to the principal owning `access_token`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create an account.
    async fn sign_up(&self, credentials: &Credentials) -> Result<Registration, StoreError>;

    /// Exchange credentials for a session.
    ///
    /// Returns [`StoreError::InvalidCredentials`] when the pair is rejected.
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, StoreError>;

    /// Revoke a session.
    async fn sign_out(&self, access_token: &str) -> Result<(), StoreError>;

    /// Resolve the principal behind an access token.
    ///
    /// Returns [`StoreError::Unauthenticated`] for unknown or expired tokens.
    async fn principal(&self, access_token: &str) -> Result<Principal, StoreError>;

    /// Insert an image row owned by the caller.
    async fn insert_image(
        &self,
        access_token: &str,
        image: &NewImage,
    ) -> Result<ImageRecord, StoreError>;

    /// List the caller's image rows, newest first.
    async fn list_images(&self, access_token: &str) -> Result<Vec<ImageRecord>, StoreError>;

    /// Find the caller's row for a media object.
    ///
    /// `None` when no row visible to the caller references `public_id`.
    async fn find_image_by_public_id(
        &self,
        access_token: &str,
        public_id: &str,
    ) -> Result<Option<ImageRecord>, StoreError>;

    /// Delete one of the caller's rows.
    ///
    /// Returns [`StoreError::NotFound`] when no visible row has that id.
    async fn delete_image(&self, access_token: &str, id: &str) -> Result<(), StoreError>;
}
