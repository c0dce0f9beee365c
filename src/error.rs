use std::collections::BTreeMap;

use thiserror::Error;

/// Errors returned by the session store (authentication and image rows).
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Email/password pair was rejected
    #[error("{0}")]
    InvalidCredentials(String),

    /// Access token is missing, expired or revoked
    #[error("Session is missing or expired")]
    Unauthenticated,

    /// No row matched the request (already deleted or never visible to this principal)
    #[error("Record not found: {0}")]
    NotFound(String),

    /// The store answered with a non-success status
    #[error("Store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Response body did not have the expected shape
    #[error("Unexpected store response: {0}")]
    Decode(String),
}

/// Errors returned by the media host.
#[derive(Debug, Clone, Error)]
pub enum MediaError {
    /// The host answered with `{ "error": { "message": ... } }`
    #[error("{0}")]
    Rejected(String),

    /// Object does not exist at the host
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Client is missing something it needs for the call (e.g. a signing secret)
    #[error("Media host misconfigured: {0}")]
    Misconfigured(String),

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Response body did not have the expected shape
    #[error("Unexpected media host response: {0}")]
    Decode(String),
}

/// Errors from minting or checking upload signatures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// No API secret is configured
    #[error("Signing secret is not configured")]
    MissingSecret,

    /// Signature is not valid hex
    #[error("Invalid signature format")]
    InvalidFormat,

    /// Signature does not match the signed parameters
    #[error("Invalid signature")]
    Mismatch,
}

/// The error kinds surfaced by gallery operations, on the server and in client flows.
#[derive(Debug, Clone, Error)]
pub enum GalleryError {
    /// No or invalid session
    #[error("{0}")]
    Unauthorized(String),

    /// Missing required input, wrong file type, password mismatch
    #[error("{0}")]
    Validation(String),

    /// The caller has no such image
    #[error("{0}")]
    NotFound(String),

    /// Media host or session store call failed
    #[error("{0}")]
    Upstream(String),

    /// Unexpected or unclassified failure
    #[error("{0}")]
    Internal(String),
}

impl GalleryError {
    /// Unauthorized with the generic message.
    pub fn unauthorized() -> Self {
        GalleryError::Unauthorized("Unauthorized".to_string())
    }

    /// Stable identifier of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            GalleryError::Unauthorized(_) => "unauthorized",
            GalleryError::Validation(_) => "validation_error",
            GalleryError::NotFound(_) => "not_found",
            GalleryError::Upstream(_) => "upstream_error",
            GalleryError::Internal(_) => "internal_error",
        }
    }
}

impl From<StoreError> for GalleryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unauthenticated => GalleryError::unauthorized(),
            StoreError::InvalidCredentials(message) => GalleryError::Unauthorized(message),
            StoreError::NotFound(_) => GalleryError::NotFound("Image not found".to_string()),
            // 4xx from the store means it refused the input itself
            StoreError::Rejected { status, message } if (400..500).contains(&status) => {
                GalleryError::Validation(message)
            }
            other => GalleryError::Upstream(other.to_string()),
        }
    }
}

impl From<MediaError> for GalleryError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::Misconfigured(message) => GalleryError::Internal(message),
            other => GalleryError::Upstream(other.to_string()),
        }
    }
}

impl From<SignatureError> for GalleryError {
    fn from(err: SignatureError) -> Self {
        GalleryError::Internal(err.to_string())
    }
}

impl From<validator::ValidationErrors> for GalleryError {
    fn from(errors: validator::ValidationErrors) -> Self {
        // Report the first failing field by name so the message is stable
        let message = errors
            .field_errors()
            .into_iter()
            .collect::<BTreeMap<_, _>>()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field))
                })
            })
            .next()
            .unwrap_or_else(|| "Invalid input".to_string());
        GalleryError::Validation(message)
    }
}
