//! Session cookies for the gallery server.
//!
//! After login the store's access token is handed to the browser in a
//! cookie. The value is bound to the server with an HMAC-SHA256 tag so a
//! forged or edited cookie is rejected before the store is ever asked:
//!
//! ```text
//! gallery_session = "{access_token}.{hex(HMAC-SHA256(cookie_secret, access_token))}"
//! ```
//!
//! Access tokens are JWTs and contain dots themselves, so the tag is split
//! off at the last dot.
//!
//! Two extractors resolve the cookie against the store:
//!
//! - [`CurrentSession`] rejects with 401 when there is no valid session
//! - [`MaybeSession`] never rejects

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap, HeaderValue};
use cookie::time::Duration as CookieDuration;
use cookie::{Cookie, SameSite};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::error::{GalleryError, StoreError};
use crate::media::MediaHost;
use crate::store::{Principal, SessionStore};

use super::handlers::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Default cookie name.
pub const SESSION_COOKIE_NAME: &str = "gallery_session";

/// Why a cookie value was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieError {
    /// No `{token}.{tag}` structure
    Malformed,

    /// Tag is not valid hex
    InvalidTagFormat,

    /// Tag does not match the token
    InvalidTag,
}

impl std::fmt::Display for CookieError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CookieError::Malformed => write!(f, "Malformed session cookie"),
            CookieError::InvalidTagFormat => write!(f, "Invalid session cookie tag format"),
            CookieError::InvalidTag => write!(f, "Invalid session cookie tag"),
        }
    }
}

/// Issues and checks signed session cookies.
#[derive(Clone)]
pub struct SessionCookies {
    secret_key: Vec<u8>,
    name: String,
    secure: bool,
}

impl SessionCookies {
    /// Create a cookie codec with the given secret.
    ///
    /// The secret should be at least 32 bytes.
    pub fn new(secret_key: impl AsRef<[u8]>) -> Self {
        Self {
            secret_key: secret_key.as_ref().to_vec(),
            name: SESSION_COOKIE_NAME.to_string(),
            secure: false,
        }
    }

    /// Mark cookies `Secure` (HTTPS only).
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Use a different cookie name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Encode an access token into a signed cookie value.
    pub fn encode(&self, access_token: &str) -> String {
        format!("{}.{}", access_token, self.tag(access_token))
    }

    /// Verify a cookie value and return the access token inside it.
    pub fn decode(&self, value: &str) -> Result<String, CookieError> {
        let (token, tag) = value.rsplit_once('.').ok_or(CookieError::Malformed)?;
        if token.is_empty() || tag.is_empty() {
            return Err(CookieError::Malformed);
        }

        let provided = hex::decode(tag).map_err(|_| CookieError::InvalidTagFormat)?;
        let expected =
            hex::decode(self.tag(token)).map_err(|_| CookieError::InvalidTagFormat)?;

        if provided.ct_eq(&expected).into() {
            Ok(token.to_string())
        } else {
            Err(CookieError::InvalidTag)
        }
    }

    /// `Set-Cookie` value starting a session.
    pub fn set_cookie(&self, access_token: &str) -> Option<HeaderValue> {
        let cookie = self.cookie(self.encode(access_token));
        HeaderValue::from_str(&cookie.to_string()).ok()
    }

    /// `Set-Cookie` value ending a session.
    pub fn clear_cookie(&self) -> Option<HeaderValue> {
        let mut cookie = self.cookie(String::new());
        cookie.set_max_age(CookieDuration::ZERO);
        HeaderValue::from_str(&cookie.to_string()).ok()
    }

    fn cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build((self.name.clone(), value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build()
    }

    /// Find and verify the session cookie among request headers.
    ///
    /// Returns `None` when absent or invalid; invalid cookies are logged.
    pub fn access_token(&self, headers: &HeaderMap) -> Option<String> {
        let raw = find_cookie(headers, &self.name)?;
        match self.decode(&raw) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(error = %e, "Rejected session cookie");
                None
            }
        }
    }

    fn tag(&self, access_token: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret_key).expect("HMAC can take key of any size");
        mac.update(access_token.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// Look up a cookie by name across all `Cookie` headers.
pub fn find_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| Cookie::split_parse(value))
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value_trimmed().to_string())
}

// =============================================================================
// Extractors
// =============================================================================

/// A request's verified session.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub access_token: String,
    pub principal: Principal,
}

/// Resolve the session cookie against the store.
///
/// `Ok(None)` means no session; `Err` is a store failure other than an
/// unknown/expired token.
pub async fn resolve_session<S: SessionStore>(
    cookies: &SessionCookies,
    store: &S,
    headers: &HeaderMap,
) -> Result<Option<CurrentSession>, StoreError> {
    let Some(access_token) = cookies.access_token(headers) else {
        return Ok(None);
    };

    match store.principal(&access_token).await {
        Ok(principal) => Ok(Some(CurrentSession {
            access_token,
            principal,
        })),
        Err(StoreError::Unauthenticated) => {
            debug!("Session cookie refers to an expired or revoked token");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

impl<S, M> FromRequestParts<AppState<S, M>> for CurrentSession
where
    S: SessionStore + 'static,
    M: MediaHost + 'static,
{
    type Rejection = GalleryError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S, M>,
    ) -> Result<Self, Self::Rejection> {
        resolve_session(&state.cookies, state.store.as_ref(), &parts.headers)
            .await?
            .ok_or_else(GalleryError::unauthorized)
    }
}

/// Session if present; never rejects.
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<CurrentSession>);

impl<S, M> FromRequestParts<AppState<S, M>> for MaybeSession
where
    S: SessionStore + 'static,
    M: MediaHost + 'static,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S, M>,
    ) -> Result<Self, Self::Rejection> {
        match resolve_session(&state.cookies, state.store.as_ref(), &parts.headers).await {
            Ok(session) => Ok(MaybeSession(session)),
            Err(e) => {
                warn!(error = %e, "Session lookup failed, treating request as anonymous");
                Ok(MaybeSession(None))
            }
        }
    }
}
