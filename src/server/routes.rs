//! Router configuration for the gallery server.
//!
//! # Route Structure
//!
//! ```text
//! /health                          - Health check (public)
//! /api/cloudinary/signature        - Upload authorization (session)
//! /api/cloudinary/delete           - Media delete (session)
//! /api/auth/{register,login,logout}
//! /api/session                     - Current principal (session)
//! /api/images, /api/images/{id}    - Image rows (session)
//! /, /login, /register             - Views
//! /upload, /gallery                - Views (session, via access gate)
//! ```
//!
//! The access gate wraps the whole router so it also sees unmatched
//! sub-paths such as `/gallery/anything`.
//!
//! # Example
//!
//! ```ignore
//! use cloud_gallery::server::routes::{create_router, RouterConfig};
//!
//! let config = RouterConfig::new("cookie-secret")
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(store, media, signer, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use http::header::{CONTENT_TYPE, COOKIE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::gate::access_gate;
use super::handlers::{
    create_image_handler, delete_image_handler, delete_media_handler, health_handler,
    list_images_handler, login_handler, logout_handler, register_handler, session_handler,
    signature_handler, AppState, DirectUploadConfig,
};
use super::session::SessionCookies;
use super::views::{gallery_view, index_view, login_view, register_view, upload_view};
use crate::media::MediaHost;
use crate::signature::UploadSigner;
use crate::store::SessionStore;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Secret for signing session cookies
    pub cookie_secret: String,

    /// Mark session cookies `Secure`
    pub secure_cookies: bool,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,

    /// Public direct-upload settings for the upload view
    pub direct_upload: DirectUploadConfig,
}

impl RouterConfig {
    /// Create a configuration with the given cookie secret.
    ///
    /// By default:
    /// - Cookies are not marked `Secure`
    /// - CORS allows any origin
    /// - Tracing is enabled
    pub fn new(cookie_secret: impl Into<String>) -> Self {
        Self {
            cookie_secret: cookie_secret.into(),
            secure_cookies: false,
            cors_origins: None,
            enable_tracing: true,
            direct_upload: DirectUploadConfig::default(),
        }
    }

    /// Mark session cookies `Secure`.
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Set the media host URL and public key rendered into the upload view.
    pub fn with_direct_upload(
        mut self,
        upload_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        self.direct_upload = DirectUploadConfig {
            upload_url: upload_url.into(),
            api_key: api_key.into(),
        };
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// # Arguments
///
/// * `store` - Session store for authentication and image rows
/// * `media` - Media host for admin deletes
/// * `signer` - Upload signer holding the media host's API secret
/// * `config` - Router configuration
pub fn create_router<S, M>(store: S, media: M, signer: UploadSigner, config: RouterConfig) -> Router
where
    S: SessionStore + 'static,
    M: MediaHost + 'static,
{
    let cookies = SessionCookies::new(&config.cookie_secret).with_secure(config.secure_cookies);
    let app_state = AppState::new(store, media, signer, cookies)
        .with_direct_upload(config.direct_upload.clone());

    let cors = build_cors_layer(&config);

    let api_routes = Router::new()
        .route("/cloudinary/signature", get(signature_handler::<S, M>))
        .route("/cloudinary/delete", delete(delete_media_handler::<S, M>))
        .route("/auth/register", post(register_handler::<S, M>))
        .route("/auth/login", post(login_handler::<S, M>))
        .route("/auth/logout", post(logout_handler::<S, M>))
        .route("/session", get(session_handler))
        .route(
            "/images",
            get(list_images_handler::<S, M>).post(create_image_handler::<S, M>),
        )
        .route("/images/{id}", delete(delete_image_handler::<S, M>));

    let view_routes = Router::new()
        .route("/", get(index_view))
        .route("/login", get(login_view))
        .route("/register", get(register_view))
        .route("/upload", get(upload_view::<S, M>))
        .route("/gallery", get(gallery_view::<S, M>));

    let router = Router::new()
        .nest("/api", api_routes)
        .merge(view_routes)
        .route("/health", get(health_handler))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            access_gate::<S, M>,
        ))
        .with_state(app_state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, COOKIE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
