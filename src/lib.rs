//! # Cloud Gallery
//!
//! A private image gallery. Authentication and image metadata live in a
//! hosted session store; image bytes live at a hosted media host. The
//! server never sees upload bytes: it mints short-lived upload signatures,
//! and clients send files straight to the media host.
//!
//! ## Features
//!
//! - **Direct uploads**: Server-signed, timestamped authorizations; the API secret never leaves the server
//! - **Per-user galleries**: Image rows are scoped to their creator by the store
//! - **Access gate**: Protected pages redirect to login, login pages redirect signed-in users
//! - **Client flows**: Upload and delete orchestration usable from Rust
//!
//! ## Architecture
//!
//! - [`signature`] - Upload signing and verification
//! - [`store`] - Session store trait and the Supabase-backed implementation
//! - [`media`] - Media host traits and the Cloudinary-backed implementation
//! - [`forms`] - Validated account forms
//! - [`server`] - Axum-based HTTP server, access gate and views
//! - [`client`] - Upload/delete orchestrators and the HTTP client
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use cloud_gallery::{
//!     create_router, Cloudinary, RouterConfig, SupabaseConfig, SupabaseStore, UploadSigner,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SupabaseStore::new(SupabaseConfig::new(
//!         "https://project.supabase.co",
//!         "anon-key",
//!     ))?;
//!     let signer = UploadSigner::new("api-secret");
//!     let media = Cloudinary::new("https://api.cloudinary.com", "demo", "123456")?
//!         .with_signer(signer.clone());
//!
//!     let router = create_router(store, media, signer, RouterConfig::new("cookie-secret"));
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod forms;
pub mod media;
pub mod server;
pub mod signature;
pub mod store;

// Re-export commonly used types
pub use client::{
    Action, AuthState, AuthSubscription, DeleteOrchestrator, Gallery, GalleryClient,
    ImageRecords, Notice, RemoteMedia, Removal, SignatureSource, UploadForm, UploadOrchestrator,
};
pub use config::{Cli, Command, ServeConfig, SignConfig, SignOutputFormat};
pub use error::{GalleryError, MediaError, SignatureError, StoreError};
pub use forms::{LoginForm, RegisterForm};
pub use media::{Cloudinary, ImageFile, MediaHost, MediaUploader, UploadedAsset};
pub use server::{
    access_gate, create_router, evaluate, AppState, CurrentSession, GateDecision, RouterConfig,
    SessionCookies,
};
pub use signature::{UploadAuthorization, UploadSigner};
pub use store::{
    Credentials, ImageRecord, NewImage, Principal, Registration, Session, SessionStore,
    SupabaseConfig, SupabaseStore,
};
