//! HTTP server layer for the gallery.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │                                                                 │
//! │  ┌───────────┐ ┌───────────┐ ┌──────────┐ ┌─────────┐ ┌───────┐ │
//! │  │   gate    │ │  session  │ │ handlers │ │  views  │ │routes │ │
//! │  │(redirects)│ │ (cookies) │ │  (API)   │ │ (HTML)  │ │       │ │
//! │  └───────────┘ └───────────┘ └──────────┘ └─────────┘ └───────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod gate;
pub mod handlers;
pub mod routes;
pub mod session;
pub mod views;

pub use gate::{access_gate, evaluate, GateDecision, RouteClass};
pub use handlers::{
    AppState, CreateImageRequest, DeleteMediaParams, DirectUploadConfig, ErrorResponse,
    HealthResponse, JsonBody, MediaDeleteResponse, RegisterResponse, SessionResponse,
};
pub use routes::{create_router, RouterConfig};
pub use session::{CurrentSession, MaybeSession, SessionCookies, SESSION_COOKIE_NAME};
