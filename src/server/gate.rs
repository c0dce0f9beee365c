//! Access gate for the gallery views.
//!
//! Decides, before a view renders, whether the visitor belongs there:
//!
//! | Route             | Session | Outcome               |
//! |-------------------|---------|-----------------------|
//! | `/upload/...`     | none    | redirect `/login`     |
//! | `/gallery/...`    | none    | redirect `/login`     |
//! | `/login`          | valid   | redirect `/gallery`   |
//! | `/register`       | valid   | redirect `/gallery`   |
//! | anything else     | any     | pass through          |
//!
//! Prefixes match whole path segments: `/gallery` and `/gallery/2024` are
//! protected, `/gallery-public` is not.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use crate::media::MediaHost;
use crate::store::SessionStore;

use super::handlers::AppState;
use super::session::resolve_session;

/// Routes that require a session.
pub const PROTECTED_PREFIXES: &[&str] = &["/upload", "/gallery"];

/// Routes only for visitors without a session.
pub const AUTH_ONLY_PREFIXES: &[&str] = &["/login", "/register"];

/// Where anonymous visitors are sent.
pub const LOGIN_PATH: &str = "/login";

/// Where signed-in visitors are sent.
pub const GALLERY_PATH: &str = "/gallery";

/// Outcome of gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Send the visitor elsewhere
    Redirect(&'static str),

    /// Let the request through unchanged
    PassThrough,
}

/// Which gate rule a path falls under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Protected,
    AuthOnly,
    Open,
}

/// Classify a request path.
pub fn classify(path: &str) -> RouteClass {
    if PROTECTED_PREFIXES.iter().any(|p| has_prefix(path, p)) {
        RouteClass::Protected
    } else if AUTH_ONLY_PREFIXES.iter().any(|p| has_prefix(path, p)) {
        RouteClass::AuthOnly
    } else {
        RouteClass::Open
    }
}

/// Evaluate the gate for a path and session presence.
pub fn evaluate(path: &str, has_session: bool) -> GateDecision {
    match (classify(path), has_session) {
        (RouteClass::Protected, false) => GateDecision::Redirect(LOGIN_PATH),
        (RouteClass::AuthOnly, true) => GateDecision::Redirect(GALLERY_PATH),
        _ => GateDecision::PassThrough,
    }
}

fn has_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Axum middleware applying [`evaluate`] to view routes.
///
/// Open routes skip the session lookup entirely. A store failure during the
/// lookup counts as "no session".
pub async fn access_gate<S, M>(
    State(state): State<AppState<S, M>>,
    request: Request,
    next: Next,
) -> Response
where
    S: SessionStore + 'static,
    M: MediaHost + 'static,
{
    let path = request.uri().path().to_string();

    if classify(&path) == RouteClass::Open {
        return next.run(request).await;
    }

    let has_session = matches!(
        resolve_session(&state.cookies, state.store.as_ref(), request.headers()).await,
        Ok(Some(_))
    );

    match evaluate(&path, has_session) {
        GateDecision::Redirect(to) => {
            debug!(path = %path, to = to, has_session, "Access gate redirect");
            Redirect::temporary(to).into_response()
        }
        GateDecision::PassThrough => next.run(request).await,
    }
}
