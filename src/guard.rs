//! Page-level redirects based on whether the visitor has a valid session.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use crate::auth::services::{session_token, JwtKeys};
use crate::state::AppState;

pub const LANDING_PATH: &str = "/";
pub const HOME_PATH: &str = "/dashboard";
pub const LOGIN_PATH: &str = "/login";
const SIGNUP_PATH: &str = "/signup";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(&'static str),
}

fn is_authenticated_area(path: &str) -> bool {
    path == HOME_PATH
        || path
            .strip_prefix(HOME_PATH)
            .is_some_and(|rest| rest.starts_with('/'))
}

pub fn decide(path: &str, has_session: bool) -> GuardDecision {
    match (path, has_session) {
        (LANDING_PATH, true) => GuardDecision::Redirect(HOME_PATH),
        (LOGIN_PATH | SIGNUP_PATH, true) => GuardDecision::Redirect(HOME_PATH),
        (p, false) if is_authenticated_area(p) => GuardDecision::Redirect(LOGIN_PATH),
        _ => GuardDecision::Allow,
    }
}

pub async fn route_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let has_session = session_token(request.headers(), &state.config.session.cookie_name)
        .is_some_and(|token| JwtKeys::from(&state.config.jwt).verify_access(token).is_ok());

    match decide(&path, has_session) {
        GuardDecision::Allow => next.run(request).await,
        GuardDecision::Redirect(to) => {
            debug!(path = %path, to, has_session, "route guard redirect");
            Redirect::temporary(to).into_response()
        }
    }
}
