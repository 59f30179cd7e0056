use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;
use uuid::Uuid;

use super::services::{session_token, JwtKeys};
use crate::error::AppError;
use crate::state::AppState;

/// Extracts and validates the session token, returning the user ID.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers, &state.config.session.cookie_name)
            .ok_or(AppError::NotAuthenticated)?;

        let keys = JwtKeys::from(&state.config.jwt);
        let claims = keys.verify_access(token).map_err(|e| {
            warn!(error = %e, "invalid or expired session");
            AppError::NotAuthenticated
        })?;

        Ok(AuthUser(claims.sub))
    }
}
