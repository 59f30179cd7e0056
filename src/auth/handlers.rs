use axum::{
    extract::{FromRef, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, SignupRequest, SignupResponse},
        services::{
            clear_session_cookie, hash_password, is_valid_email, session_cookie, verify_password,
            JwtKeys, MIN_PASSWORD_LEN,
        },
    },
    error::AppError,
    state::AppState,
    store::{NewUser, StoreError, User},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    payload.email = payload.email.trim().to_lowercase();
    let first_name = payload.first_name.trim();
    let last_name = payload.last_name.trim();

    if first_name.is_empty() || last_name.is_empty() || payload.email.is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest("All fields are required".into()));
    }

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::BadRequest("Invalid email".into()));
    }

    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::BadRequest("Password too short".into()));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = state
        .store
        .create_user(NewUser {
            email: payload.email.clone(),
            password_hash,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        })
        .await
        .map_err(|e| match e {
            StoreError::EmailTaken => {
                warn!(email = %payload.email, "email already registered");
                AppError::Conflict("User with this email already exists".into())
            }
            other => other.into(),
        })?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User created successfully",
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) || payload.password.is_empty() {
        warn!(email = %payload.email, "malformed login");
        return Err(AppError::BadRequest("Email and password are required".into()));
    }

    let Some(user) = state.store.find_by_email(&payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(AppError::NotAuthenticated);
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(AppError::NotAuthenticated);
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    issue_session(&state, &user)
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&payload.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        AppError::NotAuthenticated
    })?;

    let user = state
        .store
        .find_by_id(claims.sub)
        .await?
        .ok_or(AppError::NotAuthenticated)?;

    issue_session(&state, &user)
}

#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, clear_session_cookie(&state.config.session))],
    )
}

/// Signs a token pair for `user` and sets the access token as the session cookie.
fn issue_session(state: &AppState, user: &User) -> Result<impl IntoResponse, AppError> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;
    let cookie = session_cookie(&state.config.session, &access_token, keys.access_ttl);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            access_token,
            refresh_token,
            user: PublicUser::from(user),
        }),
    ))
}
