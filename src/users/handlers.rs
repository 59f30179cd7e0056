use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::dto::{
    CareerRequest, CareerUser, GoalRequest, ProfileRequest, StatsResponse, StatsUser, UserEnvelope,
    UserInfo,
};
use crate::{
    auth::{
        services::{hash_password, is_valid_email, MIN_PASSWORD_LEN},
        AuthUser, PublicUser,
    },
    error::AppError,
    progress::service::current_progress,
    state::AppState,
    store::{CareerField, ProfileUpdate, StoreError, User},
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/info", get(get_info))
        .route("/user/profile", put(update_profile))
        .route("/user/career", put(update_career))
        .route("/user/goal", put(update_goal))
        .route("/user/stats", get(get_stats))
}

async fn load_user(state: &AppState, user_id: uuid::Uuid) -> Result<User, AppError> {
    state
        .store
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

#[instrument(skip(state))]
pub async fn get_info(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserEnvelope<UserInfo>>, AppError> {
    let user = load_user(&state, user_id).await?;
    Ok(Json(UserEnvelope {
        message: None,
        user: UserInfo::from(&user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ProfileRequest>,
) -> Result<Json<UserEnvelope<PublicUser>>, AppError> {
    let email = payload.email.trim().to_lowercase();
    let first_name = payload.first_name.trim();
    let last_name = payload.last_name.trim();

    if first_name.is_empty() || last_name.is_empty() || email.is_empty() {
        return Err(AppError::BadRequest(
            "First name, last name, and email are required".into(),
        ));
    }
    if !is_valid_email(&email) {
        return Err(AppError::BadRequest("Invalid email".into()));
    }

    let password_hash = match payload.password.as_deref().filter(|p| !p.trim().is_empty()) {
        Some(p) if p.len() < MIN_PASSWORD_LEN => {
            return Err(AppError::BadRequest("Password too short".into()));
        }
        Some(p) => Some(hash_password(p)?),
        None => None,
    };
    let password_changed = password_hash.is_some();

    let user = state
        .store
        .update_profile(
            user_id,
            ProfileUpdate {
                email,
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                password_hash,
            },
        )
        .await
        .map_err(|e| match e {
            StoreError::EmailTaken => {
                warn!(%user_id, "email already used by another account");
                AppError::Conflict("Email is already in use by another account".into())
            }
            other => other.into(),
        })?;

    info!(%user_id, password_changed, "profile updated");
    Ok(Json(UserEnvelope {
        message: Some("Profile updated successfully"),
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_career(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CareerRequest>,
) -> Result<Json<UserEnvelope<CareerUser>>, AppError> {
    let career = payload
        .career
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Career field is required".into()))?
        .parse::<CareerField>()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user = state.store.update_career(user_id, career).await?;
    info!(%user_id, %career, "career updated");
    Ok(Json(UserEnvelope {
        message: Some("Career updated successfully"),
        user: CareerUser::from(&user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_goal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<GoalRequest>, JsonRejection>,
) -> Result<Json<UserEnvelope<CareerUser>>, AppError> {
    let Json(payload) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let daily_goal = payload.goal()?;
    let user = state.store.update_daily_goal(user_id, daily_goal).await?;
    info!(%user_id, daily_goal = user.daily_goal, "daily goal updated");
    Ok(Json(UserEnvelope {
        message: Some("Daily goal updated successfully"),
        user: CareerUser::from(&user),
    }))
}

#[instrument(skip(state))]
pub async fn get_stats(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<StatsResponse>, AppError> {
    let user = load_user(&state, user_id).await?;
    let (progress, today) = current_progress(state.store.as_ref(), state.clock.as_ref(), user_id).await?;

    Ok(Json(StatsResponse {
        user: StatsUser {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            career: user.career,
            daily_goal: progress.daily_goal,
            current_streak: progress.current_streak,
            longest_streak: progress.longest_streak,
            last_active_date: progress.last_active_date,
        },
        today_applications: today,
    }))
}
