use axum::{extract::State, routing::post, Json, Router};
use tracing::instrument;

use super::{
    dto::ApplicationResponse,
    engine::{Action, ProgressEvent},
    service::record_action,
};
use crate::{auth::AuthUser, error::AppError, state::AppState};

pub fn application_routes() -> Router<AppState> {
    Router::new().route("/applications", post(mark_sent).delete(undo))
}

/// POST /applications
#[instrument(skip(state))]
pub async fn mark_sent(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApplicationResponse>, AppError> {
    let t = record_action(state.store.as_ref(), state.clock.as_ref(), user_id, Action::MarkSent).await?;
    Ok(Json(ApplicationResponse::new("Application marked successfully", &t)))
}

/// DELETE /applications
#[instrument(skip(state))]
pub async fn undo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApplicationResponse>, AppError> {
    let t = record_action(state.store.as_ref(), state.clock.as_ref(), user_id, Action::Undo).await?;
    let message = match t.event {
        ProgressEvent::NothingToUndo => "No applications to undo",
        _ => "Application undone successfully",
    };
    Ok(Json(ApplicationResponse::new(message, &t)))
}
