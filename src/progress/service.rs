use tracing::{debug, info, warn};
use uuid::Uuid;

use super::engine::{self, Action, DayView, ProgressError, Transition, UserProgress};
use crate::clock::Clock;
use crate::store::{CredentialStore, StoreError};

/// How many times a lost optimistic race is re-read and re-applied.
const CONFLICT_RETRIES: usize = 1;

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error(transparent)]
    Rejected(#[from] ProgressError),
    #[error("progress was updated concurrently, please retry")]
    Conflict,
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ActionError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict => ActionError::Conflict,
            other => ActionError::Store(other),
        }
    }
}

/// Applies `action` for the user on the clock's current day and persists the result.
pub async fn record_action(
    store: &dyn CredentialStore,
    clock: &dyn Clock,
    user_id: Uuid,
    action: Action,
) -> Result<Transition, ActionError> {
    let today = clock.today();
    let mut attempt = 0;
    loop {
        let snapshot = store.get_user_progress(user_id).await?;
        let transition = engine::apply(&snapshot.progress, action, today)?;

        if transition.state == snapshot.progress {
            debug!(%user_id, ?action, "nothing to persist");
            return Ok(transition);
        }

        match store
            .save_user_progress(user_id, snapshot.version, &transition.state)
            .await
        {
            Ok(_) => {
                if transition.rolled_over {
                    debug!(%user_id, %today, "rolled over to new day");
                }
                if let engine::ProgressEvent::GoalReached { streak } = transition.event {
                    info!(%user_id, streak, "daily goal reached");
                }
                return Ok(transition);
            }
            Err(StoreError::Conflict) if attempt < CONFLICT_RETRIES => {
                attempt += 1;
                warn!(%user_id, attempt, "progress write lost a race; retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Current progress and the counter shown for today, without writing anything.
pub async fn current_progress(
    store: &dyn CredentialStore,
    clock: &dyn Clock,
    user_id: Uuid,
) -> Result<(UserProgress, DayView), StoreError> {
    let snapshot = store.get_user_progress(user_id).await?;
    let today = engine::view(&snapshot.progress, clock.today());
    Ok((snapshot.progress, today))
}
