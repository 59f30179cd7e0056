//! Daily goal and streak transitions.
//!
//! Everything here is pure: callers load a [`UserProgress`] snapshot, apply an
//! [`Action`] for a given day and persist whatever comes back.

use serde::Serialize;
use thiserror::Error;
use time::Date;

/// Default number of applications per day for new users.
pub const DEFAULT_DAILY_GOAL: i32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressError {
    /// Carries the rejected input as the client sent it.
    #[error("daily goal must be a positive integer, got {0}")]
    InvalidGoal(String),
    #[error("today's goal is already met; applications can no longer be undone")]
    GoalAlreadyMet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MarkSent,
    Undo,
}

/// Stored counter for one calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayRecord {
    pub count: i32,
    /// Set once the day has counted towards the streak; never cleared.
    pub streak_credited: bool,
}

/// A day's counter as the client sees it, judged against a particular goal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayView {
    pub count: i32,
    pub goal_met: bool,
}

impl DayView {
    pub fn new(count: i32, daily_goal: i32) -> Self {
        Self {
            count,
            goal_met: count >= daily_goal,
        }
    }
}

/// A user's goal-tracking state. `today` is the record for `last_active_date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserProgress {
    pub daily_goal: i32,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_active_date: Option<Date>,
    pub today: DayRecord,
}

impl UserProgress {
    #[cfg(test)]
    pub fn new(daily_goal: i32) -> Self {
        Self {
            daily_goal,
            current_streak: 0,
            longest_streak: 0,
            last_active_date: None,
            today: DayRecord::default(),
        }
    }

    /// `today` judged against the current goal.
    pub fn day_view(&self) -> DayView {
        DayView::new(self.today.count, self.daily_goal)
    }

    fn goal_met(&self) -> bool {
        self.today.count >= self.daily_goal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    Marked,
    GoalReached { streak: i32 },
    Undone,
    NothingToUndo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub state: UserProgress,
    pub event: ProgressEvent,
    pub rolled_over: bool,
}

impl Transition {
    pub fn streak_updated(&self) -> bool {
        matches!(self.event, ProgressEvent::GoalReached { .. })
    }
}

pub fn validate_goal(goal: i32) -> Result<(), ProgressError> {
    if goal <= 0 {
        return Err(ProgressError::InvalidGoal(goal.to_string()));
    }
    Ok(())
}

/// What the user should see for `today` without committing a rollover.
pub fn view(state: &UserProgress, today: Date) -> DayView {
    if state.last_active_date == Some(today) {
        state.day_view()
    } else {
        DayView::new(0, state.daily_goal)
    }
}

fn roll_over(state: &mut UserProgress, today: Date) -> bool {
    if state.last_active_date == Some(today) {
        return false;
    }
    state.today = DayRecord::default();
    state.last_active_date = Some(today);
    true
}

pub fn apply(state: &UserProgress, action: Action, today: Date) -> Result<Transition, ProgressError> {
    validate_goal(state.daily_goal)?;

    let mut next = *state;
    let rolled_over = roll_over(&mut next, today);

    let event = match action {
        Action::MarkSent => {
            next.today.count += 1;
            if !next.today.streak_credited && next.goal_met() {
                next.today.streak_credited = true;
                next.current_streak += 1;
                next.longest_streak = next.longest_streak.max(next.current_streak);
                ProgressEvent::GoalReached {
                    streak: next.current_streak,
                }
            } else {
                ProgressEvent::Marked
            }
        }
        Action::Undo => {
            if next.goal_met() {
                return Err(ProgressError::GoalAlreadyMet);
            }
            if next.today.count == 0 {
                ProgressEvent::NothingToUndo
            } else {
                next.today.count -= 1;
                ProgressEvent::Undone
            }
        }
    };

    Ok(Transition {
        state: next,
        event,
        rolled_over,
    })
}
