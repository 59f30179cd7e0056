use serde::Serialize;

use super::engine::{DayView, Transition};

#[derive(Debug, Serialize)]
pub struct StreakView {
    pub current: i32,
    pub longest: i32,
    pub updated: bool,
}

/// Body returned by mark and undo.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationResponse {
    pub message: &'static str,
    pub daily_application: DayView,
    pub streak: StreakView,
}

impl ApplicationResponse {
    pub fn new(message: &'static str, t: &Transition) -> Self {
        Self {
            message,
            daily_application: t.state.day_view(),
            streak: StreakView {
                current: t.state.current_streak,
                longest: t.state.longest_streak,
                updated: t.streak_updated(),
            },
        }
    }
}
