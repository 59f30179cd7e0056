use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::progress::engine::{validate_goal, DayView, ProgressError};
use crate::store::{CareerField, User};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&User> for UserInfo {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            email: u.email.clone(),
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub user: T,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CareerRequest {
    pub career: Option<String>,
}

/// `dailyGoal` is kept raw so that floats, strings and nulls surface as
/// [`ProgressError::InvalidGoal`] instead of a body rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoalRequest {
    pub daily_goal: Value,
}

impl GoalRequest {
    pub fn goal(&self) -> Result<i32, ProgressError> {
        let goal = self
            .daily_goal
            .as_i64()
            .and_then(|g| i32::try_from(g).ok())
            .ok_or_else(|| ProgressError::InvalidGoal(self.daily_goal.to_string()))?;
        validate_goal(goal)?;
        Ok(goal)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerUser {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub career: Option<CareerField>,
}

impl From<&User> for CareerUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            email: u.email.clone(),
            career: u.career,
        }
    }
}

/// User fields shown on the dashboard.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsUser {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub career: Option<CareerField>,
    pub daily_goal: i32,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_active_date: Option<Date>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub user: StatsUser,
    pub today_applications: DayView,
}
