use std::{fmt, str::FromStr};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::progress::engine::UserProgress;

#[cfg(test)]
pub mod memory;
pub mod postgres;

#[cfg(test)]
pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("progress was modified concurrently")]
    Conflict,
    #[error("user not found")]
    NotFound,
    #[error("email already registered")]
    EmailTaken,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Career the user is looking for work in. Only used to pick tips client-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CareerField {
    #[serde(rename = "Software Development")]
    SoftwareDevelopment,
    Marketing,
    Design,
    Finance,
    Healthcare,
    Other,
}

impl CareerField {
    pub fn as_str(self) -> &'static str {
        match self {
            CareerField::SoftwareDevelopment => "Software Development",
            CareerField::Marketing => "Marketing",
            CareerField::Design => "Design",
            CareerField::Finance => "Finance",
            CareerField::Healthcare => "Healthcare",
            CareerField::Other => "Other",
        }
    }
}

impl fmt::Display for CareerField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CareerField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Software Development" => Ok(CareerField::SoftwareDevelopment),
            "Marketing" => Ok(CareerField::Marketing),
            "Design" => Ok(CareerField::Design),
            "Finance" => Ok(CareerField::Finance),
            "Healthcare" => Ok(CareerField::Healthcare),
            "Other" => Ok(CareerField::Other),
            other => anyhow::bail!("unknown career field: {other}"),
        }
    }
}

/// User record as stored.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String, // Argon2 hash
    pub first_name: String,
    pub last_name: String,
    pub career: Option<CareerField>,
    pub daily_goal: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// `None` keeps the current password.
    pub password_hash: Option<String>,
}

/// Progress as loaded, tagged with the version the next save must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub progress: UserProgress,
    pub version: i64,
}

/// Persistence for users and their daily application records.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// Fails with [`StoreError::EmailTaken`] if the email is in use.
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError>;
    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<User, StoreError>;
    async fn update_career(&self, id: Uuid, career: CareerField) -> Result<User, StoreError>;
    /// Also bumps the progress version so in-flight progress writes see the new goal.
    async fn update_daily_goal(&self, id: Uuid, daily_goal: i32) -> Result<User, StoreError>;
    async fn get_user_progress(&self, id: Uuid) -> Result<ProgressSnapshot, StoreError>;
    /// Writes streak fields and the record for `progress.last_active_date` in one step.
    /// Fails with [`StoreError::Conflict`] if the stored version is not `expected_version`.
    /// Returns the new version.
    async fn save_user_progress(
        &self,
        id: Uuid,
        expected_version: i64,
        progress: &UserProgress,
    ) -> Result<i64, StoreError>;
}
