use anyhow::Context;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::{CareerField, CredentialStore, NewUser, ProfileUpdate, ProgressSnapshot, StoreError, User};
use crate::progress::engine::{DayRecord, UserProgress, DEFAULT_DAILY_GOAL};

const USER_COLUMNS: &str =
    "id, email, password_hash, first_name, last_name, career, daily_goal, created_at, updated_at";

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    career: Option<String>,
    daily_goal: i32,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let career = r
            .career
            .as_deref()
            .map(str::parse::<CareerField>)
            .transpose()
            .with_context(|| format!("stored career for user {}", r.id))?;
        Ok(Self {
            id: r.id,
            email: r.email,
            password_hash: r.password_hash,
            first_name: r.first_name,
            last_name: r.last_name,
            career,
            daily_goal: r.daily_goal,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ProgressRow {
    daily_goal: i32,
    current_streak: i32,
    longest_streak: i32,
    last_active_date: Option<Date>,
    progress_version: i64,
    count: Option<i32>,
    streak_credited: Option<bool>,
}

fn map_unique(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::EmailTaken,
        other => StoreError::Database(other),
    }
}

/// Postgres-backed [`CredentialStore`].
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, daily_goal)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .bind(&new_user.first_name)
            .bind(&new_user.last_name)
            .bind(DEFAULT_DAILY_GOAL)
            .fetch_one(&self.db)
            .await
            .map_err(map_unique)?;
        row.try_into()
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            UPDATE users
               SET email = $2,
                   first_name = $3,
                   last_name = $4,
                   password_hash = COALESCE($5, password_hash),
                   updated_at = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(&update.email)
            .bind(&update.first_name)
            .bind(&update.last_name)
            .bind(update.password_hash.as_deref())
            .fetch_optional(&self.db)
            .await
            .map_err(map_unique)?
            .ok_or(StoreError::NotFound)?;
        row.try_into()
    }

    async fn update_career(&self, id: Uuid, career: CareerField) -> Result<User, StoreError> {
        let sql = format!(
            "UPDATE users SET career = $2, updated_at = now() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(career.as_str())
            .fetch_optional(&self.db)
            .await?
            .ok_or(StoreError::NotFound)?;
        row.try_into()
    }

    async fn update_daily_goal(&self, id: Uuid, daily_goal: i32) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            UPDATE users
               SET daily_goal = $2,
                   progress_version = progress_version + 1,
                   updated_at = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(daily_goal)
            .fetch_optional(&self.db)
            .await?
            .ok_or(StoreError::NotFound)?;
        row.try_into()
    }

    async fn get_user_progress(&self, id: Uuid) -> Result<ProgressSnapshot, StoreError> {
        let row = sqlx::query_as::<_, ProgressRow>(
            r#"
            SELECT u.daily_goal, u.current_streak, u.longest_streak, u.last_active_date,
                   u.progress_version, d.count, d.streak_credited
              FROM users u
              LEFT JOIN daily_applications d
                ON d.user_id = u.id AND d.date = u.last_active_date
             WHERE u.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)?;

        Ok(ProgressSnapshot {
            progress: UserProgress {
                daily_goal: row.daily_goal,
                current_streak: row.current_streak,
                longest_streak: row.longest_streak,
                last_active_date: row.last_active_date,
                today: DayRecord {
                    count: row.count.unwrap_or(0),
                    streak_credited: row.streak_credited.unwrap_or(false),
                },
            },
            version: row.progress_version,
        })
    }

    async fn save_user_progress(
        &self,
        id: Uuid,
        expected_version: i64,
        progress: &UserProgress,
    ) -> Result<i64, StoreError> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        let updated: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE users
               SET current_streak = $3,
                   longest_streak = $4,
                   last_active_date = $5,
                   progress_version = progress_version + 1,
                   updated_at = now()
             WHERE id = $1 AND progress_version = $2
            RETURNING progress_version
            "#,
        )
        .bind(id)
        .bind(expected_version)
        .bind(progress.current_streak)
        .bind(progress.longest_streak)
        .bind(progress.last_active_date)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((version,)) = updated else {
            tx.rollback().await.context("rollback tx")?;
            let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.db)
                .await?;
            return Err(match exists {
                Some(_) => StoreError::Conflict,
                None => StoreError::NotFound,
            });
        };

        if let Some(date) = progress.last_active_date {
            let record = progress.today;
            if record.count == 0 && !record.streak_credited {
                // Empty days are only written when a record already exists.
                sqlx::query(
                    r#"
                    UPDATE daily_applications
                       SET count = 0, streak_credited = FALSE, updated_at = now()
                     WHERE user_id = $1 AND date = $2
                    "#,
                )
                .bind(id)
                .bind(date)
                .execute(&mut *tx)
                .await?;
            } else {
                sqlx::query(
                    r#"
                    INSERT INTO daily_applications (user_id, date, count, streak_credited)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (user_id, date)
                    DO UPDATE SET count = EXCLUDED.count,
                                  streak_credited = EXCLUDED.streak_credited,
                                  updated_at = now()
                    "#,
                )
                .bind(id)
                .bind(date)
                .bind(record.count)
                .bind(record.streak_credited)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await.context("commit tx")?;
        debug!(user_id = %id, version, "progress saved");
        Ok(version)
    }
}
