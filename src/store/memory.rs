use std::collections::HashMap;

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CareerField, CredentialStore, NewUser, ProfileUpdate, ProgressSnapshot, StoreError, User};
use crate::progress::engine::{DayRecord, UserProgress, DEFAULT_DAILY_GOAL};

struct Entry {
    user: User,
    current_streak: i32,
    longest_streak: i32,
    last_active_date: Option<Date>,
    version: i64,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, Entry>,
    days: HashMap<(Uuid, Date), DayRecord>,
}

impl Inner {
    fn email_taken_by_other(&self, email: &str, id: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|e| e.user.email == email && Some(e.user.id) != id)
    }

    fn entry_mut(&mut self, id: Uuid) -> Result<&mut Entry, StoreError> {
        self.users.get_mut(&id).ok_or(StoreError::NotFound)
    }
}

/// In-memory [`CredentialStore`] for tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn day_record(&self, id: Uuid, date: Date) -> Option<DayRecord> {
        self.inner.lock().await.days.get(&(id, date)).copied()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .users
            .values()
            .find(|e| e.user.email == email)
            .map(|e| e.user.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.inner.lock().await.users.get(&id).map(|e| e.user.clone()))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.email_taken_by_other(&new_user.email, None) {
            return Err(StoreError::EmailTaken);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            password_hash: new_user.password_hash,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            career: None,
            daily_goal: DEFAULT_DAILY_GOAL,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(
            user.id,
            Entry {
                user: user.clone(),
                current_streak: 0,
                longest_streak: 0,
                last_active_date: None,
                version: 0,
            },
        );
        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.email_taken_by_other(&update.email, Some(id)) {
            return Err(StoreError::EmailTaken);
        }
        let user = &mut inner.entry_mut(id)?.user;
        user.email = update.email;
        user.first_name = update.first_name;
        user.last_name = update.last_name;
        if let Some(hash) = update.password_hash {
            user.password_hash = hash;
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(user.clone())
    }

    async fn update_career(&self, id: Uuid, career: CareerField) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().await;
        let user = &mut inner.entry_mut(id)?.user;
        user.career = Some(career);
        user.updated_at = OffsetDateTime::now_utc();
        Ok(user.clone())
    }

    async fn update_daily_goal(&self, id: Uuid, daily_goal: i32) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().await;
        let entry = inner.entry_mut(id)?;
        entry.user.daily_goal = daily_goal;
        entry.user.updated_at = OffsetDateTime::now_utc();
        entry.version += 1;
        Ok(entry.user.clone())
    }

    async fn get_user_progress(&self, id: Uuid) -> Result<ProgressSnapshot, StoreError> {
        let inner = self.inner.lock().await;
        let entry = inner.users.get(&id).ok_or(StoreError::NotFound)?;
        let today = entry
            .last_active_date
            .and_then(|d| inner.days.get(&(id, d)).copied())
            .unwrap_or_default();
        Ok(ProgressSnapshot {
            progress: UserProgress {
                daily_goal: entry.user.daily_goal,
                current_streak: entry.current_streak,
                longest_streak: entry.longest_streak,
                last_active_date: entry.last_active_date,
                today,
            },
            version: entry.version,
        })
    }

    async fn save_user_progress(
        &self,
        id: Uuid,
        expected_version: i64,
        progress: &UserProgress,
    ) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock().await;
        let entry = inner.entry_mut(id)?;
        if entry.version != expected_version {
            return Err(StoreError::Conflict);
        }
        entry.current_streak = progress.current_streak;
        entry.longest_streak = progress.longest_streak;
        entry.last_active_date = progress.last_active_date;
        entry.user.updated_at = OffsetDateTime::now_utc();
        entry.version += 1;
        let version = entry.version;

        if let Some(date) = progress.last_active_date {
            let key = (id, date);
            if progress.today != DayRecord::default() || inner.days.contains_key(&key) {
                inner.days.insert(key, progress.today);
            }
        }
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            password_hash: "hash".into(),
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email() {
        let store = MemoryStore::new();
        store.create_user(new_user("g@h.io")).await.unwrap();
        let err = store.create_user(new_user("g@h.io")).await.unwrap_err();
        assert!(matches!(err, StoreError::EmailTaken));
    }

    #[tokio::test]
    async fn save_checks_version() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("g@h.io")).await.unwrap();
        let snap = store.get_user_progress(user.id).await.unwrap();
        assert_eq!(snap.progress.daily_goal, DEFAULT_DAILY_GOAL);

        let mut progress = snap.progress;
        progress.last_active_date = Some(date!(2024 - 01 - 02));
        progress.today.count = 1;
        let v = store
            .save_user_progress(user.id, snap.version, &progress)
            .await
            .unwrap();
        assert_eq!(v, snap.version + 1);

        let err = store
            .save_user_progress(user.id, snap.version, &progress)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict));

        let reloaded = store.get_user_progress(user.id).await.unwrap();
        assert_eq!(reloaded.progress, progress);
    }

    #[tokio::test]
    async fn empty_day_is_not_recorded() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("g@h.io")).await.unwrap();
        let d = date!(2024 - 01 - 02);
        let progress = UserProgress {
            last_active_date: Some(d),
            ..UserProgress::new(3)
        };
        store.save_user_progress(user.id, 0, &progress).await.unwrap();
        assert_eq!(store.day_record(user.id, d).await, None);
    }

    #[tokio::test]
    async fn goal_update_bumps_version() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("g@h.io")).await.unwrap();
        store.update_daily_goal(user.id, 5).await.unwrap();
        let snap = store.get_user_progress(user.id).await.unwrap();
        assert_eq!(snap.version, 1);
        assert_eq!(snap.progress.daily_goal, 5);
    }
}
