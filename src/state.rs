use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::store::{CredentialStore, PgStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn CredentialStore>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Connects to Postgres and returns the state plus the store, so the caller can run migrations.
    pub async fn init() -> anyhow::Result<(Self, PgStore)> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await?;
        let pg = PgStore::new(db);

        let clock = Arc::new(SystemClock::with_offset_minutes(config.utc_offset_minutes)?)
            as Arc<dyn Clock>;
        let store = Arc::new(pg.clone()) as Arc<dyn CredentialStore>;

        Ok((Self::from_parts(config, store, clock), pg))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            store,
            clock,
        }
    }

    /// State backed by the in-memory store and a clock pinned to `today`.
    #[cfg(test)]
    pub fn fake(today: time::Date) -> (Self, Arc<crate::clock::FixedClock>) {
        use crate::clock::FixedClock;
        use crate::store::MemoryStore;

        let clock = Arc::new(FixedClock::new(today));
        let state = Self::from_parts(
            Arc::new(AppConfig::for_tests()),
            Arc::new(MemoryStore::new()),
            clock.clone(),
        );
        (state, clock)
    }
}
