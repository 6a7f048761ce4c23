use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::auth::{jwt::JwtKeys, password::CredentialHasher};
use crate::config::AppConfig;
use crate::store::{BlogStore, MemoryStore, PgStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub keys: JwtKeys,
    pub hasher: CredentialHasher,
    pub users: Arc<dyn UserStore>,
    pub blogs: Arc<dyn BlogStore>,
}

impl AppState {
    /// Connects to Postgres and applies migrations. Any failure here is a
    /// startup fault.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run database migrations")?;
        tracing::info!("database migrations applied");

        let store = Arc::new(PgStore::new(db));
        Self::from_parts(config, store.clone(), store)
    }

    /// State backed by [`MemoryStore`]; nothing outside the process is touched.
    pub fn in_memory(config: AppConfig) -> anyhow::Result<Self> {
        let store = Arc::new(MemoryStore::new());
        Self::from_parts(config, store.clone(), store)
    }

    pub fn from_parts(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        blogs: Arc<dyn BlogStore>,
    ) -> anyhow::Result<Self> {
        let keys = JwtKeys::new(&config.jwt).context("build jwt keys")?;
        let hasher = CredentialHasher::new(&config.hashing).context("build password hasher")?;
        Ok(Self {
            config: Arc::new(config),
            keys,
            hasher,
            users,
            blogs,
        })
    }
}
