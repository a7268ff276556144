// Relational sink: one row per record in the `api_logs` table (PostgreSQL)

use std::time::Duration;

use async_trait::async_trait;
use diesel::{ prelude::*, r2d2::{ ConnectionManager, Pool }, PgConnection };
use diesel_migrations::{ embed_migrations, EmbeddedMigrations, MigrationHarness };
use tracing::debug;

use super::{ LogStore, SinkError };
use crate::{ config::PostgresConfig, logger::LogRecord, models::NewApiLog, schema::api_logs };

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

pub struct PostgresLogStore {
    config: PostgresConfig,
    pool: Option<PgPool>,
}

impl PostgresLogStore {
    pub fn new(config: PostgresConfig) -> Self {
        Self { config, pool: None }
    }

    fn open_pool(config: &PostgresConfig) -> Result<PgPool, SinkError> {
        let manager = ConnectionManager::<PgConnection>::new(config.database_url());
        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(CONNECTION_TIMEOUT)
            .build(manager)
            .map_err(|e| SinkError::Connection(e.to_string()))?;

        let mut conn = pool.get()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| SinkError::Migration(e.to_string()))?;
        debug!(migrations = applied.len(), "Log table migrations applied");

        Ok(pool)
    }
}

#[async_trait]
impl LogStore for PostgresLogStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn connect(&mut self) -> Result<(), SinkError> {
        let config = self.config.clone();
        // r2d2 and diesel block, keep them off the runtime threads
        let pool = tokio::task::spawn_blocking(move || Self::open_pool(&config)).await??;
        self.pool = Some(pool);
        Ok(())
    }

    async fn insert(&self, record: &LogRecord) -> Result<(), SinkError> {
        let pool = self.pool.clone().ok_or(SinkError::NotConnected)?;
        let row = NewApiLog::from(record);

        tokio::task::spawn_blocking(move || -> Result<(), SinkError> {
            let mut conn = pool.get()?;
            diesel::insert_into(api_logs::table).values(&row).execute(&mut conn)?;
            Ok(())
        }).await?
    }
}
