// Durable log sinks and the background worker that feeds them

pub mod memory;
pub mod relational;
pub mod wide_column;
pub mod worker;

use async_trait::async_trait;
use diesel::result::{ DatabaseErrorKind, Error as DieselError };
use thiserror::Error;

use crate::{ config::sink::{ SinkConfig, SinkKind }, logger::LogRecord };

pub use memory::{ MemoryLogStore, NoopLogStore };
pub use relational::PostgresLogStore;
pub use wide_column::RedisLogStore;
pub use worker::{ spawn_logger, RetryPolicy, SinkWorker };

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Sink is not connected")]
    NotConnected,

    #[error("Connection failed: {0}")] Connection(String),

    #[error("Write failed: {0}")] Write(String),

    #[error("Migration failed: {0}")] Migration(String),

    #[error("Database error: {0}")] Diesel(#[from] DieselError),

    #[error("Connection pool error: {0}")] Pool(#[from] diesel::r2d2::PoolError),

    #[error("Redis error: {0}")] Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")] Serialize(#[from] serde_json::Error),

    #[error("Blocking task failed: {0}")] Join(#[from] tokio::task::JoinError),
}

impl SinkError {
    /// Whether the failure means the connection itself is gone, as opposed to a single
    /// bad write.
    pub fn is_connection(&self) -> bool {
        match self {
            SinkError::NotConnected | SinkError::Connection(_) | SinkError::Pool(_) => true,
            SinkError::Diesel(DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _)) =>
                true,
            SinkError::Diesel(DieselError::BrokenTransactionManager) => true,
            SinkError::Redis(e) =>
                e.is_io_error() ||
                e.is_connection_dropped() ||
                e.is_connection_refusal() ||
                e.is_timeout(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    Disconnected,
    Connecting,
    Connected,
    /// Startup retries were exhausted; the sink stays disabled for the process lifetime.
    Failed,
}

impl std::fmt::Display for SinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SinkState::Disconnected => "disconnected",
            SinkState::Connecting => "connecting",
            SinkState::Connected => "connected",
            SinkState::Failed => "failed",
        })
    }
}

/// A durable store the sink worker can write records into.
#[async_trait]
pub trait LogStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Opens (or reopens) the connection to the store.
    async fn connect(&mut self) -> Result<(), SinkError>;

    /// Persists one record.
    async fn insert(&self, record: &LogRecord) -> Result<(), SinkError>;
}

/// Builds the store selected by configuration. Call sites never see which one it is.
pub fn build_store(config: &SinkConfig) -> Box<dyn LogStore> {
    match config.kind {
        SinkKind::Postgres => Box::new(PostgresLogStore::new(config.postgres.clone())),
        SinkKind::Redis => Box::new(RedisLogStore::new(config.redis.clone())),
        SinkKind::Memory => Box::new(MemoryLogStore::new()),
        SinkKind::Noop => Box::new(NoopLogStore),
    }
}
