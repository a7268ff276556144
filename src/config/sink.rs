use std::{ str::FromStr, time::Duration };

use super::{ env_or, parse_env, ConfigError };
use crate::sink::RetryPolicy;

pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Postgres,
    Redis,
    Memory,
    Noop,
}

impl FromStr for SinkKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(SinkKind::Postgres),
            "redis" => Ok(SinkKind::Redis),
            "memory" => Ok(SinkKind::Memory),
            "none" | "noop" => Ok(SinkKind::Noop),
            other => Err(ConfigError::Config(format!("Unknown LOG_SINK value: {}", other))),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub pool_size: u32,
}

impl PostgresConfig {
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user,
            self.password,
            self.host,
            self.port,
            self.database
        )
    }
}

// keeps the password out of the console
impl std::fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("database", &self.database)
            .field("pool_size", &self.pool_size)
            .finish()
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5432,
            user: "neto".into(),
            password: "neto".into(),
            database: "recipe_logs_db".into(),
            pool_size: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    pub url: String,
    pub keyspace: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".into(),
            keyspace: "recipe_logs".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    pub kind: SinkKind,
    pub postgres: PostgresConfig,
    pub redis: RedisConfig,
    pub retry: RetryPolicy,
    pub buffer_capacity: usize,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::Postgres,
            postgres: PostgresConfig::default(),
            redis: RedisConfig::default(),
            retry: RetryPolicy::default(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

/// Raw sink settings as read from the environment, before validation.
#[derive(Debug, Clone)]
pub struct RawSinkConfig {
    pub kind: String,
    pub postgres: PostgresConfig,
    pub redis: RedisConfig,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub reconnect_interval_ms: u64,
    pub buffer_capacity: usize,
}

impl RawSinkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.postgres.host.trim().is_empty() {
            return Err(ConfigError::Config("POSTGRES_HOST cannot be empty".into()));
        }
        if self.postgres.database.trim().is_empty() {
            return Err(ConfigError::Config("POSTGRES_DB cannot be empty".into()));
        }
        if self.postgres.pool_size == 0 {
            return Err(ConfigError::Config("POSTGRES_POOL_SIZE must be greater than zero".into()));
        }
        if self.redis.url.trim().is_empty() {
            return Err(ConfigError::Config("REDIS_URL cannot be empty".into()));
        }
        if self.redis.keyspace.trim().is_empty() {
            return Err(ConfigError::Config("LOG_KEYSPACE cannot be empty".into()));
        }
        if self.max_retries == 0 {
            return Err(ConfigError::Config("LOG_SINK_MAX_RETRIES must be greater than zero".into()));
        }
        if self.buffer_capacity == 0 {
            return Err(ConfigError::Config("LOG_BUFFER_CAPACITY must be greater than zero".into()));
        }

        Ok(())
    }
}

impl SinkConfig {
    pub fn from_raw(raw: RawSinkConfig) -> Result<Self, ConfigError> {
        raw.validate()?;

        Ok(Self {
            kind: raw.kind.parse()?,
            postgres: raw.postgres,
            redis: raw.redis,
            retry: RetryPolicy {
                max_attempts: raw.max_retries,
                backoff: Duration::from_millis(raw.retry_delay_ms),
                reconnect_interval: Duration::from_millis(raw.reconnect_interval_ms),
            },
            buffer_capacity: raw.buffer_capacity,
        })
    }

    /// Reads sink settings through `lookup`, falling back to local development defaults.
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
        where F: Fn(&str) -> Option<String>
    {
        let defaults = SinkConfig::default();

        let raw = RawSinkConfig {
            kind: env_or(lookup, "LOG_SINK", "postgres"),
            postgres: PostgresConfig {
                host: env_or(lookup, "POSTGRES_HOST", &defaults.postgres.host),
                port: parse_env(lookup, "POSTGRES_PORT", defaults.postgres.port)?,
                user: env_or(lookup, "POSTGRES_USER", &defaults.postgres.user),
                password: env_or(lookup, "POSTGRES_PASSWORD", &defaults.postgres.password),
                database: env_or(lookup, "POSTGRES_DB", &defaults.postgres.database),
                pool_size: parse_env(lookup, "POSTGRES_POOL_SIZE", defaults.postgres.pool_size)?,
            },
            redis: RedisConfig {
                url: env_or(lookup, "REDIS_URL", &defaults.redis.url),
                keyspace: env_or(lookup, "LOG_KEYSPACE", &defaults.redis.keyspace),
            },
            max_retries: parse_env(lookup, "LOG_SINK_MAX_RETRIES", defaults.retry.max_attempts)?,
            retry_delay_ms: parse_env(
                lookup,
                "LOG_SINK_RETRY_DELAY_MS",
                defaults.retry.backoff.as_millis() as u64
            )?,
            reconnect_interval_ms: parse_env(
                lookup,
                "LOG_SINK_RECONNECT_INTERVAL_MS",
                defaults.retry.reconnect_interval.as_millis() as u64
            )?,
            buffer_capacity: parse_env(lookup, "LOG_BUFFER_CAPACITY", DEFAULT_BUFFER_CAPACITY)?,
        };

        SinkConfig::from_raw(raw)
    }
}
