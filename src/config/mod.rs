pub mod logging;
pub mod sink;

use std::{ env, fmt::Display, net::SocketAddr, str::FromStr };

use thiserror::Error;

pub use sink::{ PostgresConfig, RedisConfig, SinkConfig, SinkKind };

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable not found: {0}")] MissingEnv(String),

    #[error("Configuration error: {0}")] Config(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Config(format!("Invalid APP_HOST/APP_PORT: {}", e)))
    }
}

#[derive(Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub sink: SinkConfig,
    pub jwt_secret: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("server", &self.server)
            .field("sink", &self.sink)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&(|key: &str| env::var(key).ok()))
    }

    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
        where F: Fn(&str) -> Option<String>
    {
        let jwt_secret = lookup("JWT_SECRET").ok_or_else(||
            ConfigError::MissingEnv("JWT_SECRET".into())
        )?;
        if jwt_secret.trim().is_empty() {
            return Err(ConfigError::Config("JWT_SECRET cannot be empty".into()));
        }

        Ok(Self {
            server: ServerConfig {
                host: env_or(lookup, "APP_HOST", "0.0.0.0"),
                port: parse_env(lookup, "APP_PORT", 3000)?,
                environment: env_or(lookup, "ENVIRONMENT", "development"),
            },
            sink: SinkConfig::from_lookup(lookup)?,
            jwt_secret,
        })
    }
}

pub(crate) fn env_or<F>(lookup: &F, key: &str, default: &str) -> String
    where F: Fn(&str) -> Option<String>
{
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

pub(crate) fn parse_env<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
    where F: Fn(&str) -> Option<String>, T: FromStr, T::Err: Display
{
    match lookup(key).filter(|value| !value.trim().is_empty()) {
        Some(value) =>
            value
                .trim()
                .parse()
                .map_err(|e| ConfigError::Config(format!("Failed to parse {}: {}", key, e))),
        None => Ok(default),
    }
}
