// Wide-column sink: every record is its own Redis hash, partitioned by the record id

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use serde_json::Value;

use super::{ LogStore, SinkError };
use crate::{ config::RedisConfig, logger::LogRecord, utils::flatten::flatten_object };

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub const LOGS_TABLE: &str = "api_logs";
pub const ERRORS_TABLE: &str = "api_errors";

pub struct RedisLogStore {
    config: RedisConfig,
    connection: Option<MultiplexedConnection>,
}

impl RedisLogStore {
    pub fn new(config: RedisConfig) -> Self {
        Self { config, connection: None }
    }

    pub fn record_key(&self, record: &LogRecord) -> String {
        format!("{}:{}:{}", self.config.keyspace, table_for(record), record.id())
    }

    pub fn index_key(&self, table: &str) -> String {
        format!("{}:{}:by_time", self.config.keyspace, table)
    }
}

/// Errors and regular logs are kept apart, the same split the relational shape leaves to
/// a `level` filter.
pub fn table_for(record: &LogRecord) -> &'static str {
    if record.is_error() { ERRORS_TABLE } else { LOGS_TABLE }
}

/// Flattens a record into hash fields. Nested context fields become `context.<name>`,
/// absent values produce no field at all.
pub fn columns(record: &LogRecord) -> Result<Vec<(String, String)>, SinkError> {
    let Value::Object(object) = serde_json::to_value(record)? else {
        return Err(SinkError::Write("log record did not serialize to an object".into()));
    };

    Ok(
        flatten_object(&object)
            .into_iter()
            .filter_map(|(field, value)| {
                match value {
                    Value::Null => None,
                    Value::String(text) => Some((field, text)),
                    other => Some((field, other.to_string())),
                }
            })
            .collect()
    )
}

#[async_trait]
impl LogStore for RedisLogStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn connect(&mut self) -> Result<(), SinkError> {
        let client = redis::Client::open(self.config.url.as_str())?;

        let mut connection = tokio::time
            ::timeout(CONNECT_TIMEOUT, client.get_multiplexed_async_connection()).await
            .map_err(|_| SinkError::Connection("timed out connecting to redis".into()))??;

        let _: String = redis::cmd("PING").query_async(&mut connection).await?;

        self.connection = Some(connection);
        Ok(())
    }

    async fn insert(&self, record: &LogRecord) -> Result<(), SinkError> {
        let mut connection = self.connection.clone().ok_or(SinkError::NotConnected)?;

        let key = self.record_key(record);
        let index = self.index_key(table_for(record));
        let fields = columns(record)?;

        let _: () = redis
            ::pipe()
            .atomic()
            .hset_multiple(&key, &fields)
            .ignore()
            .zadd(&index, record.id().to_string(), record.created_at().timestamp_millis())
            .ignore()
            .query_async(&mut connection).await?;

        Ok(())
    }
}
