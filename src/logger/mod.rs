// Logger facade used by handlers and services. It only knows how to build a record and
// hand it to the sink worker; which store ends up persisting it is decided at startup.

pub mod record;

use std::{ collections::BTreeMap, fmt };

use serde::{ Deserialize, Serialize };
use serde_json::{ Map, Value };
use tokio::sync::{ mpsc::{ self, error::TrySendError }, watch };
use tracing::{ error, warn };

use crate::sink::SinkState;

pub use record::LogRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Log,
    Warn,
    Error,
    Debug,
    Verbose,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Log => "log",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Debug => "debug",
            LogLevel::Verbose => "verbose",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Message payload in the string form every sink stores.
///
/// Plain strings are kept verbatim. Structured payloads are serialized to compact JSON
/// with object keys sorted at every level, so the same value always yields the same
/// string. A JSON string value is unwrapped rather than quoted, which makes re-logging an
/// already stored message a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage(String);

impl LogMessage {
    pub fn structured<T: Serialize + ?Sized>(payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(value) => Self::from(value),
            Err(e) => Self(format!("<unserializable message: {}>", e)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for LogMessage {
    fn from(message: &str) -> Self {
        Self(message.to_owned())
    }
}

impl From<String> for LogMessage {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&String> for LogMessage {
    fn from(message: &String) -> Self {
        Self(message.clone())
    }
}

impl From<Value> for LogMessage {
    fn from(value: Value) -> Self {
        match value {
            Value::String(message) => Self(message),
            other => Self(canonicalize(other).to_string()),
        }
    }
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .into_iter()
                .map(|(key, value)| (key, canonicalize(value)))
                .collect();
            Value::Object(sorted.into_iter().collect::<Map<String, Value>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Fire-and-forget logger handed to application code.
///
/// Every method returns immediately. Records are pushed into a bounded buffer drained by
/// the sink worker; when the buffer is full or the worker is gone the record is dropped
/// and the drop is reported on the operational console instead.
#[derive(Debug, Clone)]
pub struct AppLogger {
    sender: mpsc::Sender<LogRecord>,
    state: watch::Receiver<SinkState>,
}

impl AppLogger {
    pub(crate) fn new(sender: mpsc::Sender<LogRecord>, state: watch::Receiver<SinkState>) -> Self {
        Self { sender, state }
    }

    pub fn log(&self, message: impl Into<LogMessage>, origin: Option<&str>, status_code: Option<u16>) {
        self.emit(LogLevel::Log, message.into(), origin, status_code, None);
    }

    pub fn warn(&self, message: impl Into<LogMessage>, origin: Option<&str>, status_code: Option<u16>) {
        self.emit(LogLevel::Warn, message.into(), origin, status_code, None);
    }

    pub fn error(
        &self,
        message: impl Into<LogMessage>,
        origin: Option<&str>,
        status_code: Option<u16>,
        trace: Option<&str>
    ) {
        self.emit(LogLevel::Error, message.into(), origin, status_code, trace);
    }

    pub fn debug(&self, message: impl Into<LogMessage>, origin: Option<&str>, status_code: Option<u16>) {
        self.emit(LogLevel::Debug, message.into(), origin, status_code, None);
    }

    pub fn verbose(
        &self,
        message: impl Into<LogMessage>,
        origin: Option<&str>,
        status_code: Option<u16>
    ) {
        self.emit(LogLevel::Verbose, message.into(), origin, status_code, None);
    }

    pub fn state(&self) -> SinkState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SinkState> {
        self.state.clone()
    }

    /// Waits until the sink has either connected or given up, and returns which. Records
    /// logged before then are dropped.
    pub async fn wait_until_settled(&self) -> SinkState {
        let mut state = self.state.clone();
        let settled = match
            state.wait_for(|s| matches!(s, SinkState::Connected | SinkState::Failed)).await
        {
            Ok(current) => *current,
            Err(_) => *self.state.borrow(),
        };
        settled
    }

    fn emit(
        &self,
        level: LogLevel,
        message: LogMessage,
        origin: Option<&str>,
        status_code: Option<u16>,
        trace: Option<&str>
    ) {
        // the context is read here, in the caller's task; the worker has none
        let record = LogRecord::capture(level, message, origin, status_code, trace);

        match self.sender.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                warn!(
                    record_id = %record.id(),
                    level = %record.level(),
                    "Log buffer is full, dropping record"
                );
            }
            Err(TrySendError::Closed(record)) => {
                error!(
                    record_id = %record.id(),
                    level = %record.level(),
                    "Log sink worker is not running, dropping record"
                );
            }
        }
    }
}
