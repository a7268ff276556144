use chrono::{ DateTime, Utc };
use serde::Serialize;
use uuid::Uuid;

use crate::context::{ self, RequestContext };
use super::{ LogLevel, LogMessage };

/// One durable log entry: the call's explicit arguments plus a snapshot of the
/// request context as it was when the call was made.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    id: Uuid,
    level: LogLevel,
    message: String,
    origin_tag: Option<String>,
    status_code: Option<i32>,
    trace: Option<String>,
    created_at: DateTime<Utc>,
    context: RequestContext,
}

impl LogRecord {
    /// Builds a record from the ambient request context of the calling task.
    pub fn capture(
        level: LogLevel,
        message: LogMessage,
        origin_tag: Option<&str>,
        status_code: Option<u16>,
        trace: Option<&str>
    ) -> Self {
        Self::with_context(
            level,
            message,
            origin_tag,
            status_code,
            trace,
            context::current().unwrap_or_default()
        )
    }

    pub fn with_context(
        level: LogLevel,
        message: LogMessage,
        origin_tag: Option<&str>,
        status_code: Option<u16>,
        trace: Option<&str>,
        context: RequestContext
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            message: message.into_string(),
            origin_tag: origin_tag.map(str::to_owned),
            status_code: status_code.map(i32::from),
            // only error records carry a stack
            trace: trace.filter(|_| level == LogLevel::Error).map(str::to_owned),
            created_at: Utc::now(),
            context,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn origin_tag(&self) -> Option<&str> {
        self.origin_tag.as_deref()
    }

    pub fn status_code(&self) -> Option<i32> {
        self.status_code
    }

    pub fn trace(&self) -> Option<&str> {
        self.trace.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn is_error(&self) -> bool {
        self.level == LogLevel::Error
    }
}
