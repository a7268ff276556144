use chrono::{ DateTime, Utc };
use diesel::prelude::*;
use uuid::Uuid;

use crate::{ logger::LogRecord, schema::api_logs };

/// One row of `api_logs`. Context fields are stored as individual columns; the origin
/// tag goes into the `context` column.
#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = api_logs)]
pub struct NewApiLog {
    pub id: Uuid,
    pub level: String,
    pub message: String,
    pub context: Option<String>,
    pub created_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub host: Option<String>,
    pub full_url: Option<String>,
    pub path: Option<String>,
    pub http_method: Option<String>,
    pub status_code: Option<i32>,
    pub protocol: Option<String>,
    pub user_id: Option<String>,
    pub trace: Option<String>,
}

impl From<&LogRecord> for NewApiLog {
    fn from(record: &LogRecord) -> Self {
        let ctx = record.context().clone();

        Self {
            id: record.id(),
            level: record.level().as_str().to_string(),
            message: record.message().to_string(),
            context: record.origin_tag().map(str::to_owned),
            created_at: record.created_at(),
            ip_address: ctx.ip_address,
            host: ctx.host,
            full_url: ctx.full_url,
            path: ctx.path,
            http_method: ctx.http_method,
            status_code: record.status_code(),
            protocol: ctx.protocol,
            user_id: ctx.user_id,
            trace: record.trace().map(str::to_owned),
        }
    }
}
