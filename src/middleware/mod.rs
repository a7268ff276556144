pub mod auth;
pub mod error_log;
pub mod request_context;
