// Library entry point - request-scoped context and durable structured logging for the
// recipes API

pub mod config;
pub mod context;
pub mod dto;
pub mod errors;
pub mod handlers;
pub mod logger;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod sink;
pub mod utils;

#[cfg(test)]
mod tests;

// Re-export commonly used types for convenience
pub use config::{ Config, ConfigError };
pub use context::{ ContextField, RequestContext };
pub use errors::{ ErrorMessage, HttpError };
pub use logger::{ AppLogger, LogLevel, LogMessage, LogRecord };
pub use sink::{ LogStore, SinkError, SinkState };

use std::sync::Arc;

use axum::{ middleware::{ from_fn, from_fn_with_state }, Router };
use tokio::task::JoinHandle;
use tower_http::{ catch_panic::CatchPanicLayer, trace::TraceLayer };

use crate::{
    middleware::{ error_log::{ log_errors, panic_response }, request_context::request_context },
    services::recipe_service::RecipeService,
};

pub struct AppState {
    pub config: Config,
    pub logger: AppLogger,
    pub recipes: RecipeService,
}

impl AppState {
    pub fn new(config: Config, logger: AppLogger) -> Self {
        Self {
            recipes: RecipeService::new(logger.clone()),
            config,
            logger,
        }
    }
}

/// Create the complete application router.
///
/// Layer order, outermost first: request context, HTTP tracing, error logging, panic
/// recovery. Everything below the first layer runs inside the request's context.
pub fn create_app(state: Arc<AppState>) -> Router {
    routes::create_router(state.clone())
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn_with_state(state.clone(), log_errors))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(request_context))
        .with_state(state)
}

/// Wires configuration, the log sink worker and the router together.
///
/// The returned handle finishes once every clone of the state's logger is dropped and the
/// queued records have been written.
pub fn initialize_app(config: Config) -> (Router, Arc<AppState>, JoinHandle<()>) {
    let store = sink::build_store(&config.sink);
    let (logger, worker) = sink::spawn_logger(
        store,
        config.sink.retry,
        config.sink.buffer_capacity
    );

    let state = Arc::new(AppState::new(config, logger));
    (create_app(state.clone()), state, worker)
}
