use axum::{ routing::get, Router };
use std::sync::Arc;
use crate::{ AppState, handlers::general_handlers::* };

pub fn general_routes() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check)).fallback(handler_404)
}
