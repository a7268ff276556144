use std::sync::Arc;

use axum::Router;

use crate::AppState;

pub mod general_router;
pub mod recipes_router;

use general_router::general_routes;
use recipes_router::recipe_routes;

/// Main application router assembly function
pub fn create_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .nest("/v1", recipe_routes(state))
        .merge(general_routes())
}
