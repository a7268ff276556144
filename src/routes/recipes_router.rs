use std::sync::Arc;

use axum::{ middleware::from_fn_with_state, routing::{ delete, get, post }, Router };

use crate::{ handlers::recipe_handlers::*, middleware::auth::auth, AppState };

pub fn recipe_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let protected = Router::new()
        .route("/recipes", post(create_recipe))
        .route("/recipes/{id}", delete(delete_recipe))
        .route_layer(from_fn_with_state(state, auth));

    Router::new().route("/recipes/{id}", get(get_recipe)).merge(protected)
}
