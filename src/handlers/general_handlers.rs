use std::sync::Arc;

use axum::{ extract::State, Json };
use serde_json::{ json, Value };

use crate::{ errors::{ ErrorMessage, HttpError }, AppState };

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(
        json!({
            "status": "ok",
            "logSink": state.logger.state().to_string(),
        })
    )
}

pub async fn handler_404() -> HttpError {
    HttpError::not_found(ErrorMessage::NotFound.to_string())
}
