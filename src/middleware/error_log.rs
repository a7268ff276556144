use std::{ any::Any, sync::Arc };

use axum::{ extract::{ Request, State }, middleware::Next, response::{ IntoResponse, Response } };

use crate::{ errors::{ ErrorMessage, HttpError }, AppState };

const ORIGIN: &str = "HttpError";

/// Logs every `HttpError` a handler or an inner middleware turned into a response, with
/// the response status and, when there is one, the trace.
pub async fn log_errors(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    if let Some(error) = response.extensions().get::<HttpError>() {
        state.logger.error(
            error.message.as_str(),
            Some(ORIGIN),
            Some(error.status.as_u16()),
            error.trace.as_deref()
        );
    }

    response
}

/// Response for a handler that panicked. The panic payload becomes the trace.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    HttpError::server_error(ErrorMessage::InternalServerError.to_string())
        .with_trace(format!("panicked: {}", detail))
        .into_response()
}
