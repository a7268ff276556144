/*
Verifies the bearer token of protected routes. On success the caller's id is attached to
the request (for handlers) and written into the request context (for every log record
emitted from here on).
*/

use std::sync::Arc;

use axum::{
    extract::{ Request, State },
    http::header,
    middleware::Next,
    response::Response,
};

use crate::{
    context::{ self, ContextField },
    errors::{ ErrorMessage, HttpError },
    utils::{ ownership::Caller, token },
    AppState,
};

// Attached to requests after successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub is_super_user: bool,
}

impl AuthUser {
    pub fn caller(&self) -> Caller {
        Caller {
            user_id: self.user_id.clone(),
            is_super_user: self.is_super_user,
        }
    }
}

pub async fn auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next
) -> Result<Response, HttpError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|auth_header| auth_header.to_str().ok())
        .and_then(|auth_value| auth_value.strip_prefix("Bearer "))
        .map(str::to_owned);

    // rejections are logged once, by the error logging layer
    let Some(token) = token else {
        return Err(HttpError::unauthorized(ErrorMessage::TokenNotProvided.to_string()));
    };

    let claims = token::decode_token(token, state.config.jwt_secret.as_bytes())?;

    context::set_field(ContextField::UserId, claims.sub.clone());

    req.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
        is_super_user: claims.is_super_user,
    });

    Ok(next.run(req).await)
}
