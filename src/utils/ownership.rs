// Resource ownership checks. One predicate, configured per resource with a selector for
// the owner field.

use axum::http::StatusCode;
use serde_json::json;

use crate::{ errors::{ ErrorMessage, HttpError }, logger::AppLogger };

const ORIGIN: &str = "OwnershipCheck";

pub fn is_owner<R, F>(resource: &R, owner_of: F, user_id: &str) -> bool
    where F: Fn(&R) -> Option<&str>
{
    matches!(owner_of(resource), Some(owner) if owner == user_id)
}

/// Caller identity as far as ownership is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub is_super_user: bool,
}

/// Lets super users through, otherwise requires `caller` to own `resource`.
/// Every outcome is logged.
pub fn ensure_owner<R, F>(
    logger: &AppLogger,
    resource: &R,
    resource_id: &str,
    owner_of: F,
    caller: &Caller
) -> Result<(), HttpError>
    where F: Fn(&R) -> Option<&str>
{
    if caller.is_super_user {
        return Ok(());
    }

    if !is_owner(resource, &owner_of, &caller.user_id) {
        logger.warn(
            json!({
                "message": "Access denied. User attempted to access an unowned resource.",
                "attemptedBy": caller.user_id,
                "resourceId": resource_id,
                "ownerId": owner_of(resource),
            }),
            Some(ORIGIN),
            Some(StatusCode::FORBIDDEN.as_u16())
        );
        return Err(HttpError::forbidden(ErrorMessage::ResourceOwnershipDenied.to_string()));
    }

    logger.verbose(
        json!({
            "message": "Ownership check passed successfully.",
            "resourceId": resource_id,
            "userId": caller.user_id,
        }),
        Some(ORIGIN),
        Some(StatusCode::OK.as_u16())
    );

    Ok(())
}
