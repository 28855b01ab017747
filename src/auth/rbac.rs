/*!
 * # Access Control Gate
 *
 * Two roles exist: `user` and `admin`. Resources owned by a user (orders and
 * their payments) are visible to the owner and to administrators.
 */

use tracing::warn;
use uuid::Uuid;

use super::AuthUser;
use crate::errors::ServiceError;

/// Passes when `user` owns the resource or is an administrator.
pub fn ensure_owner_or_admin(user: &AuthUser, owner_id: Uuid) -> Result<(), ServiceError> {
    if user.user_id == owner_id || user.is_admin() {
        return Ok(());
    }
    warn!(user_id = %user.user_id, %owner_id, "Access denied: not owner");
    Err(ServiceError::Forbidden(
        "Not authorized to access this order".to_string(),
    ))
}

/// Passes only for the resource owner; administrators are not exempt.
pub fn ensure_owner(user: &AuthUser, owner_id: Uuid) -> Result<(), ServiceError> {
    if user.user_id == owner_id {
        return Ok(());
    }
    warn!(user_id = %user.user_id, %owner_id, "Access denied: owner-only operation");
    Err(ServiceError::Forbidden(
        "Not authorized to access this order".to_string(),
    ))
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), ServiceError> {
    if user.is_admin() {
        return Ok(());
    }
    warn!(user_id = %user.user_id, "Access denied: admin required");
    Err(ServiceError::Forbidden("Admin access required".to_string()))
}
