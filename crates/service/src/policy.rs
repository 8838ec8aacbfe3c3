//! Write authorization: admins may touch anything, everyone else only what
//! they own. Anonymous callers may touch nothing.

use models::Principal;

use crate::errors::ServiceError;

pub fn allow(principal: Option<&Principal>, owner_id: &str) -> bool {
    match principal {
        Some(p) => p.is_admin || (!p.id.is_empty() && p.id == owner_id),
        None => false,
    }
}

/// [`allow`] as a `Result`, naming the collection in the error.
pub fn authorize(principal: Option<&Principal>, owner_id: &str, collection: &str) -> Result<(), ServiceError> {
    if allow(principal, owner_id) {
        return Ok(());
    }
    match principal {
        None => Err(ServiceError::Unauthorized(format!("login required to modify this {collection}"))),
        Some(_) => Err(ServiceError::Unauthorized(format!("not your {collection}"))),
    }
}
