//! Well-known user role names stored in `users.role`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

/// Validate a role name coming from an admin update request.
pub fn validate_role(role: &str) -> Result<(), crate::error::CoreError> {
    match role {
        ROLE_ADMIN | ROLE_USER => Ok(()),
        other => Err(crate::error::CoreError::Validation(format!(
            "Unknown role '{other}'. Must be one of: {ROLE_ADMIN}, {ROLE_USER}"
        ))),
    }
}
