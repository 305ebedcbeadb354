//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- the signed-in user, from the session cookie or a Bearer token.
//! - [`auth::OptionalUser`] -- same, but anonymous callers are allowed.
//! - [`rbac::RequireAdmin`] -- requires the `admin` role.

pub mod auth;
pub mod rbac;
