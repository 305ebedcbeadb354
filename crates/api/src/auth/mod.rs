//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`magic_link`] -- signed, single-use sign-in tokens.
//! - [`session`] -- opaque session tokens and the session cookie.

pub mod magic_link;
pub mod password;
pub mod session;
