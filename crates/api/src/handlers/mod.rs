//! Request handlers.
//!
//! Each submodule holds the async handler functions for one resource.
//! Handlers delegate to the repositories in `atelier_db` and map errors via
//! [`AppError`](crate::error::AppError).

pub mod auth;
pub mod catalog;
pub mod categories;
pub mod components;
pub mod files;
pub mod licenses;
pub mod subcategories;
pub mod users;
pub mod versions;
pub mod webhooks;
