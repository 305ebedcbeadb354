//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches

pub mod account;
pub mod asset;
pub mod category;
pub mod component;
pub mod component_version;
pub mod license;
pub mod magic_link;
pub mod session;
pub mod stripe_event;
pub mod subcategory;
pub mod user;
