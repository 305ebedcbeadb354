//! Domain types and pure rules shared by every Atelier crate.
//!
//! Nothing in here touches the network, the filesystem, or the database.

pub mod catalog;
pub mod error;
pub mod hashing;
pub mod license;
pub mod roles;
pub mod search;
pub mod stripe_signature;
pub mod tier;
pub mod types;
pub mod upload;
