//! Atelier API server library.
//!
//! Exposes config, state, error handling and routes so integration tests,
//! the `atelier-admin` tool and the binary entrypoint share them.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod stripe;
pub mod tiers;
pub mod upload;
