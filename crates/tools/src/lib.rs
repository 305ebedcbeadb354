//! Operator tooling behind the `atelier-admin` binary.

pub mod check;
pub mod seed;
