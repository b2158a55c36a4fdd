//! Infrastructure adapters for external systems.

pub mod gateway;
pub mod simulated;
pub mod sqlite;
