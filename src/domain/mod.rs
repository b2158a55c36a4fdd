//! Domain layer for the NFT migration workflow
//!
//! This module contains the workflow state model, typed phase results and the
//! ports the services depend on.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
