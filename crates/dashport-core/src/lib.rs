//! Dashport Core — domain models, repository traits, the identity
//! provider contract and the shared error type.
//!
//! This crate performs no I/O. Storage lives in `dashport-db`, business
//! rules in `dashport-access` and `dashport-embed`.

pub mod error;
pub mod identity;
pub mod models;
pub mod repository;

pub use error::{DashportError, DashportResult};
