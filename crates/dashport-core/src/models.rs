//! Domain models for dashport.
//!
//! These are the core types shared across all crates. The store owns
//! every entity; services only ever hold transient copies.

pub mod dashboard;
pub mod group;
pub mod invitation;
pub mod membership;
pub mod profile;
