//! Dashport Server — the HTTP surface of the portal.
//!
//! Wires the access and embed services into an axum router, resolves
//! sessions from the identity provider and applies the page gate.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod session;
pub mod state;

pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use router::router;
pub use state::AppState;
