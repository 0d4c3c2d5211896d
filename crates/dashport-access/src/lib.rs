//! Dashport Access — who may do what, and how invited users become
//! members.
//!
//! The [`AccessResolver`] answers every authorization question from
//! stored profile and membership rows. The [`InvitationService`] runs
//! the invitation lifecycle, and [`AdminService`] the gated
//! administrative operations. [`GoTrueClient`] talks to the identity
//! provider over HTTP.

pub mod admin;
pub mod config;
pub mod error;
pub mod gate;
pub mod gotrue;
pub mod invitation;
pub mod resolver;
pub mod token;

pub use admin::{AdminService, UserWithMemberships};
pub use config::{AccessConfig, GoTrueConfig, MembershipPolicy};
pub use error::IdentityError;
pub use gate::{GateDecision, SessionState};
pub use gotrue::GoTrueClient;
pub use invitation::{AcceptanceReport, InvitationService, NewInvitation, StepOutcome};
pub use resolver::AccessResolver;
