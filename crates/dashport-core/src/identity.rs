//! Identity provider contract.
//!
//! The identity provider owns credentials, magic-link delivery and
//! session tokens. Dashport only consumes the operations below.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DashportResult;
use crate::models::profile::Role;

/// A verified identity as reported by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
}

/// Session issued after a successful code exchange.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Lifetime of `access_token` in seconds.
    pub expires_in: Option<u64>,
    pub user: Identity,
}

/// Metadata attached to an invite email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteMetadata {
    pub role: Role,
    pub group_id: Option<Uuid>,
    pub group_name: Option<String>,
    pub invited_by: String,
}

#[derive(Debug, Clone)]
pub struct InviteRequest {
    pub email: String,
    pub metadata: InviteMetadata,
    /// Link target embedded in the email; carries the invitation token.
    pub redirect_to: String,
}

/// Identity provisioned by an invite, when the provider reports one.
#[derive(Debug, Clone, Default)]
pub struct InvitedIdentity {
    pub id: Option<Uuid>,
}

pub trait IdentityProvider: Send + Sync {
    /// Start a magic-link login for an existing user.
    fn send_magic_link(
        &self,
        email: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> impl Future<Output = DashportResult<()>> + Send;

    /// Exchange the code from a followed magic link for a session.
    fn exchange_code(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> impl Future<Output = DashportResult<AuthSession>> + Send;

    /// Verify a session token. Rejected tokens yield `Unauthenticated`.
    fn get_user(&self, access_token: &str) -> impl Future<Output = DashportResult<Identity>> + Send;

    /// Dispatch an invite email through the provider's admin API.
    fn invite_user_by_email(
        &self,
        request: InviteRequest,
    ) -> impl Future<Output = DashportResult<InvitedIdentity>> + Send;

    fn sign_out(&self, access_token: &str) -> impl Future<Output = DashportResult<()>> + Send;
}
