//! Access-layer configuration.

/// What the acceptance saga does when the membership step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MembershipPolicy {
    /// Record the failure and keep going; the invitation is still
    /// consumed.
    #[default]
    BestEffort,
    /// Abort acceptance before the invitation is marked used.
    Required,
}

/// Configuration for the invitation lifecycle.
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Public base URL; invitation links point at `{site_url}/accept-invite`.
    pub site_url: String,
    /// Invitation lifetime in days (default: 7).
    pub invitation_ttl_days: i64,
    pub membership_policy: MembershipPolicy,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            site_url: "http://localhost:3000".into(),
            invitation_ttl_days: 7,
            membership_policy: MembershipPolicy::BestEffort,
        }
    }
}

impl AccessConfig {
    /// Link embedded in the invite email.
    pub fn accept_invite_url(&self, token: &str) -> String {
        format!(
            "{}/accept-invite?token={token}",
            self.site_url.trim_end_matches('/')
        )
    }

    /// Where the magic link sends the browser back to.
    pub fn auth_callback_url(&self) -> String {
        format!("{}/auth/callback", self.site_url.trim_end_matches('/'))
    }
}

/// Identity provider (GoTrue-compatible) endpoint and keys.
#[derive(Debug, Clone)]
pub struct GoTrueConfig {
    /// Base URL, e.g. `https://project.supabase.co`.
    pub url: String,
    /// Public key sent with user-scoped calls.
    pub anon_key: String,
    /// Service key for admin calls (invites).
    pub service_key: String,
}
