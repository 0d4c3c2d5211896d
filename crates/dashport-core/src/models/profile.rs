//! Profile domain model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Global role carried on a profile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    GroupAdmin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::GroupAdmin => "group_admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    /// Invitations for this role must name a target group.
    pub fn requires_group(&self) -> bool {
        matches!(self, Role::GroupAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "group_admin" => Ok(Role::GroupAdmin),
            "super_admin" => Ok(Role::SuperAdmin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// One profile per identity-provider user. The id is the identity
/// provider's user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Minimal stand-in used when the identity exists but its profile
    /// row has not been persisted yet.
    pub fn synthesized(id: Uuid, email: &str) -> Self {
        let now = Utc::now();
        Self {
            id,
            email: email.to_string(),
            full_name: Some(email.to_string()),
            role: Role::User,
            email_verified: false,
            created_at: now,
            updated_at: now,
            last_sign_in_at: None,
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    /// Name shown to invitees: full name, then email.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// Fields written when an identity signs in for the first time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsureProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateProfile {
    /// `Some(Some(val))` = set, `Some(None)` = clear, `None` = no change.
    pub full_name: Option<Option<String>>,
    pub role: Option<Role>,
    pub email_verified: Option<bool>,
}
