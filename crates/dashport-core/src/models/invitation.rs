//! Invitation domain model.
//!
//! An invitation is created by an administrator, consumed exactly once
//! and never mutated otherwise. Expiry is derived from `expires_at`;
//! nothing ever writes an "expired" state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::group::Group;
use super::profile::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub group_id: Option<Uuid>,
    pub invited_by: Uuid,
    /// 64 hex characters (32 random bytes).
    #[serde(skip_serializing)]
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle state of an invitation at a given instant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Created,
    Expired,
    Accepted,
}

impl Invitation {
    pub fn status_at(&self, now: DateTime<Utc>) -> InvitationStatus {
        if self.used_at.is_some() {
            InvitationStatus::Accepted
        } else if now > self.expires_at {
            InvitationStatus::Expired
        } else {
            InvitationStatus::Created
        }
    }

    pub fn status(&self) -> InvitationStatus {
        self.status_at(Utc::now())
    }

    pub fn is_expired(&self) -> bool {
        self.status() == InvitationStatus::Expired
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInvitation {
    pub email: String,
    pub role: Role,
    pub group_id: Option<Uuid>,
    pub invited_by: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of a token lookup: the invitation, its group and whether it
/// can still be accepted.
#[derive(Debug, Clone, Serialize)]
pub struct InvitationLookup {
    pub invitation: Invitation,
    pub group: Option<Group>,
    pub status: InvitationStatus,
}
