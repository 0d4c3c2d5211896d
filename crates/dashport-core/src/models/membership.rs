//! Group membership domain model.
//!
//! A membership row is either *pending* (reserved for an invitation,
//! `user_id` unset, `pending_user_id` set, inactive) or *active*
//! (`user_id` set, active, not deleted). Removal is a soft delete so
//! that membership history is retained.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Option<Uuid>,
    /// Invitation id this row was reserved for.
    pub pending_user_id: Option<Uuid>,
    pub is_admin: bool,
    pub is_active: bool,
    pub is_deleted: bool,
    pub joined_at: DateTime<Utc>,
}

/// Derived lifecycle state of a membership row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MembershipState {
    Pending,
    Active,
    Inactive,
    Deleted,
}

impl GroupMember {
    pub fn state(&self) -> MembershipState {
        if self.is_deleted {
            MembershipState::Deleted
        } else if self.is_active && self.user_id.is_some() {
            MembershipState::Active
        } else if self.user_id.is_none() && self.pending_user_id.is_some() {
            MembershipState::Pending
        } else {
            MembershipState::Inactive
        }
    }

    /// True when this row grants dashboard access.
    pub fn grants_access(&self) -> bool {
        self.state() == MembershipState::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMembership {
    pub group_id: Uuid,
    pub user_id: Option<Uuid>,
    pub pending_user_id: Option<Uuid>,
    pub is_admin: bool,
    pub is_active: bool,
}

impl CreateMembership {
    /// Active row bound to a known user.
    pub fn active(group_id: Uuid, user_id: Uuid, is_admin: bool) -> Self {
        Self {
            group_id,
            user_id: Some(user_id),
            pending_user_id: None,
            is_admin,
            is_active: true,
        }
    }

    /// Inactive seat reserved for an invitation.
    pub fn pending(group_id: Uuid, invitation_id: Uuid, is_admin: bool) -> Self {
        Self {
            group_id,
            user_id: None,
            pending_user_id: Some(invitation_id),
            is_admin,
            is_active: false,
        }
    }
}
