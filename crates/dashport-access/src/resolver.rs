//! Authorization resolver.
//!
//! Derives a user's effective role and per-group admin flags from the
//! stored profile and membership rows. Every privileged operation asks
//! the resolver first; a refusal is an error, never a silent no-op.

use dashport_core::error::{DashportError, DashportResult};
use dashport_core::identity::Identity;
use dashport_core::models::dashboard::Dashboard;
use dashport_core::models::profile::{Profile, Role};
use dashport_core::repository::{
    DashboardRepository, MembershipRepository, PrivilegedStore, ProfileRepository,
};
use tracing::warn;
use uuid::Uuid;

#[derive(Clone)]
pub struct AccessResolver<S: PrivilegedStore> {
    store: S,
}

impl<S: PrivilegedStore> AccessResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The stored profile, or a synthesized `user` profile when the
    /// identity exists but its row has not been written yet.
    pub async fn resolve_profile(&self, identity: &Identity) -> DashportResult<Profile> {
        match self.store.profiles().get_by_id(identity.id).await {
            Ok(profile) => Ok(profile),
            Err(DashportError::NotFound { .. }) => {
                Ok(Profile::synthesized(identity.id, &identity.email))
            }
            Err(e) => Err(e),
        }
    }

    /// Effective global role. A missing profile counts as `user`.
    pub async fn resolve_role(&self, user_id: Uuid) -> DashportResult<Role> {
        match self.store.profiles().get_by_id(user_id).await {
            Ok(profile) => Ok(profile.role),
            Err(DashportError::NotFound { .. }) => Ok(Role::User),
            Err(e) => Err(e),
        }
    }

    /// True if the user holds an active admin membership in any group.
    pub async fn is_group_admin(&self, user_id: Uuid) -> DashportResult<bool> {
        let memberships = self.store.members().list_active_by_user(user_id).await?;
        Ok(memberships.iter().any(|m| m.is_admin && m.grants_access()))
    }

    /// True if the user holds an active admin membership in `group_id`.
    pub async fn is_admin_of_group(&self, user_id: Uuid, group_id: Uuid) -> DashportResult<bool> {
        let current = self.store.members().find_current(group_id, user_id).await?;
        Ok(current.is_some_and(|m| m.is_admin && m.grants_access()))
    }

    /// Groups in which the user holds an active admin membership.
    pub async fn managed_groups(&self, user_id: Uuid) -> DashportResult<Vec<Uuid>> {
        let memberships = self.store.members().list_active_by_user(user_id).await?;
        Ok(memberships
            .into_iter()
            .filter(|m| m.is_admin && m.grants_access())
            .map(|m| m.group_id)
            .collect())
    }

    /// Super admins see every dashboard; everyone else needs an active
    /// membership in the dashboard's group.
    pub async fn can_access_dashboard(
        &self,
        user_id: Uuid,
        dashboard_id: Uuid,
    ) -> DashportResult<bool> {
        let dashboard = self.store.dashboards().get_by_id(dashboard_id).await?;
        self.can_view(user_id, &dashboard).await
    }

    /// Same rule as [`Self::can_access_dashboard`] for an already
    /// loaded dashboard.
    pub async fn can_view(&self, user_id: Uuid, dashboard: &Dashboard) -> DashportResult<bool> {
        if self.resolve_role(user_id).await? == Role::SuperAdmin {
            return Ok(true);
        }
        let current = self
            .store
            .members()
            .find_current(dashboard.group_id, user_id)
            .await?;
        Ok(current.is_some_and(|m| m.grants_access()))
    }

    pub async fn require_super_admin(&self, user_id: Uuid) -> DashportResult<()> {
        if self.resolve_role(user_id).await? == Role::SuperAdmin {
            return Ok(());
        }
        warn!(user_id = %user_id, "Super admin required");
        Err(DashportError::access_denied("super admin required"))
    }

    /// Passes for super admins and for active admins of `group_id`.
    pub async fn require_group_admin_of(&self, user_id: Uuid, group_id: Uuid) -> DashportResult<()> {
        if self.resolve_role(user_id).await? == Role::SuperAdmin
            || self.is_admin_of_group(user_id, group_id).await?
        {
            return Ok(());
        }
        warn!(user_id = %user_id, group_id = %group_id, "Group admin required");
        Err(DashportError::access_denied("not an administrator of this group"))
    }
}
