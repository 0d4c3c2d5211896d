//! Administrative operations: groups, members, dashboards, users and
//! the one-time super admin bootstrap. Each operation asks the
//! [`AccessResolver`] before touching the store.

use dashport_core::error::{DashportError, DashportResult};
use dashport_core::models::dashboard::{CreateDashboard, Dashboard, UpdateDashboard};
use dashport_core::models::group::{CreateGroup, Group, UpdateGroup};
use dashport_core::models::membership::{CreateMembership, GroupMember, MembershipState};
use dashport_core::models::profile::{Profile, Role, UpdateProfile};
use dashport_core::repository::{
    DashboardRepository, GroupRepository, MembershipRepository, PaginatedResult, Pagination,
    PrivilegedStore, ProfileRepository,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::resolver::AccessResolver;

/// Page size used when a caller needs every row.
const SCAN_PAGE: u64 = 200;

/// A profile together with its active memberships.
#[derive(Debug, Clone, Serialize)]
pub struct UserWithMemberships {
    #[serde(flatten)]
    pub profile: Profile,
    pub memberships: Vec<GroupMember>,
}

/// An active membership together with the member's profile.
#[derive(Debug, Clone, Serialize)]
pub struct MemberWithProfile {
    #[serde(flatten)]
    pub membership: GroupMember,
    pub profile: Option<Profile>,
}

#[derive(Clone)]
pub struct AdminService<S: PrivilegedStore> {
    store: S,
    resolver: AccessResolver<S>,
}

fn require_text(value: &str, field: &str) -> DashportResult<()> {
    if value.trim().is_empty() {
        return Err(DashportError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

impl<S: PrivilegedStore> AdminService<S> {
    pub fn new(store: S) -> Self {
        Self {
            resolver: AccessResolver::new(store.clone()),
            store,
        }
    }

    pub fn resolver(&self) -> &AccessResolver<S> {
        &self.resolver
    }

    // -- Bootstrap ---------------------------------------------------------

    /// Promote the profile registered under `email` to super admin,
    /// provided no super admin exists yet. Never mutates anything when
    /// one does.
    pub async fn promote_first_super_admin(&self, email: &str) -> DashportResult<Profile> {
        if self.store.profiles().count_with_role(Role::SuperAdmin).await? > 0 {
            warn!("Bootstrap refused: a super admin already exists");
            return Err(DashportError::AlreadyExists {
                entity: "super_admin".into(),
            });
        }

        let profile = self
            .store
            .profiles()
            .find_by_email(email)
            .await?
            .ok_or_else(|| DashportError::not_found("profile", email.trim().to_lowercase()))?;

        let promoted = match self.store.profiles().claim_super_admin(profile.id).await {
            Ok(p) => p,
            Err(DashportError::AlreadyExists { .. }) => {
                warn!(user_id = %profile.id, "Bootstrap lost the race for the super admin claim");
                return Err(DashportError::AlreadyExists {
                    entity: "super_admin".into(),
                });
            }
            Err(e) => return Err(e),
        };

        info!(user_id = %promoted.id, "First super admin promoted");
        Ok(promoted)
    }

    /// Record that the user has confirmed control of their email.
    pub async fn confirm_email(&self, user_id: Uuid) -> DashportResult<Profile> {
        let profile = self
            .store
            .profiles()
            .update(
                user_id,
                UpdateProfile {
                    email_verified: Some(true),
                    ..Default::default()
                },
            )
            .await?;
        info!(user_id = %user_id, "Email confirmed");
        Ok(profile)
    }

    // -- Users -------------------------------------------------------------

    pub async fn list_users(
        &self,
        actor: Uuid,
        pagination: Pagination,
    ) -> DashportResult<PaginatedResult<UserWithMemberships>> {
        self.resolver.require_super_admin(actor).await?;
        let page = self.store.profiles().list(pagination).await?;

        let mut items = Vec::with_capacity(page.items.len());
        for profile in page.items {
            let memberships = self.store.members().list_active_by_user(profile.id).await?;
            items.push(UserWithMemberships {
                profile,
                memberships,
            });
        }

        Ok(PaginatedResult {
            items,
            total: page.total,
            offset: page.offset,
            limit: page.limit,
        })
    }

    pub async fn update_user_role(
        &self,
        actor: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> DashportResult<Profile> {
        self.resolver.require_super_admin(actor).await?;
        let profile = self
            .store
            .profiles()
            .update(
                user_id,
                UpdateProfile {
                    role: Some(role),
                    ..Default::default()
                },
            )
            .await?;
        info!(user_id = %user_id, role = %role, "Role changed");
        Ok(profile)
    }

    // -- Groups ------------------------------------------------------------

    pub async fn create_group(&self, actor: Uuid, input: CreateGroup) -> DashportResult<Group> {
        self.resolver.require_super_admin(actor).await?;
        require_text(&input.name, "group name")?;
        let group = self.store.groups().create(input).await?;
        info!(group_id = %group.id, "Group created");
        Ok(group)
    }

    pub async fn update_group(
        &self,
        actor: Uuid,
        group_id: Uuid,
        input: UpdateGroup,
    ) -> DashportResult<Group> {
        self.resolver.require_super_admin(actor).await?;
        if let Some(name) = &input.name {
            require_text(name, "group name")?;
        }
        self.store.groups().update(group_id, input).await
    }

    /// Removes the group with its membership rows and dashboards.
    pub async fn delete_group(&self, actor: Uuid, group_id: Uuid) -> DashportResult<()> {
        self.resolver.require_super_admin(actor).await?;
        self.store.groups().get_by_id(group_id).await?;
        self.store.groups().delete(group_id).await?;
        info!(group_id = %group_id, "Group deleted");
        Ok(())
    }

    pub async fn list_groups(
        &self,
        actor: Uuid,
        pagination: Pagination,
    ) -> DashportResult<PaginatedResult<Group>> {
        self.resolver.require_super_admin(actor).await?;
        self.store.groups().list(pagination).await
    }

    /// Groups the actor administers (every group for a super admin).
    pub async fn administered_groups(&self, actor: Uuid) -> DashportResult<Vec<Group>> {
        if self.resolver.resolve_role(actor).await? == Role::SuperAdmin {
            return self.all_groups().await;
        }
        let ids = self.resolver.managed_groups(actor).await?;
        self.store.groups().get_many(&ids).await
    }

    async fn all_groups(&self) -> DashportResult<Vec<Group>> {
        let mut groups = Vec::new();
        let mut offset = 0;
        loop {
            let page = self
                .store
                .groups()
                .list(Pagination {
                    offset,
                    limit: SCAN_PAGE,
                })
                .await?;
            let fetched = page.items.len() as u64;
            groups.extend(page.items);
            offset += fetched;
            if fetched < SCAN_PAGE || offset >= page.total {
                return Ok(groups);
            }
        }
    }

    // -- Members -----------------------------------------------------------

    /// Make `user_id` an active member of `group_id`. An existing row
    /// for the pair is revived rather than duplicated.
    pub async fn add_member(
        &self,
        actor: Uuid,
        group_id: Uuid,
        user_id: Uuid,
    ) -> DashportResult<GroupMember> {
        self.resolver.require_group_admin_of(actor, group_id).await?;
        self.store.groups().get_by_id(group_id).await?;
        self.store.profiles().get_by_id(user_id).await?;

        let members = self.store.members();
        let member = match members.find_latest(group_id, user_id).await? {
            Some(row) => match row.state() {
                MembershipState::Active => row,
                MembershipState::Deleted => members.reactivate(row.id).await?,
                MembershipState::Pending | MembershipState::Inactive => {
                    members.activate(row.id, user_id).await?
                }
            },
            None => {
                members
                    .create(CreateMembership::active(group_id, user_id, false))
                    .await?
            }
        };

        info!(group_id = %group_id, user_id = %user_id, "Member added");
        Ok(member)
    }

    /// Soft delete; the row is kept as history.
    pub async fn remove_member(&self, actor: Uuid, member_id: Uuid) -> DashportResult<GroupMember> {
        let member = self.store.members().get_by_id(member_id).await?;
        self.resolver
            .require_group_admin_of(actor, member.group_id)
            .await?;
        let removed = self.store.members().soft_delete(member_id).await?;
        info!(group_id = %member.group_id, member_id = %member_id, "Member removed");
        Ok(removed)
    }

    pub async fn set_member_admin(
        &self,
        actor: Uuid,
        member_id: Uuid,
        is_admin: bool,
    ) -> DashportResult<GroupMember> {
        let member = self.store.members().get_by_id(member_id).await?;
        self.resolver
            .require_group_admin_of(actor, member.group_id)
            .await?;
        if member.is_deleted {
            return Err(DashportError::validation("membership has been removed"));
        }
        let updated = self.store.members().set_admin(member_id, is_admin).await?;
        info!(
            group_id = %member.group_id,
            member_id = %member_id,
            is_admin,
            "Member admin flag changed"
        );
        Ok(updated)
    }

    /// Active members of a group with their profiles.
    pub async fn list_members(
        &self,
        actor: Uuid,
        group_id: Uuid,
    ) -> DashportResult<Vec<MemberWithProfile>> {
        self.resolver.require_group_admin_of(actor, group_id).await?;
        let rows = self.store.members().list_active_by_group(group_id).await?;

        let mut members = Vec::with_capacity(rows.len());
        for membership in rows {
            let profile = match membership.user_id {
                Some(user_id) => match self.store.profiles().get_by_id(user_id).await {
                    Ok(p) => Some(p),
                    Err(DashportError::NotFound { .. }) => None,
                    Err(e) => return Err(e),
                },
                None => None,
            };
            members.push(MemberWithProfile {
                membership,
                profile,
            });
        }
        Ok(members)
    }

    // -- Dashboards --------------------------------------------------------

    pub async fn create_dashboard(
        &self,
        actor: Uuid,
        input: CreateDashboard,
    ) -> DashportResult<Dashboard> {
        self.resolver.require_super_admin(actor).await?;
        require_text(&input.title, "dashboard title")?;
        self.store.groups().get_by_id(input.group_id).await?;
        let dashboard = self.store.dashboards().create(input).await?;
        info!(dashboard_id = %dashboard.id, group_id = %dashboard.group_id, "Dashboard created");
        Ok(dashboard)
    }

    pub async fn update_dashboard(
        &self,
        actor: Uuid,
        dashboard_id: Uuid,
        input: UpdateDashboard,
    ) -> DashportResult<Dashboard> {
        self.resolver.require_super_admin(actor).await?;
        if let Some(title) = &input.title {
            require_text(title, "dashboard title")?;
        }
        if let Some(group_id) = input.group_id {
            self.store.groups().get_by_id(group_id).await?;
        }
        self.store.dashboards().update(dashboard_id, input).await
    }

    pub async fn delete_dashboard(&self, actor: Uuid, dashboard_id: Uuid) -> DashportResult<()> {
        self.resolver.require_super_admin(actor).await?;
        self.store.dashboards().get_by_id(dashboard_id).await?;
        self.store.dashboards().delete(dashboard_id).await?;
        info!(dashboard_id = %dashboard_id, "Dashboard deleted");
        Ok(())
    }

    pub async fn list_dashboards(
        &self,
        actor: Uuid,
        pagination: Pagination,
    ) -> DashportResult<PaginatedResult<Dashboard>> {
        self.resolver.require_super_admin(actor).await?;
        self.store.dashboards().list(pagination).await
    }

    /// Every dashboard for a super admin; otherwise those of groups the
    /// user is an active member of.
    pub async fn visible_dashboards(&self, user_id: Uuid) -> DashportResult<Vec<Dashboard>> {
        if self.resolver.resolve_role(user_id).await? == Role::SuperAdmin {
            let mut dashboards = Vec::new();
            let mut offset = 0;
            loop {
                let page = self
                    .store
                    .dashboards()
                    .list(Pagination {
                        offset,
                        limit: SCAN_PAGE,
                    })
                    .await?;
                let fetched = page.items.len() as u64;
                dashboards.extend(page.items);
                offset += fetched;
                if fetched < SCAN_PAGE || offset >= page.total {
                    return Ok(dashboards);
                }
            }
        }

        let group_ids: Vec<Uuid> = self
            .store
            .members()
            .list_active_by_user(user_id)
            .await?
            .into_iter()
            .map(|m| m.group_id)
            .collect();
        self.store.dashboards().list_by_groups(&group_ids).await
    }
}
