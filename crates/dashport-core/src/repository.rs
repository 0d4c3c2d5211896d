//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Lookups by primary key return
//! `NotFound`; lookups by a secondary filter return `Option`.

use uuid::Uuid;

use crate::error::DashportResult;
use crate::models::{
    dashboard::{CreateDashboard, Dashboard, UpdateDashboard},
    group::{CreateGroup, Group, UpdateGroup},
    invitation::{CreateInvitation, Invitation},
    membership::{CreateMembership, GroupMember},
    profile::{EnsureProfile, Profile, Role, UpdateProfile},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

pub trait ProfileRepository: Send + Sync {
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DashportResult<Profile>> + Send;
    /// Case-insensitive email lookup.
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = DashportResult<Option<Profile>>> + Send;
    /// Create the profile on first sign-in, otherwise record the
    /// sign-in. Never changes the role of an existing profile.
    fn ensure(&self, input: EnsureProfile) -> impl Future<Output = DashportResult<Profile>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateProfile,
    ) -> impl Future<Output = DashportResult<Profile>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = DashportResult<PaginatedResult<Profile>>> + Send;
    fn count_with_role(&self, role: Role) -> impl Future<Output = DashportResult<u64>> + Send;
    /// Promote a profile to super admin through the one-time bootstrap
    /// claim. Fails with `AlreadyExists` when the claim was taken.
    fn claim_super_admin(&self, id: Uuid) -> impl Future<Output = DashportResult<Profile>> + Send;
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

pub trait GroupRepository: Send + Sync {
    fn create(&self, input: CreateGroup) -> impl Future<Output = DashportResult<Group>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DashportResult<Group>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateGroup,
    ) -> impl Future<Output = DashportResult<Group>> + Send;
    /// Delete a group together with its membership rows and dashboards.
    fn delete(&self, id: Uuid) -> impl Future<Output = DashportResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = DashportResult<PaginatedResult<Group>>> + Send;
    fn get_many(&self, ids: &[Uuid]) -> impl Future<Output = DashportResult<Vec<Group>>> + Send;
}

// ---------------------------------------------------------------------------
// Memberships
// ---------------------------------------------------------------------------

pub trait MembershipRepository: Send + Sync {
    fn create(
        &self,
        input: CreateMembership,
    ) -> impl Future<Output = DashportResult<GroupMember>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DashportResult<GroupMember>> + Send;

    /// The non-deleted row for `(group, user)`, if any.
    fn find_current(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = DashportResult<Option<GroupMember>>> + Send;

    /// Most recent row for `(group, user)` including soft-deleted ones.
    fn find_latest(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = DashportResult<Option<GroupMember>>> + Send;

    /// Non-deleted row in `group_id` reserved for `invitation_id` or
    /// already bound to `user_id`.
    fn find_reconcilable(
        &self,
        group_id: Uuid,
        invitation_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = DashportResult<Option<GroupMember>>> + Send;

    /// Non-deleted rows still reserved for `invitation_id`.
    fn find_pending(
        &self,
        invitation_id: Uuid,
    ) -> impl Future<Output = DashportResult<Vec<GroupMember>>> + Send;

    /// Bind the row to `user_id`, activate it and clear the pending id.
    fn activate(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = DashportResult<GroupMember>> + Send;

    /// Clear the soft-delete flag and activate the row.
    fn reactivate(&self, id: Uuid) -> impl Future<Output = DashportResult<GroupMember>> + Send;

    /// Soft delete: `is_deleted = true`, `is_active = false`.
    fn soft_delete(&self, id: Uuid) -> impl Future<Output = DashportResult<GroupMember>> + Send;

    fn set_admin(
        &self,
        id: Uuid,
        is_admin: bool,
    ) -> impl Future<Output = DashportResult<GroupMember>> + Send;

    /// Active, non-deleted rows of a group.
    fn list_active_by_group(
        &self,
        group_id: Uuid,
    ) -> impl Future<Output = DashportResult<Vec<GroupMember>>> + Send;

    /// Active, non-deleted rows of a user.
    fn list_active_by_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = DashportResult<Vec<GroupMember>>> + Send;
}

// ---------------------------------------------------------------------------
// Dashboards
// ---------------------------------------------------------------------------

pub trait DashboardRepository: Send + Sync {
    fn create(
        &self,
        input: CreateDashboard,
    ) -> impl Future<Output = DashportResult<Dashboard>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DashportResult<Dashboard>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateDashboard,
    ) -> impl Future<Output = DashportResult<Dashboard>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = DashportResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = DashportResult<PaginatedResult<Dashboard>>> + Send;
    fn list_by_groups(
        &self,
        group_ids: &[Uuid],
    ) -> impl Future<Output = DashportResult<Vec<Dashboard>>> + Send;
}

// ---------------------------------------------------------------------------
// Invitations
// ---------------------------------------------------------------------------

pub trait InvitationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateInvitation,
    ) -> impl Future<Output = DashportResult<Invitation>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DashportResult<Invitation>> + Send;
    /// Unused invitation for `token`, expired or not.
    fn find_unused_by_token(
        &self,
        token: &str,
    ) -> impl Future<Output = DashportResult<Option<Invitation>>> + Send;
    /// Newest unused invitation addressed to `email` (case-insensitive).
    fn find_latest_unused_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = DashportResult<Option<Invitation>>> + Send;
    /// Set `used_at` if still unset. Returns `false` when the
    /// invitation had already been consumed.
    fn mark_used(&self, id: Uuid) -> impl Future<Output = DashportResult<bool>> + Send;
    /// Hard delete. Reserved membership rows are left in place.
    fn delete(&self, id: Uuid) -> impl Future<Output = DashportResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = DashportResult<PaginatedResult<Invitation>>> + Send;
}

// ---------------------------------------------------------------------------
// Privileged store capability
// ---------------------------------------------------------------------------

/// Handle to every repository through the elevated store credential.
///
/// Holding one is the capability to read and write any row; services
/// receive it explicitly at construction and gate each operation
/// through the access resolver themselves.
pub trait PrivilegedStore: Clone + Send + Sync + 'static {
    type Profiles: ProfileRepository;
    type Groups: GroupRepository;
    type Members: MembershipRepository;
    type Dashboards: DashboardRepository;
    type Invitations: InvitationRepository;

    fn profiles(&self) -> &Self::Profiles;
    fn groups(&self) -> &Self::Groups;
    fn members(&self) -> &Self::Members;
    fn dashboards(&self) -> &Self::Dashboards;
    fn invitations(&self) -> &Self::Invitations;
}
