//! Invitation lifecycle.
//!
//! An invitation is created by an administrator, dispatched through the
//! identity provider, and consumed exactly once. Both the explicit
//! accept action and the post-login callback converge on
//! [`InvitationService::reconcile`], which merges any reserved
//! membership row instead of inserting a second one.

use std::sync::Arc;

use chrono::{Duration, Utc};
use dashport_core::error::{DashportError, DashportResult};
use dashport_core::identity::{Identity, IdentityProvider, InviteMetadata, InviteRequest};
use dashport_core::models::group::Group;
use dashport_core::models::invitation::{CreateInvitation, Invitation, InvitationLookup};
use dashport_core::models::membership::CreateMembership;
use dashport_core::models::profile::{Role, UpdateProfile};
use dashport_core::repository::{
    GroupRepository, InvitationRepository, MembershipRepository, PaginatedResult, Pagination,
    PrivilegedStore, ProfileRepository,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{AccessConfig, MembershipPolicy};
use crate::resolver::AccessResolver;
use crate::token;

/// Request to invite someone.
#[derive(Debug, Clone, Deserialize)]
pub struct NewInvitation {
    pub email: String,
    pub role: Role,
    pub group_id: Option<Uuid>,
}

/// Outcome of one acceptance step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum StepOutcome {
    Applied,
    /// Already in the target state.
    Unchanged,
    /// Nothing to do for this invitation.
    Skipped,
    Failed(String),
}

/// Per-step record of one acceptance.
#[derive(Debug, Clone, Serialize)]
pub struct AcceptanceReport {
    pub invitation_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub role_step: StepOutcome,
    pub membership_step: StepOutcome,
    pub membership_id: Option<Uuid>,
}

impl AcceptanceReport {
    pub fn membership_failed(&self) -> bool {
        matches!(self.membership_step, StepOutcome::Failed(_))
    }
}

pub struct InvitationService<S: PrivilegedStore, I: IdentityProvider> {
    store: S,
    identity: Arc<I>,
    resolver: AccessResolver<S>,
    config: AccessConfig,
}

impl<S: PrivilegedStore, I: IdentityProvider> Clone for InvitationService<S, I> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            identity: Arc::clone(&self.identity),
            resolver: self.resolver.clone(),
            config: self.config.clone(),
        }
    }
}

fn validate_email(email: &str) -> DashportResult<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(DashportError::validation("a valid email address is required"))
    }
}

impl<S: PrivilegedStore, I: IdentityProvider> InvitationService<S, I> {
    pub fn new(store: S, identity: Arc<I>, config: AccessConfig) -> Self {
        Self {
            resolver: AccessResolver::new(store.clone()),
            store,
            identity,
            config,
        }
    }

    /// Issue an invitation on behalf of `actor`.
    ///
    /// Every check runs before the email is dispatched: a rejected
    /// request writes nothing and sends nothing.
    pub async fn create(&self, actor: Uuid, input: NewInvitation) -> DashportResult<Invitation> {
        let email = validate_email(&input.email)?;
        if input.role.requires_group() && input.group_id.is_none() {
            return Err(DashportError::validation(
                "group admin invitations require a group",
            ));
        }

        let actor_role = self.resolver.resolve_role(actor).await?;
        let issued_by_super_admin = actor_role == Role::SuperAdmin;
        if !issued_by_super_admin {
            let Some(group_id) = input.group_id else {
                warn!(user_id = %actor, "Invitation without group refused");
                return Err(DashportError::access_denied(
                    "only super admins may invite without a group",
                ));
            };
            if input.role != Role::User {
                warn!(user_id = %actor, role = %input.role, "Invitation role refused");
                return Err(DashportError::access_denied(
                    "group admins may only invite regular users",
                ));
            }
            self.resolver.require_group_admin_of(actor, group_id).await?;
        }

        let group = match input.group_id {
            Some(group_id) => Some(self.store.groups().get_by_id(group_id).await?),
            None => None,
        };

        let inviter_name = match self.store.profiles().get_by_id(actor).await {
            Ok(profile) => profile.display_name().to_string(),
            Err(DashportError::NotFound { .. }) => "An administrator".to_string(),
            Err(e) => return Err(e),
        };

        let token = token::generate_invitation_token();
        let expires_at = Utc::now() + Duration::days(self.config.invitation_ttl_days);

        let invited = self
            .identity
            .invite_user_by_email(InviteRequest {
                email: email.clone(),
                metadata: InviteMetadata {
                    role: input.role,
                    group_id: input.group_id,
                    group_name: group.as_ref().map(|g| g.name.clone()),
                    invited_by: inviter_name,
                },
                redirect_to: self.config.accept_invite_url(&token),
            })
            .await?;

        let invitation = self
            .store
            .invitations()
            .create(CreateInvitation {
                email,
                role: input.role,
                group_id: input.group_id,
                invited_by: actor,
                token,
                expires_at,
            })
            .await?;

        info!(
            invitation_id = %invitation.id,
            user_id = %actor,
            role = %invitation.role,
            "Invitation created"
        );

        if let Some(group) = &group {
            let reserved = self
                .reserve_seat(group, &invitation, issued_by_super_admin, invited.id)
                .await;
            if let Err(e) = reserved {
                warn!(
                    invitation_id = %invitation.id,
                    group_id = %group.id,
                    error = %e,
                    "Could not reserve membership for invitation"
                );
            }
        }

        Ok(invitation)
    }

    /// Super admin invitations with a provisioned identity get an active
    /// seat right away; everything else waits in a pending row.
    async fn reserve_seat(
        &self,
        group: &Group,
        invitation: &Invitation,
        issued_by_super_admin: bool,
        invited_user: Option<Uuid>,
    ) -> DashportResult<()> {
        let is_admin = invitation.role == Role::GroupAdmin;
        let input = match invited_user {
            Some(user_id) if issued_by_super_admin => {
                if self
                    .store
                    .members()
                    .find_current(group.id, user_id)
                    .await?
                    .is_some()
                {
                    return Ok(());
                }
                CreateMembership::active(group.id, user_id, is_admin)
            }
            _ => CreateMembership::pending(group.id, invitation.id, is_admin),
        };
        self.store.members().create(input).await?;
        Ok(())
    }

    /// Unused invitation for `token` plus its group. Expired invitations
    /// are returned too; the status says whether they can be accepted.
    pub async fn lookup(&self, token: &str) -> DashportResult<Option<InvitationLookup>> {
        if !token::is_well_formed(token) {
            return Ok(None);
        }
        let Some(invitation) = self.store.invitations().find_unused_by_token(token).await? else {
            return Ok(None);
        };
        let group = match invitation.group_id {
            Some(group_id) => match self.store.groups().get_by_id(group_id).await {
                Ok(group) => Some(group),
                Err(DashportError::NotFound { .. }) => None,
                Err(e) => return Err(e),
            },
            None => None,
        };
        let status = invitation.status();
        Ok(Some(InvitationLookup {
            invitation,
            group,
            status,
        }))
    }

    /// Accept by token on behalf of an authenticated user.
    pub async fn accept(&self, token: &str, user_id: Uuid) -> DashportResult<AcceptanceReport> {
        if !token::is_well_formed(token) {
            return Err(DashportError::InvalidInvitation);
        }
        let invitation = self
            .store
            .invitations()
            .find_unused_by_token(token)
            .await?
            .ok_or(DashportError::InvalidInvitation)?;
        if invitation.is_expired() {
            warn!(invitation_id = %invitation.id, user_id = %user_id, "Expired invitation presented");
            return Err(DashportError::ExpiredInvitation);
        }
        self.reconcile(&invitation, user_id).await
    }

    /// Post-login path: apply the newest pending invitation addressed to
    /// the identity's email, if any.
    pub async fn reconcile_on_sign_in(
        &self,
        identity: &Identity,
    ) -> DashportResult<Option<AcceptanceReport>> {
        let Some(invitation) = self
            .store
            .invitations()
            .find_latest_unused_by_email(&identity.email)
            .await?
        else {
            return Ok(None);
        };
        if invitation.is_expired() {
            info!(
                invitation_id = %invitation.id,
                user_id = %identity.id,
                "Skipping expired invitation at sign-in"
            );
            return Ok(None);
        }
        self.reconcile(&invitation, identity.id).await.map(Some)
    }

    /// The acceptance saga: role, membership, then mark used.
    ///
    /// Steps commit independently. The membership step follows the
    /// configured [`MembershipPolicy`]; a failure to mark the
    /// invitation used always fails the whole acceptance.
    pub async fn reconcile(
        &self,
        invitation: &Invitation,
        user_id: Uuid,
    ) -> DashportResult<AcceptanceReport> {
        let role_step = self.apply_role(invitation, user_id).await?;

        let (membership_step, membership_id) = match invitation.group_id {
            None => (StepOutcome::Skipped, None),
            Some(group_id) => match self.merge_membership(group_id, invitation, user_id).await {
                Ok((outcome, id)) => (outcome, Some(id)),
                Err(e) => match self.config.membership_policy {
                    MembershipPolicy::BestEffort => {
                        warn!(
                            invitation_id = %invitation.id,
                            user_id = %user_id,
                            group_id = %group_id,
                            error = %e,
                            "Membership step failed; continuing"
                        );
                        (StepOutcome::Failed(e.to_string()), None)
                    }
                    MembershipPolicy::Required => return Err(e),
                },
            },
        };

        if !self.store.invitations().mark_used(invitation.id).await? {
            warn!(invitation_id = %invitation.id, user_id = %user_id, "Invitation already consumed");
            return Err(DashportError::InvalidInvitation);
        }

        info!(
            invitation_id = %invitation.id,
            user_id = %user_id,
            role = %invitation.role,
            "Invitation accepted"
        );

        Ok(AcceptanceReport {
            invitation_id: invitation.id,
            user_id,
            role: invitation.role,
            role_step,
            membership_step,
            membership_id,
        })
    }

    async fn apply_role(&self, invitation: &Invitation, user_id: Uuid) -> DashportResult<StepOutcome> {
        let profile = self.store.profiles().get_by_id(user_id).await?;
        if profile.role == invitation.role {
            return Ok(StepOutcome::Unchanged);
        }
        self.store
            .profiles()
            .update(
                user_id,
                UpdateProfile {
                    role: Some(invitation.role),
                    ..Default::default()
                },
            )
            .await?;
        Ok(StepOutcome::Applied)
    }

    /// Bind the reserved or existing row to the user, or insert one.
    async fn merge_membership(
        &self,
        group_id: Uuid,
        invitation: &Invitation,
        user_id: Uuid,
    ) -> DashportResult<(StepOutcome, Uuid)> {
        let members = self.store.members();
        let wants_admin = invitation.role == Role::GroupAdmin;

        let Some(row) = members
            .find_reconcilable(group_id, invitation.id, user_id)
            .await?
        else {
            let created = members
                .create(CreateMembership::active(group_id, user_id, wants_admin))
                .await?;
            return Ok((StepOutcome::Applied, created.id));
        };

        let mut outcome = StepOutcome::Unchanged;
        if !row.grants_access() || row.user_id != Some(user_id) {
            members.activate(row.id, user_id).await?;
            outcome = StepOutcome::Applied;
        }
        if wants_admin && !row.is_admin {
            members.set_admin(row.id, true).await?;
            outcome = StepOutcome::Applied;
        }

        // Release any other seat reserved for this invitation.
        for stale in members.find_pending(invitation.id).await? {
            if stale.id != row.id {
                members.soft_delete(stale.id).await?;
                outcome = StepOutcome::Applied;
            }
        }
        Ok((outcome, row.id))
    }

    /// Hard delete. Any reserved membership row stays behind.
    pub async fn delete(&self, actor: Uuid, invitation_id: Uuid) -> DashportResult<()> {
        self.resolver.require_super_admin(actor).await?;
        self.store.invitations().get_by_id(invitation_id).await?;
        self.store.invitations().delete(invitation_id).await?;
        info!(invitation_id = %invitation_id, user_id = %actor, "Invitation deleted");
        Ok(())
    }

    /// All invitations, newest first.
    pub async fn list(
        &self,
        actor: Uuid,
        pagination: Pagination,
    ) -> DashportResult<PaginatedResult<Invitation>> {
        self.resolver.require_super_admin(actor).await?;
        self.store.invitations().list(pagination).await
    }
}
