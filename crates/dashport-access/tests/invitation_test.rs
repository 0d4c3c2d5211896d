//! Invitation lifecycle against an in-memory store.

mod common;

use chrono::{Duration, Utc};
use common::{Fixture, setup, setup_with};
use dashport_access::{AccessConfig, MembershipPolicy, NewInvitation, StepOutcome};
use dashport_core::error::DashportError;
use dashport_core::identity::Identity;
use dashport_core::models::invitation::{CreateInvitation, InvitationStatus};
use dashport_core::models::membership::MembershipState;
use dashport_core::models::profile::{EnsureProfile, Role};
use dashport_core::repository::{
    InvitationRepository, MembershipRepository, Pagination, PrivilegedStore, ProfileRepository,
};
use uuid::Uuid;

fn invite(email: &str, role: Role, group_id: Option<Uuid>) -> NewInvitation {
    NewInvitation {
        email: email.into(),
        role,
        group_id,
    }
}

/// Simulates the invitee's first sign-in.
async fn sign_in(fx: &Fixture, id: Uuid, email: &str) -> Identity {
    fx.store
        .profiles()
        .ensure(EnsureProfile {
            id,
            email: email.into(),
            full_name: None,
        })
        .await
        .unwrap();
    Identity {
        id,
        email: email.into(),
    }
}

#[tokio::test]
async fn group_admin_invitation_reserves_inactive_seat() {
    let fx = setup().await;
    let (g1, admin) = fx.group_with_admin("G1", "lead@x.com").await;

    let invitation = fx
        .invitations
        .create(admin.id, invite("Alice@X.com", Role::User, Some(g1.id)))
        .await
        .unwrap();

    assert_eq!(invitation.email, "alice@x.com");
    assert_eq!(invitation.role, Role::User);
    assert_eq!(invitation.group_id, Some(g1.id));
    assert!(invitation.used_at.is_none());
    assert_eq!(invitation.token.len(), 64);
    assert!(invitation.expires_at > Utc::now() + Duration::days(6));

    assert_eq!(fx.row_count("invitation").await, 1);
    let rows = fx.store.members().list_active_by_group(g1.id).await.unwrap();
    assert_eq!(rows.len(), 1, "only the admin is active");
    let reserved = fx
        .store
        .members()
        .find_reconcilable(g1.id, invitation.id, Uuid::new_v4())
        .await
        .unwrap()
        .expect("pending row");
    assert_eq!(reserved.state(), MembershipState::Pending);
    assert!(!reserved.is_active);

    let sent = fx.identity.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].metadata.group_name.as_deref(), Some("G1"));
    assert_eq!(sent[0].metadata.invited_by, "lead@x.com");
    assert!(
        sent[0]
            .redirect_to
            .ends_with(&format!("/accept-invite?token={}", invitation.token))
    );
}

#[tokio::test]
async fn sign_in_activates_reserved_seat() {
    let fx = setup().await;
    let (g1, admin) = fx.group_with_admin("G1", "lead@x.com").await;
    let invitation = fx
        .invitations
        .create(admin.id, invite("alice@x.com", Role::User, Some(g1.id)))
        .await
        .unwrap();

    let alice = sign_in(&fx, Uuid::new_v4(), "alice@x.com").await;
    let report = fx
        .invitations
        .reconcile_on_sign_in(&alice)
        .await
        .unwrap()
        .expect("pending invitation applied");
    assert_eq!(report.membership_step, StepOutcome::Applied);

    let profile = fx.store.profiles().get_by_id(alice.id).await.unwrap();
    assert_eq!(profile.role, Role::User);

    let member = fx
        .store
        .members()
        .find_current(g1.id, alice.id)
        .await
        .unwrap()
        .expect("membership");
    assert_eq!(Some(member.id), report.membership_id);
    assert!(member.is_active);
    assert!(member.pending_user_id.is_none());
    assert_eq!(fx.row_count("group_member").await, 2, "no duplicate row");

    let used = fx.store.invitations().get_by_id(invitation.id).await.unwrap();
    assert_eq!(used.status(), InvitationStatus::Accepted);

    // Following the same link again changes nothing.
    assert!(
        fx.invitations
            .reconcile_on_sign_in(&alice)
            .await
            .unwrap()
            .is_none()
    );
    assert!(fx.invitations.lookup(&invitation.token).await.unwrap().is_none());
    assert_eq!(fx.row_count("group_member").await, 2);
}

#[tokio::test]
async fn accepting_twice_fails_the_second_time() {
    let fx = setup().await;
    let admin = fx.profile("root@x.com", Role::SuperAdmin).await;
    let g = fx.group("Ops").await;
    let invitation = fx
        .invitations
        .create(admin.id, invite("bob@x.com", Role::GroupAdmin, Some(g.id)))
        .await
        .unwrap();
    let bob = sign_in(&fx, Uuid::new_v4(), "bob@x.com").await;

    let report = fx.invitations.accept(&invitation.token, bob.id).await.unwrap();
    assert_eq!(report.role_step, StepOutcome::Applied);
    assert_eq!(report.role, Role::GroupAdmin);

    let err = fx
        .invitations
        .accept(&invitation.token, bob.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DashportError::InvalidInvitation));

    let member = fx
        .store
        .members()
        .find_current(g.id, bob.id)
        .await
        .unwrap()
        .expect("membership");
    assert!(member.is_admin);
    assert!(member.is_active);
    assert_eq!(fx.row_count("group_member").await, 1);
}

#[tokio::test]
async fn expired_invitation_cannot_be_accepted() {
    let fx = setup().await;
    let admin = fx.profile("root@x.com", Role::SuperAdmin).await;
    let token = "ef".repeat(32);
    let invitation = fx
        .store
        .invitations()
        .create(CreateInvitation {
            email: "late@x.com".into(),
            role: Role::User,
            group_id: None,
            invited_by: admin.id,
            token: token.clone(),
            expires_at: Utc::now() - Duration::minutes(1),
        })
        .await
        .unwrap();
    let late = sign_in(&fx, Uuid::new_v4(), "late@x.com").await;

    let lookup = fx.invitations.lookup(&token).await.unwrap().expect("fetchable");
    assert_eq!(lookup.status, InvitationStatus::Expired);

    let err = fx.invitations.accept(&token, late.id).await.unwrap_err();
    assert!(matches!(err, DashportError::ExpiredInvitation));

    assert!(fx.invitations.reconcile_on_sign_in(&late).await.unwrap().is_none());
    let still = fx.store.invitations().get_by_id(invitation.id).await.unwrap();
    assert!(still.used_at.is_none());
}

#[tokio::test]
async fn unknown_or_malformed_token_is_invalid() {
    let fx = setup().await;
    let user = fx.profile("u@x.com", Role::User).await;
    let unknown = "aa".repeat(32);
    for token in ["nope", unknown.as_str()] {
        let err = fx.invitations.accept(token, user.id).await.unwrap_err();
        assert!(matches!(err, DashportError::InvalidInvitation));
    }
}

#[tokio::test]
async fn group_admin_role_without_group_has_no_side_effects() {
    let fx = setup().await;
    let admin = fx.profile("root@x.com", Role::SuperAdmin).await;

    let err = fx
        .invitations
        .create(admin.id, invite("carol@x.com", Role::GroupAdmin, None))
        .await
        .unwrap_err();
    assert!(matches!(err, DashportError::Validation { .. }));

    assert!(fx.identity.sent().is_empty());
    assert_eq!(fx.row_count("invitation").await, 0);
    assert_eq!(fx.row_count("group_member").await, 0);
}

#[tokio::test]
async fn super_admin_invitation_with_provisioned_identity_is_active_at_once() {
    let fx = setup().await;
    let admin = fx.profile("root@x.com", Role::SuperAdmin).await;
    let g = fx.group("Finance").await;
    let dave_id = Uuid::new_v4();
    fx.identity.provision(dave_id);

    let invitation = fx
        .invitations
        .create(admin.id, invite("dave@x.com", Role::User, Some(g.id)))
        .await
        .unwrap();

    let seat = fx
        .store
        .members()
        .find_current(g.id, dave_id)
        .await
        .unwrap()
        .expect("visible seat");
    assert!(seat.is_active);

    let dave = sign_in(&fx, dave_id, "dave@x.com").await;
    let report = fx.invitations.accept(&invitation.token, dave.id).await.unwrap();
    assert_eq!(report.membership_step, StepOutcome::Unchanged);
    assert_eq!(report.membership_id, Some(seat.id));
    assert_eq!(fx.row_count("group_member").await, 1);
}

#[tokio::test]
async fn group_admin_may_not_escalate_or_cross_groups() {
    let fx = setup().await;
    let (g1, admin) = fx.group_with_admin("G1", "lead@x.com").await;
    let g2 = fx.group("G2").await;

    let err = fx
        .invitations
        .create(admin.id, invite("e@x.com", Role::GroupAdmin, Some(g1.id)))
        .await
        .unwrap_err();
    assert!(matches!(err, DashportError::AccessDenied { .. }));

    let err = fx
        .invitations
        .create(admin.id, invite("e@x.com", Role::User, Some(g2.id)))
        .await
        .unwrap_err();
    assert!(matches!(err, DashportError::AccessDenied { .. }));

    let plain = fx.profile("plain@x.com", Role::User).await;
    let err = fx
        .invitations
        .create(plain.id, invite("e@x.com", Role::User, Some(g1.id)))
        .await
        .unwrap_err();
    assert!(matches!(err, DashportError::AccessDenied { .. }));

    assert!(fx.identity.sent().is_empty());
    assert_eq!(fx.row_count("invitation").await, 0);
}

#[tokio::test]
async fn identity_failure_aborts_creation() {
    let fx = setup().await;
    let admin = fx.profile("root@x.com", Role::SuperAdmin).await;
    *fx.identity.fail_invites.lock().unwrap() = true;

    let err = fx
        .invitations
        .create(admin.id, invite("f@x.com", Role::User, None))
        .await
        .unwrap_err();
    assert!(matches!(err, DashportError::Upstream { .. }));
    assert_eq!(fx.row_count("invitation").await, 0);
}

#[tokio::test]
async fn membership_failure_is_recorded_under_best_effort() {
    let fx = setup().await;
    let admin = fx.profile("root@x.com", Role::SuperAdmin).await;
    let g = fx.group("Temp").await;
    let invitation = fx
        .invitations
        .create(admin.id, invite("gina@x.com", Role::User, Some(g.id)))
        .await
        .unwrap();
    let gina = sign_in(&fx, Uuid::new_v4(), "gina@x.com").await;

    // Break the membership table so the step fails.
    fx.db.query("REMOVE TABLE group_member").await.unwrap();
    fx.db
        .query("DEFINE TABLE group_member SCHEMAFULL; DEFINE FIELD group_id ON group_member TYPE int")
        .await
        .unwrap();

    let report = fx.invitations.accept(&invitation.token, gina.id).await.unwrap();
    assert!(report.membership_failed());
    assert_eq!(report.role_step, StepOutcome::Unchanged);
    let used = fx.store.invitations().get_by_id(invitation.id).await.unwrap();
    assert!(used.used_at.is_some());
}

#[tokio::test]
async fn required_policy_aborts_before_marking_used() {
    let fx = setup_with(AccessConfig {
        membership_policy: MembershipPolicy::Required,
        ..Default::default()
    })
    .await;
    let admin = fx.profile("root@x.com", Role::SuperAdmin).await;
    let g = fx.group("Temp").await;
    let invitation = fx
        .invitations
        .create(admin.id, invite("hal@x.com", Role::User, Some(g.id)))
        .await
        .unwrap();
    let hal = sign_in(&fx, Uuid::new_v4(), "hal@x.com").await;

    fx.db.query("REMOVE TABLE group_member").await.unwrap();
    fx.db
        .query("DEFINE TABLE group_member SCHEMAFULL; DEFINE FIELD group_id ON group_member TYPE int")
        .await
        .unwrap();

    assert!(fx.invitations.accept(&invitation.token, hal.id).await.is_err());
    let unused = fx.store.invitations().get_by_id(invitation.id).await.unwrap();
    assert!(unused.used_at.is_none());
}

#[tokio::test]
async fn delete_keeps_reserved_row_and_list_is_super_admin_only() {
    let fx = setup().await;
    let (g1, lead) = fx.group_with_admin("G1", "lead@x.com").await;
    let root = fx.profile("root@x.com", Role::SuperAdmin).await;
    let invitation = fx
        .invitations
        .create(lead.id, invite("ivy@x.com", Role::User, Some(g1.id)))
        .await
        .unwrap();

    let err = fx.invitations.list(lead.id, Pagination::default()).await.unwrap_err();
    assert!(matches!(err, DashportError::AccessDenied { .. }));
    let err = fx.invitations.delete(lead.id, invitation.id).await.unwrap_err();
    assert!(matches!(err, DashportError::AccessDenied { .. }));

    let page = fx.invitations.list(root.id, Pagination::default()).await.unwrap();
    assert_eq!(page.total, 1);

    fx.invitations.delete(root.id, invitation.id).await.unwrap();
    assert_eq!(fx.row_count("invitation").await, 0);
    assert_eq!(fx.row_count("group_member").await, 2, "pending row stays");
}

#[tokio::test]
async fn concurrent_acceptance_consumes_the_token_once() {
    let fx = setup().await;
    let admin = fx.profile("root@x.com", Role::SuperAdmin).await;
    let g = fx.group("Sales").await;
    let invitation = fx
        .invitations
        .create(admin.id, invite("ivy@x.com", Role::User, Some(g.id)))
        .await
        .unwrap();
    let ivy = sign_in(&fx, Uuid::new_v4(), "ivy@x.com").await;

    let (a, b) = tokio::join!(
        fx.invitations.accept(&invitation.token, ivy.id),
        fx.invitations.accept(&invitation.token, ivy.id),
    );

    let (ok, err) = match (a, b) {
        (Ok(report), Err(e)) | (Err(e), Ok(report)) => (report, e),
        (a, b) => panic!("expected one success and one failure, got {a:?} and {b:?}"),
    };
    assert_eq!(ok.invitation_id, invitation.id);
    assert!(matches!(err, DashportError::InvalidInvitation));

    let active: Vec<_> = fx
        .store
        .members()
        .list_active_by_group(g.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.user_id == Some(ivy.id))
        .collect();
    assert_eq!(active.len(), 1);
    let used = fx.store.invitations().get_by_id(invitation.id).await.unwrap();
    assert!(used.used_at.is_some());
}

#[tokio::test]
async fn existing_member_releases_the_reserved_seat_on_acceptance() {
    let fx = setup().await;
    let admin = fx.profile("root@x.com", Role::SuperAdmin).await;
    let g = fx.group("Legal").await;
    let jo = fx.profile("jo@x.com", Role::User).await;
    let current = fx.member(&g, &jo, false).await;

    let invitation = fx
        .invitations
        .create(admin.id, invite("jo@x.com", Role::User, Some(g.id)))
        .await
        .unwrap();
    assert_eq!(fx.store.members().find_pending(invitation.id).await.unwrap().len(), 1);

    let report = fx.invitations.accept(&invitation.token, jo.id).await.unwrap();
    assert_eq!(report.membership_id, Some(current.id));

    assert!(fx.store.members().find_pending(invitation.id).await.unwrap().is_empty());
    let kept = fx
        .store
        .members()
        .find_current(g.id, jo.id)
        .await
        .unwrap()
        .expect("membership");
    assert_eq!(kept.id, current.id);
    assert!(kept.is_active);
    // The released seat stays behind as a soft-deleted row.
    assert_eq!(fx.row_count("group_member").await, 2);
    assert_eq!(fx.store.members().list_active_by_group(g.id).await.unwrap().len(), 1);
}
