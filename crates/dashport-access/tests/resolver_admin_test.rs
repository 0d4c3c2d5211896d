//! Authorization resolver and administrative operations.

mod common;

use common::setup;
use dashport_access::AccessResolver;
use dashport_core::error::DashportError;
use dashport_core::identity::Identity;
use dashport_core::models::dashboard::{CreateDashboard, DashboardType};
use dashport_core::models::group::CreateGroup;
use dashport_core::models::profile::Role;
use dashport_core::repository::{MembershipRepository, Pagination, PrivilegedStore, ProfileRepository};
use uuid::Uuid;

fn metabase(group_id: Uuid, title: &str) -> CreateDashboard {
    CreateDashboard {
        title: title.into(),
        description: String::new(),
        group_id,
        dashboard_type: DashboardType::Metabase,
        powerbi_workspace_id: None,
        powerbi_report_id: None,
        metabase_dashboard_id: Some("7".into()),
    }
}

#[tokio::test]
async fn missing_profile_resolves_to_synthesized_user() {
    let fx = setup().await;
    let resolver = AccessResolver::new(fx.store.clone());
    let ghost = Identity {
        id: Uuid::new_v4(),
        email: "ghost@x.com".into(),
    };

    let profile = resolver.resolve_profile(&ghost).await.unwrap();
    assert_eq!(profile.id, ghost.id);
    assert_eq!(profile.role, Role::User);
    assert_eq!(profile.full_name.as_deref(), Some("ghost@x.com"));
    assert_eq!(resolver.resolve_role(ghost.id).await.unwrap(), Role::User);
}

#[tokio::test]
async fn dashboard_access_follows_active_membership() {
    let fx = setup().await;
    let root = fx.profile("root@x.com", Role::SuperAdmin).await;
    let u = fx.profile("u@x.com", Role::User).await;
    let outsider = fx.profile("o@x.com", Role::User).await;
    let g = fx.group("G").await;
    let d = fx.admin.create_dashboard(root.id, metabase(g.id, "D")).await.unwrap();
    let row = fx.member(&g, &u, false).await;

    let resolver = fx.admin.resolver();
    assert!(resolver.can_access_dashboard(root.id, d.id).await.unwrap());
    assert!(resolver.can_access_dashboard(u.id, d.id).await.unwrap());
    assert!(!resolver.can_access_dashboard(outsider.id, d.id).await.unwrap());

    fx.store.members().soft_delete(row.id).await.unwrap();
    assert!(!resolver.can_access_dashboard(u.id, d.id).await.unwrap());

    let err = resolver
        .can_access_dashboard(u.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn group_admin_flags_require_active_rows() {
    let fx = setup().await;
    let (g, lead) = fx.group_with_admin("G", "lead@x.com").await;
    let other = fx.group("Other").await;
    let resolver = fx.admin.resolver();

    assert!(resolver.is_group_admin(lead.id).await.unwrap());
    assert!(resolver.is_admin_of_group(lead.id, g.id).await.unwrap());
    assert!(!resolver.is_admin_of_group(lead.id, other.id).await.unwrap());
    assert_eq!(resolver.managed_groups(lead.id).await.unwrap(), vec![g.id]);
    assert!(resolver.require_group_admin_of(lead.id, g.id).await.is_ok());

    let row = fx
        .store
        .members()
        .find_current(g.id, lead.id)
        .await
        .unwrap()
        .unwrap();
    fx.store.members().soft_delete(row.id).await.unwrap();
    assert!(!resolver.is_group_admin(lead.id).await.unwrap());
    assert!(matches!(
        resolver.require_group_admin_of(lead.id, g.id).await,
        Err(DashportError::AccessDenied { .. })
    ));
}

#[tokio::test]
async fn super_admin_passes_every_group_check() {
    let fx = setup().await;
    let root = fx.profile("root@x.com", Role::SuperAdmin).await;
    let g = fx.group("G").await;
    let resolver = fx.admin.resolver();

    assert!(resolver.require_super_admin(root.id).await.is_ok());
    assert!(resolver.require_group_admin_of(root.id, g.id).await.is_ok());
    assert!(!resolver.is_admin_of_group(root.id, g.id).await.unwrap());
}

#[tokio::test]
async fn bootstrap_promotes_only_once() {
    let fx = setup().await;
    let first = fx.profile("first@x.com", Role::User).await;
    let second = fx.profile("second@x.com", Role::User).await;

    let promoted = fx
        .admin
        .promote_first_super_admin("FIRST@x.com")
        .await
        .unwrap();
    assert_eq!(promoted.id, first.id);
    assert_eq!(promoted.role, Role::SuperAdmin);

    for _ in 0..2 {
        let err = fx
            .admin
            .promote_first_super_admin("second@x.com")
            .await
            .unwrap_err();
        assert!(matches!(err, DashportError::AlreadyExists { .. }));
    }
    let untouched = fx.store.profiles().get_by_id(second.id).await.unwrap();
    assert_eq!(untouched.role, Role::User);
    assert_eq!(untouched.updated_at, second.updated_at);
}

#[tokio::test]
async fn bootstrap_stays_closed_after_the_super_admin_is_demoted() {
    let fx = setup().await;
    let first = fx.profile("first@x.com", Role::User).await;
    let second = fx.profile("second@x.com", Role::User).await;
    fx.admin.promote_first_super_admin("first@x.com").await.unwrap();

    let demoted = fx
        .admin
        .update_user_role(first.id, first.id, Role::User)
        .await
        .unwrap();
    assert_eq!(demoted.role, Role::User);
    assert_eq!(
        fx.store.profiles().count_with_role(Role::SuperAdmin).await.unwrap(),
        0
    );

    let err = fx
        .admin
        .promote_first_super_admin("second@x.com")
        .await
        .unwrap_err();
    assert!(matches!(err, DashportError::AlreadyExists { .. }));
    assert_eq!(fx.row_count("super_admin_claim").await, 1);
    let still = fx.store.profiles().get_by_id(second.id).await.unwrap();
    assert_eq!(still.role, Role::User);
}

#[tokio::test]
async fn bootstrap_refuses_when_a_super_admin_exists() {
    let fx = setup().await;
    fx.profile("root@x.com", Role::SuperAdmin).await;
    let hopeful = fx.profile("hopeful@x.com", Role::User).await;

    let err = fx
        .admin
        .promote_first_super_admin("hopeful@x.com")
        .await
        .unwrap_err();
    assert!(matches!(err, DashportError::AlreadyExists { .. }));
    assert_eq!(fx.row_count("super_admin_claim").await, 0);
    let still = fx.store.profiles().get_by_id(hopeful.id).await.unwrap();
    assert_eq!(still.role, Role::User);
}

#[tokio::test]
async fn bootstrap_for_unknown_email_is_not_found() {
    let fx = setup().await;
    let err = fx
        .admin
        .promote_first_super_admin("nobody@x.com")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn add_member_revives_removed_row() {
    let fx = setup().await;
    let (g, lead) = fx.group_with_admin("G", "lead@x.com").await;
    let u = fx.profile("u@x.com", Role::User).await;

    let added = fx.admin.add_member(lead.id, g.id, u.id).await.unwrap();
    assert!(added.is_active);
    let removed = fx.admin.remove_member(lead.id, added.id).await.unwrap();
    assert!(removed.is_deleted);

    let back = fx.admin.add_member(lead.id, g.id, u.id).await.unwrap();
    assert_eq!(back.id, added.id);
    assert!(back.is_active);
    assert!(!back.is_deleted);
    assert_eq!(fx.row_count("group_member").await, 2);

    let again = fx.admin.add_member(lead.id, g.id, u.id).await.unwrap();
    assert_eq!(again.id, added.id);
}

#[tokio::test]
async fn member_management_is_scoped_to_administered_group() {
    let fx = setup().await;
    let (g1, lead) = fx.group_with_admin("G1", "lead@x.com").await;
    let g2 = fx.group("G2").await;
    let u = fx.profile("u@x.com", Role::User).await;
    let foreign = fx.member(&g2, &u, false).await;

    let err = fx.admin.add_member(lead.id, g2.id, u.id).await.unwrap_err();
    assert!(matches!(err, DashportError::AccessDenied { .. }));
    let err = fx.admin.remove_member(lead.id, foreign.id).await.unwrap_err();
    assert!(matches!(err, DashportError::AccessDenied { .. }));
    let err = fx.admin.list_members(lead.id, g2.id).await.unwrap_err();
    assert!(matches!(err, DashportError::AccessDenied { .. }));

    let own = fx.admin.add_member(lead.id, g1.id, u.id).await.unwrap();
    let promoted = fx.admin.set_member_admin(lead.id, own.id, true).await.unwrap();
    assert!(promoted.is_admin);

    let members = fx.admin.list_members(lead.id, g1.id).await.unwrap();
    assert_eq!(members.len(), 2);
    assert!(members.iter().all(|m| m.profile.is_some()));
}

#[tokio::test]
async fn groups_and_dashboards_are_super_admin_only() {
    let fx = setup().await;
    let root = fx.profile("root@x.com", Role::SuperAdmin).await;
    let (g, lead) = fx.group_with_admin("G", "lead@x.com").await;

    let err = fx
        .admin
        .create_group(
            lead.id,
            CreateGroup {
                name: "Nope".into(),
                description: String::new(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DashportError::AccessDenied { .. }));
    let err = fx
        .admin
        .create_dashboard(lead.id, metabase(g.id, "Nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, DashportError::AccessDenied { .. }));

    let err = fx
        .admin
        .create_group(
            root.id,
            CreateGroup {
                name: "  ".into(),
                description: String::new(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DashportError::Validation { .. }));

    let err = fx
        .admin
        .create_dashboard(root.id, metabase(Uuid::new_v4(), "Orphan"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    fx.admin.create_dashboard(root.id, metabase(g.id, "D")).await.unwrap();
    fx.admin.delete_group(root.id, g.id).await.unwrap();
    assert_eq!(fx.row_count("dashboard").await, 0);
    assert_eq!(fx.row_count("group_member").await, 0);
}

#[tokio::test]
async fn visible_dashboards_depend_on_role_and_membership() {
    let fx = setup().await;
    let root = fx.profile("root@x.com", Role::SuperAdmin).await;
    let u = fx.profile("u@x.com", Role::User).await;
    let a = fx.group("A").await;
    let b = fx.group("B").await;
    fx.admin.create_dashboard(root.id, metabase(a.id, "A1")).await.unwrap();
    fx.admin.create_dashboard(root.id, metabase(b.id, "B1")).await.unwrap();
    fx.member(&a, &u, false).await;

    assert_eq!(fx.admin.visible_dashboards(root.id).await.unwrap().len(), 2);
    let mine = fx.admin.visible_dashboards(u.id).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].title, "A1");
}

#[tokio::test]
async fn users_listing_and_role_changes() {
    let fx = setup().await;
    let root = fx.profile("root@x.com", Role::SuperAdmin).await;
    let u = fx.profile("u@x.com", Role::User).await;
    let g = fx.group("G").await;
    fx.member(&g, &u, false).await;

    let err = fx.admin.list_users(u.id, Pagination::default()).await.unwrap_err();
    assert!(matches!(err, DashportError::AccessDenied { .. }));

    let page = fx.admin.list_users(root.id, Pagination::default()).await.unwrap();
    assert_eq!(page.total, 2);
    let listed = page.items.iter().find(|x| x.profile.id == u.id).unwrap();
    assert_eq!(listed.memberships.len(), 1);

    let changed = fx
        .admin
        .update_user_role(root.id, u.id, Role::GroupAdmin)
        .await
        .unwrap();
    assert_eq!(changed.role, Role::GroupAdmin);

    let confirmed = fx.admin.confirm_email(u.id).await.unwrap();
    assert!(confirmed.email_verified);
}
