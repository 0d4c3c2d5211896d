//! Shared fixtures: an in-memory store and a recording identity
//! provider.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use dashport_access::{AccessConfig, AdminService, InvitationService};
use dashport_core::error::{DashportError, DashportResult};
use dashport_core::identity::{
    AuthSession, Identity, IdentityProvider, InviteRequest, InvitedIdentity,
};
use dashport_core::models::group::{CreateGroup, Group};
use dashport_core::models::membership::{CreateMembership, GroupMember};
use dashport_core::models::profile::{EnsureProfile, Profile, Role, UpdateProfile};
use dashport_core::repository::{
    GroupRepository, MembershipRepository, PrivilegedStore, ProfileRepository,
};
use dashport_db::SurrealStore;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

pub type Store = SurrealStore<Db>;

/// Identity provider double that records every invite it is asked to
/// send.
#[derive(Default)]
pub struct RecordingIdentity {
    pub invites: Mutex<Vec<InviteRequest>>,
    /// Identity id handed back for invites, when set.
    pub provisioned_id: Mutex<Option<Uuid>>,
    pub fail_invites: Mutex<bool>,
}

impl RecordingIdentity {
    pub fn sent(&self) -> Vec<InviteRequest> {
        self.invites.lock().unwrap().clone()
    }

    pub fn provision(&self, id: Uuid) {
        *self.provisioned_id.lock().unwrap() = Some(id);
    }
}

impl IdentityProvider for RecordingIdentity {
    async fn send_magic_link(
        &self,
        _email: &str,
        _redirect_to: &str,
        _challenge: &str,
    ) -> DashportResult<()> {
        Ok(())
    }

    async fn exchange_code(&self, _code: &str, _verifier: &str) -> DashportResult<AuthSession> {
        Err(DashportError::Unauthenticated)
    }

    async fn get_user(&self, _access_token: &str) -> DashportResult<Identity> {
        Err(DashportError::Unauthenticated)
    }

    async fn invite_user_by_email(
        &self,
        request: InviteRequest,
    ) -> DashportResult<InvitedIdentity> {
        if *self.fail_invites.lock().unwrap() {
            return Err(DashportError::Upstream {
                service: "identity".into(),
                status: Some(422),
                message: "email rate limit exceeded".into(),
            });
        }
        self.invites.lock().unwrap().push(request);
        Ok(InvitedIdentity {
            id: *self.provisioned_id.lock().unwrap(),
        })
    }

    async fn sign_out(&self, _access_token: &str) -> DashportResult<()> {
        Ok(())
    }
}

pub struct Fixture {
    pub db: Surreal<Db>,
    pub store: Store,
    pub identity: Arc<RecordingIdentity>,
    pub invitations: InvitationService<Store, RecordingIdentity>,
    pub admin: AdminService<Store>,
}

pub async fn setup() -> Fixture {
    setup_with(AccessConfig::default()).await
}

pub async fn setup_with(config: AccessConfig) -> Fixture {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    dashport_db::run_migrations(&db).await.unwrap();

    let store = SurrealStore::new(db.clone());
    let identity = Arc::new(RecordingIdentity::default());
    Fixture {
        invitations: InvitationService::new(store.clone(), Arc::clone(&identity), config),
        admin: AdminService::new(store.clone()),
        db,
        store,
        identity,
    }
}

impl Fixture {
    pub async fn profile(&self, email: &str, role: Role) -> Profile {
        let profile = self
            .store
            .profiles()
            .ensure(EnsureProfile {
                id: Uuid::new_v4(),
                email: email.into(),
                full_name: None,
            })
            .await
            .unwrap();
        if role == Role::User {
            return profile;
        }
        self.store
            .profiles()
            .update(
                profile.id,
                UpdateProfile {
                    role: Some(role),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }

    pub async fn group(&self, name: &str) -> Group {
        self.store
            .groups()
            .create(CreateGroup {
                name: name.into(),
                description: String::new(),
            })
            .await
            .unwrap()
    }

    pub async fn member(&self, group: &Group, user: &Profile, is_admin: bool) -> GroupMember {
        self.store
            .members()
            .create(CreateMembership::active(group.id, user.id, is_admin))
            .await
            .unwrap()
    }

    /// A group together with an active admin of it.
    pub async fn group_with_admin(&self, name: &str, admin_email: &str) -> (Group, Profile) {
        let group = self.group(name).await;
        let admin = self.profile(admin_email, Role::GroupAdmin).await;
        self.member(&group, &admin, true).await;
        (group, admin)
    }

    /// Number of rows in `table`, read straight from the database.
    pub async fn row_count(&self, table: &str) -> u64 {
        #[derive(Debug, SurrealValue)]
        struct Count {
            total: u64,
        }
        let mut result = self
            .db
            .query(format!("SELECT count() AS total FROM {table} GROUP ALL"))
            .await
            .unwrap();
        let rows: Vec<Count> = result.take(0).unwrap();
        rows.first().map(|r| r.total).unwrap_or(0)
    }
}
