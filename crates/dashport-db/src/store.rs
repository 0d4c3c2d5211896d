//! The privileged store: every repository over one root connection.

use dashport_core::repository::PrivilegedStore;
use surrealdb::{Connection, Surreal};

use crate::repository::{
    SurrealDashboardRepository, SurrealGroupRepository, SurrealInvitationRepository,
    SurrealMembershipRepository, SurrealProfileRepository,
};

/// SurrealDB implementation of [`PrivilegedStore`].
pub struct SurrealStore<C: Connection> {
    db: Surreal<C>,
    profiles: SurrealProfileRepository<C>,
    groups: SurrealGroupRepository<C>,
    members: SurrealMembershipRepository<C>,
    dashboards: SurrealDashboardRepository<C>,
    invitations: SurrealInvitationRepository<C>,
}

impl<C: Connection> SurrealStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            profiles: SurrealProfileRepository::new(db.clone()),
            groups: SurrealGroupRepository::new(db.clone()),
            members: SurrealMembershipRepository::new(db.clone()),
            dashboards: SurrealDashboardRepository::new(db.clone()),
            invitations: SurrealInvitationRepository::new(db.clone()),
            db,
        }
    }
}

// Manual impl: a derive would add a `C: Clone` bound.
impl<C: Connection> Clone for SurrealStore<C> {
    fn clone(&self) -> Self {
        Self::new(self.db.clone())
    }
}

impl<C: Connection> PrivilegedStore for SurrealStore<C> {
    type Profiles = SurrealProfileRepository<C>;
    type Groups = SurrealGroupRepository<C>;
    type Members = SurrealMembershipRepository<C>;
    type Dashboards = SurrealDashboardRepository<C>;
    type Invitations = SurrealInvitationRepository<C>;

    fn profiles(&self) -> &Self::Profiles {
        &self.profiles
    }

    fn groups(&self) -> &Self::Groups {
        &self.groups
    }

    fn members(&self) -> &Self::Members {
        &self.members
    }

    fn dashboards(&self) -> &Self::Dashboards {
        &self.dashboards
    }

    fn invitations(&self) -> &Self::Invitations {
        &self.invitations
    }
}
