//! Shared application state handed to every handler.

use std::sync::Arc;

use dashport_access::{AccessConfig, AdminService, InvitationService};
use dashport_core::identity::IdentityProvider;
use dashport_core::repository::PrivilegedStore;
use dashport_embed::{EmbedBroker, EmbedConfig};

pub struct AppState<S: PrivilegedStore, I: IdentityProvider> {
    pub store: S,
    pub identity: Arc<I>,
    pub access: Arc<AccessConfig>,
    pub invitations: InvitationService<S, I>,
    pub admin: AdminService<S>,
    pub broker: EmbedBroker<S>,
}

impl<S: PrivilegedStore, I: IdentityProvider> AppState<S, I> {
    pub fn new(store: S, identity: Arc<I>, access: AccessConfig, embed: EmbedConfig) -> Self {
        Self {
            invitations: InvitationService::new(store.clone(), Arc::clone(&identity), access.clone()),
            admin: AdminService::new(store.clone()),
            broker: EmbedBroker::new(store.clone(), embed),
            access: Arc::new(access),
            identity,
            store,
        }
    }
}

impl<S: PrivilegedStore, I: IdentityProvider> Clone for AppState<S, I> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            identity: Arc::clone(&self.identity),
            access: Arc::clone(&self.access),
            invitations: self.invitations.clone(),
            admin: self.admin.clone(),
            broker: self.broker.clone(),
        }
    }
}
