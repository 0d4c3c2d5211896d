//! Dashboards visible to the caller.

use axum::Json;
use axum::extract::{Path, State};
use dashport_core::identity::IdentityProvider;
use dashport_core::models::dashboard::Dashboard;
use dashport_core::repository::PrivilegedStore;
use dashport_embed::EmbedCredential;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::session::AuthUser;
use crate::state::AppState;

pub async fn visible<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    user: AuthUser,
) -> ApiResult<Json<Vec<Dashboard>>> {
    Ok(Json(state.admin.visible_dashboards(user.identity().id).await?))
}

/// Credential for a dashboard from the ids stored on it.
pub async fn embed_credential<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<EmbedCredential>> {
    Ok(Json(state.broker.get_embed_credential(user.identity().id, id).await?))
}
