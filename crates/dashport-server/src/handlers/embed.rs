//! Embed credential endpoints, one per BI backend.

use axum::Json;
use axum::extract::State;
use dashport_core::identity::IdentityProvider;
use dashport_core::repository::PrivilegedStore;
use dashport_embed::{MetabaseEmbed, PowerBiEmbed};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::session::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerBiRequest {
    pub dashboard_id: Uuid,
    pub workspace_id: Option<String>,
    pub report_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetabaseRequest {
    pub dashboard_id: Uuid,
    pub metabase_dashboard_id: Option<String>,
}

pub async fn powerbi<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    user: AuthUser,
    Json(body): Json<PowerBiRequest>,
) -> ApiResult<Json<PowerBiEmbed>> {
    let embed = state
        .broker
        .powerbi_embed(
            user.identity().id,
            body.dashboard_id,
            body.workspace_id,
            body.report_id,
        )
        .await?;
    Ok(Json(embed))
}

pub async fn metabase<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    user: AuthUser,
    Json(body): Json<MetabaseRequest>,
) -> ApiResult<Json<MetabaseEmbed>> {
    let embed = state
        .broker
        .metabase_embed(user.identity().id, body.dashboard_id, body.metabase_dashboard_id)
        .await?;
    Ok(Json(embed))
}
