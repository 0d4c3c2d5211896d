//! Administrative endpoints. Every operation is gated in the service
//! layer; handlers only translate HTTP.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use dashport_access::UserWithMemberships;
use dashport_access::admin::MemberWithProfile;
use dashport_core::identity::IdentityProvider;
use dashport_core::models::dashboard::{CreateDashboard, Dashboard, UpdateDashboard};
use dashport_core::models::group::{CreateGroup, Group, UpdateGroup};
use dashport_core::models::membership::GroupMember;
use dashport_core::models::profile::{Profile, Role};
use dashport_core::error::{DashportError, DashportResult};
use dashport_core::repository::{PaginatedResult, PrivilegedStore};
use dashport_embed::url::{PowerBiReportRef, extract_metabase_dashboard_id, parse_powerbi_url};
use serde::Deserialize;
use uuid::Uuid;

use super::PageQuery;
use crate::error::ApiResult;
use crate::session::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Deserialize)]
pub struct AdminFlagRequest {
    pub is_admin: bool,
}

/// Promote the caller if nobody holds the super admin role yet.
pub async fn bootstrap<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    user: AuthUser,
) -> ApiResult<Json<Profile>> {
    let profile = state
        .admin
        .promote_first_super_admin(&user.identity().email)
        .await?;
    Ok(Json(profile))
}

// -- Users ---------------------------------------------------------------

pub async fn list_users<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    user: AuthUser,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<PaginatedResult<UserWithMemberships>>> {
    Ok(Json(state.admin.list_users(user.identity().id, page.into()).await?))
}

pub async fn update_user_role<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<RoleRequest>,
) -> ApiResult<Json<Profile>> {
    let profile = state
        .admin
        .update_user_role(user.identity().id, id, body.role)
        .await?;
    Ok(Json(profile))
}

// -- Groups --------------------------------------------------------------

/// Groups the caller administers; every group for a super admin.
pub async fn list_groups<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    user: AuthUser,
) -> ApiResult<Json<Vec<Group>>> {
    Ok(Json(state.admin.administered_groups(user.identity().id).await?))
}

pub async fn create_group<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    user: AuthUser,
    Json(body): Json<CreateGroup>,
) -> ApiResult<(StatusCode, Json<Group>)> {
    let group = state.admin.create_group(user.identity().id, body).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn update_group<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateGroup>,
) -> ApiResult<Json<Group>> {
    Ok(Json(state.admin.update_group(user.identity().id, id, body).await?))
}

pub async fn delete_group<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.admin.delete_group(user.identity().id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// -- Members -------------------------------------------------------------

pub async fn list_members<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    user: AuthUser,
    Path(group_id): Path<Uuid>,
) -> ApiResult<Json<Vec<MemberWithProfile>>> {
    Ok(Json(state.admin.list_members(user.identity().id, group_id).await?))
}

pub async fn add_member<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    user: AuthUser,
    Path(group_id): Path<Uuid>,
    Json(body): Json<AddMemberRequest>,
) -> ApiResult<(StatusCode, Json<GroupMember>)> {
    let actor = user.identity().id;
    let mut member = state.admin.add_member(actor, group_id, body.user_id).await?;
    if body.is_admin && !member.is_admin {
        member = state.admin.set_member_admin(actor, member.id, true).await?;
    }
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn remove_member<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<GroupMember>> {
    Ok(Json(state.admin.remove_member(user.identity().id, id).await?))
}

pub async fn set_member_admin<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<AdminFlagRequest>,
) -> ApiResult<Json<GroupMember>> {
    let member = state
        .admin
        .set_member_admin(user.identity().id, id, body.is_admin)
        .await?;
    Ok(Json(member))
}

// -- Dashboards ----------------------------------------------------------

/// Admins may paste a report URL into either Power BI field; both ids
/// are then taken from it.
fn pasted_powerbi(fields: [Option<&str>; 2]) -> DashportResult<Option<PowerBiReportRef>> {
    let Some(url) = fields.into_iter().flatten().find(|v| v.contains("://")) else {
        return Ok(None);
    };
    parse_powerbi_url(url)
        .map(Some)
        .ok_or_else(|| DashportError::validation("unrecognized Power BI report URL"))
}

/// A Metabase dashboard URL is reduced to its numeric id.
fn metabase_id(value: &str) -> DashportResult<String> {
    if !value.contains('/') {
        return Ok(value.to_string());
    }
    extract_metabase_dashboard_id(value)
        .ok_or_else(|| DashportError::validation("unrecognized Metabase dashboard URL"))
}

pub async fn list_dashboards<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    user: AuthUser,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<PaginatedResult<Dashboard>>> {
    Ok(Json(state.admin.list_dashboards(user.identity().id, page.into()).await?))
}

pub async fn create_dashboard<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    user: AuthUser,
    Json(mut body): Json<CreateDashboard>,
) -> ApiResult<(StatusCode, Json<Dashboard>)> {
    if let Some(pasted) = pasted_powerbi([
        body.powerbi_report_id.as_deref(),
        body.powerbi_workspace_id.as_deref(),
    ])? {
        body.powerbi_workspace_id = Some(pasted.workspace_id);
        body.powerbi_report_id = Some(pasted.report_id);
    }
    if let Some(id) = body.metabase_dashboard_id.as_mut() {
        *id = metabase_id(id)?;
    }
    let dashboard = state.admin.create_dashboard(user.identity().id, body).await?;
    Ok((StatusCode::CREATED, Json(dashboard)))
}

pub async fn update_dashboard<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(mut body): Json<UpdateDashboard>,
) -> ApiResult<Json<Dashboard>> {
    if let Some(pasted) = pasted_powerbi([
        body.powerbi_report_id.as_ref().and_then(|v| v.as_deref()),
        body.powerbi_workspace_id.as_ref().and_then(|v| v.as_deref()),
    ])? {
        body.powerbi_workspace_id = Some(Some(pasted.workspace_id));
        body.powerbi_report_id = Some(Some(pasted.report_id));
    }
    if let Some(Some(id)) = body.metabase_dashboard_id.as_mut() {
        *id = metabase_id(id)?;
    }
    Ok(Json(state.admin.update_dashboard(user.identity().id, id, body).await?))
}

pub async fn delete_dashboard<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.admin.delete_dashboard(user.identity().id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
