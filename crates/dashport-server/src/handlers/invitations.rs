//! Invitation endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use dashport_access::{AcceptanceReport, NewInvitation};
use dashport_core::error::DashportError;
use dashport_core::identity::IdentityProvider;
use dashport_core::models::invitation::{Invitation, InvitationLookup};
use dashport_core::models::profile::EnsureProfile;
use dashport_core::repository::{PaginatedResult, PrivilegedStore, ProfileRepository};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PageQuery;
use crate::error::ApiResult;
use crate::session::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct AcceptRequest {
    pub token: String,
}

/// A freshly created invitation. The token is only ever returned here.
#[derive(Debug, Serialize)]
pub struct CreatedInvitation {
    pub invitation: Invitation,
    pub token: String,
    pub invite_url: String,
}

/// Public: what an invitee sees before signing in.
pub async fn lookup<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<Json<InvitationLookup>> {
    let found = state.invitations.lookup(query.token.trim()).await?;
    Ok(Json(found.ok_or(DashportError::InvalidInvitation)?))
}

pub async fn accept<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    user: AuthUser,
    Json(body): Json<AcceptRequest>,
) -> ApiResult<Json<AcceptanceReport>> {
    let identity = user.identity();
    state
        .store
        .profiles()
        .ensure(EnsureProfile {
            id: identity.id,
            email: identity.email.clone(),
            full_name: None,
        })
        .await?;
    let report = state.invitations.accept(body.token.trim(), identity.id).await?;
    Ok(Json(report))
}

pub async fn list<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    user: AuthUser,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<PaginatedResult<Invitation>>> {
    let invitations = state.invitations.list(user.identity().id, page.into()).await?;
    Ok(Json(invitations))
}

pub async fn create<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    user: AuthUser,
    Json(body): Json<NewInvitation>,
) -> ApiResult<(StatusCode, Json<CreatedInvitation>)> {
    let invitation = state.invitations.create(user.identity().id, body).await?;
    let created = CreatedInvitation {
        token: invitation.token.clone(),
        invite_url: state.access.accept_invite_url(&invitation.token),
        invitation,
    };
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.invitations.delete(user.identity().id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
