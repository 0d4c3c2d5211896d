//! Login, callback, logout and the caller's own profile.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use dashport_access::gate::{CONFIRM_EMAIL_PATH, DASHBOARD_PATH, LOGIN_PATH};
use dashport_access::token;
use dashport_core::identity::IdentityProvider;
use dashport_core::models::profile::{EnsureProfile, Profile, Role};
use dashport_core::repository::{PrivilegedStore, ProfileRepository};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_cookies::cookie::SameSite;
use tower_cookies::cookie::time::Duration;
use tower_cookies::{Cookie, Cookies};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::session::{ACCESS_TOKEN_COOKIE, AuthUser, CODE_VERIFIER_COOKIE, session_token};
use crate::state::AppState;

/// Lifetime of the PKCE verifier cookie; the magic link must be
/// followed within it.
const VERIFIER_TTL_MINUTES: i64 = 15;
const DEFAULT_SESSION_SECS: u64 = 3600;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub profile: Profile,
    pub role: Role,
    pub is_group_admin: bool,
    pub managed_groups: Vec<Uuid>,
}

fn http_only(name: &'static str, value: String, path: &'static str, max_age: Duration) -> Cookie<'static> {
    Cookie::build((name, value))
        .path(path)
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

fn removal(name: &'static str, path: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path(path).build()
}

fn login_error(reason: &str) -> Redirect {
    Redirect::to(&format!("{LOGIN_PATH}?error={reason}"))
}

/// Send a magic link. The PKCE verifier stays in an HTTP-only cookie
/// until the callback.
pub async fn login<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    cookies: Cookies,
    Json(body): Json<LoginRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let email = body.email.trim().to_lowercase();
    let verifier = token::generate_code_verifier();
    state
        .identity
        .send_magic_link(&email, &state.access.auth_callback_url(), &token::code_challenge(&verifier))
        .await?;

    cookies.add(http_only(
        CODE_VERIFIER_COOKIE,
        verifier,
        "/auth",
        Duration::minutes(VERIFIER_TTL_MINUTES),
    ));
    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "magic_link_sent" }))))
}

/// Magic-link landing: exchange the code, make sure the profile exists,
/// apply any pending invitation and start the session.
pub async fn callback<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    cookies: Cookies,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    if let Some(error) = query.error {
        warn!(error = %error, "Identity provider returned an error to the callback");
        return login_error("auth_failed");
    }
    let Some(code) = query.code else {
        return login_error("missing_code");
    };
    let Some(verifier) = cookies.get(CODE_VERIFIER_COOKIE).map(|c| c.value().to_string()) else {
        return login_error("session_expired");
    };
    cookies.remove(removal(CODE_VERIFIER_COOKIE, "/auth"));

    let session = match state.identity.exchange_code(&code, &verifier).await {
        Ok(session) => session,
        Err(e) => {
            warn!(error = %e, "Code exchange failed");
            return login_error("auth_failed");
        }
    };

    let profile = match state
        .store
        .profiles()
        .ensure(EnsureProfile {
            id: session.user.id,
            email: session.user.email.clone(),
            full_name: None,
        })
        .await
    {
        Ok(profile) => profile,
        Err(e) => {
            warn!(user_id = %session.user.id, error = %e, "Could not record sign-in");
            return login_error("profile_unavailable");
        }
    };

    // Sign-in succeeds even when the invitation cannot be applied.
    if let Err(e) = state.invitations.reconcile_on_sign_in(&session.user).await {
        warn!(user_id = %profile.id, error = %e, "Invitation reconciliation at sign-in failed");
    }

    let lifetime = session.expires_in.unwrap_or(DEFAULT_SESSION_SECS);
    cookies.add(http_only(
        ACCESS_TOKEN_COOKIE,
        session.access_token,
        "/",
        Duration::seconds(i64::try_from(lifetime).unwrap_or(i64::MAX)),
    ));
    info!(user_id = %profile.id, "Signed in");

    if profile.email_verified {
        Redirect::to(DASHBOARD_PATH)
    } else {
        Redirect::to(CONFIRM_EMAIL_PATH)
    }
}

/// End the session. A token the provider no longer knows is fine.
pub async fn logout<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    cookies: Cookies,
    headers: axum::http::HeaderMap,
) -> Redirect {
    if let Some(token) = session_token(&headers, Some(&cookies)) {
        if let Err(e) = state.identity.sign_out(&token).await {
            warn!(error = %e, "Sign-out at the identity provider failed");
        }
    }
    cookies.remove(removal(ACCESS_TOKEN_COOKIE, "/"));
    Redirect::to(LOGIN_PATH)
}

pub async fn confirm_email<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    user: AuthUser,
) -> ApiResult<Json<Profile>> {
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
    Ok(Json(state.admin.confirm_email(identity.id).await?))
}

pub async fn me<S: PrivilegedStore, I: IdentityProvider + 'static>(
    State(state): State<AppState<S, I>>,
    user: AuthUser,
) -> ApiResult<Json<MeResponse>> {
    let resolver = state.admin.resolver();
    let profile = resolver.resolve_profile(user.identity()).await?;
    let managed_groups = resolver.managed_groups(profile.id).await?;
    Ok(Json(MeResponse {
        role: profile.role,
        is_group_admin: !managed_groups.is_empty(),
        managed_groups,
        profile,
    }))
}
