//! Session extraction and the page gate.
//!
//! The session credential is the identity provider's access token, sent
//! either as a bearer header or in the `dashport-access-token` cookie.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use dashport_access::gate::{self, SessionState};
use dashport_core::error::DashportError;
use dashport_core::identity::{Identity, IdentityProvider};
use dashport_core::repository::PrivilegedStore;
use tower_cookies::Cookies;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;

pub const ACCESS_TOKEN_COOKIE: &str = "dashport-access-token";
pub const CODE_VERIFIER_COOKIE: &str = "dashport-code-verifier";

/// A verified caller.
#[derive(Debug, Clone)]
pub struct Session {
    pub identity: Identity,
    pub access_token: String,
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

/// Raw session token from the header, then the cookie.
pub fn session_token(headers: &HeaderMap, cookies: Option<&Cookies>) -> Option<String> {
    bearer_token(headers).or_else(|| {
        cookies?
            .get(ACCESS_TOKEN_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    })
}

async fn verify<I: IdentityProvider>(identity: &I, token: String) -> Result<Session, DashportError> {
    let identity = identity.get_user(&token).await?;
    Ok(Session {
        identity,
        access_token: token,
    })
}

/// Extractor for handlers that need an authenticated caller. Reuses the
/// session the gate already verified, if any.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Session);

impl AuthUser {
    pub fn identity(&self) -> &Identity {
        &self.0.identity
    }
}

impl<S, I> FromRequestParts<AppState<S, I>> for AuthUser
where
    S: PrivilegedStore,
    I: IdentityProvider + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S, I>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(Self(session.clone()));
        }
        let token = session_token(&parts.headers, parts.extensions.get::<Cookies>())
            .ok_or(DashportError::Unauthenticated)?;
        Ok(Self(verify(state.identity.as_ref(), token).await?))
    }
}

/// Middleware: verify the session once per request and redirect page
/// requests according to [`gate::decide`].
pub async fn gate<S, I>(
    State(state): State<AppState<S, I>>,
    mut request: Request,
    next: Next,
) -> Response
where
    S: PrivilegedStore,
    I: IdentityProvider + 'static,
{
    let token = session_token(request.headers(), request.extensions().get::<Cookies>());
    let session = match token {
        Some(token) => match verify(state.identity.as_ref(), token).await {
            Ok(session) => Some(session),
            Err(DashportError::Unauthenticated) => None,
            Err(e) => {
                warn!(error = %e, "Session verification failed");
                None
            }
        },
        None => None,
    };

    let session_state = match &session {
        None => SessionState::Anonymous,
        Some(session) => match state.admin.resolver().resolve_profile(&session.identity).await {
            Ok(profile) => SessionState::Authenticated {
                email_verified: profile.email_verified,
            },
            Err(e) => return ApiError(e).into_response(),
        },
    };

    let path = request.uri().path().to_string();
    let decision = gate::decide(&path, session_state);
    if let Some(location) = decision.location() {
        debug!(path = %path, ?decision, "Gate redirect");
        return Redirect::to(location).into_response();
    }

    if let Some(session) = session {
        request.extensions_mut().insert(session);
    }
    next.run(request).await
}
