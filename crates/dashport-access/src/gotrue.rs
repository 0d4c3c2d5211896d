//! HTTP client for a GoTrue-compatible identity provider.

use dashport_core::error::DashportResult;
use dashport_core::identity::{
    AuthSession, Identity, IdentityProvider, InviteRequest, InvitedIdentity,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::config::GoTrueConfig;
use crate::error::IdentityError;

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    user: UserResponse,
}

#[derive(Debug, Serialize)]
struct OtpRequest<'a> {
    email: &'a str,
    create_user: bool,
    code_challenge: &'a str,
    code_challenge_method: &'static str,
}

#[derive(Debug, Serialize)]
struct PkceRequest<'a> {
    auth_code: &'a str,
    code_verifier: &'a str,
}

/// Error body shapes GoTrue uses across versions.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
}

impl UserResponse {
    fn into_identity(self) -> Result<Identity, IdentityError> {
        let email = self
            .email
            .ok_or_else(|| IdentityError::Decode("user has no email".into()))?;
        Ok(Identity {
            id: self.id,
            email: email.to_lowercase(),
        })
    }
}

#[derive(Clone)]
pub struct GoTrueClient {
    client: Client,
    config: GoTrueConfig,
}

impl GoTrueClient {
    pub fn new(config: GoTrueConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, IdentityError> {
        let base = self.config.url.trim_end_matches('/');
        Url::parse(&format!("{base}/auth/v1/{path}"))
            .map_err(|e| IdentityError::Decode(format!("bad identity URL: {e}")))
    }

    fn with_redirect(mut url: Url, redirect_to: &str) -> Url {
        url.query_pairs_mut().append_pair("redirect_to", redirect_to);
        url
    }

    fn user_scoped(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", &self.config.anon_key)
    }

    fn service_scoped(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.config.service_key)
            .bearer_auth(&self.config.service_key)
    }

    /// Turn a non-success response into a typed rejection.
    async fn ensure_success(operation: &str, response: Response) -> Result<Response, IdentityError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body: ErrorBody = response.json().await.unwrap_or_default();
        let message = body
            .msg
            .or(body.message)
            .or(body.error_description)
            .unwrap_or_else(|| status.to_string());
        error!(operation, status = status.as_u16(), message = %message, "Identity provider call failed");
        Err(IdentityError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

impl IdentityProvider for GoTrueClient {
    async fn send_magic_link(
        &self,
        email: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> DashportResult<()> {
        let url = Self::with_redirect(self.endpoint("otp")?, redirect_to);
        let response = self
            .user_scoped(self.client.post(url))
            .json(&OtpRequest {
                email,
                create_user: false,
                code_challenge,
                code_challenge_method: "s256",
            })
            .send()
            .await
            .map_err(IdentityError::from)?;
        Self::ensure_success("otp", response).await?;
        Ok(())
    }

    async fn exchange_code(&self, auth_code: &str, code_verifier: &str) -> DashportResult<AuthSession> {
        let mut url = self.endpoint("token")?;
        url.query_pairs_mut().append_pair("grant_type", "pkce");
        let response = self
            .user_scoped(self.client.post(url))
            .json(&PkceRequest {
                auth_code,
                code_verifier,
            })
            .send()
            .await
            .map_err(IdentityError::from)?;
        let response = Self::ensure_success("token", response).await?;
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Decode(e.to_string()))?;

        Ok(AuthSession {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in: token.expires_in,
            user: token.user.into_identity()?,
        })
    }

    async fn get_user(&self, access_token: &str) -> DashportResult<Identity> {
        let response = self
            .user_scoped(self.client.get(self.endpoint("user")?))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(IdentityError::from)?;
        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Err(IdentityError::SessionRejected.into());
        }
        let response = Self::ensure_success("user", response).await?;
        let user: UserResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Decode(e.to_string()))?;
        Ok(user.into_identity()?)
    }

    async fn invite_user_by_email(&self, request: InviteRequest) -> DashportResult<InvitedIdentity> {
        let url = Self::with_redirect(self.endpoint("invite")?, &request.redirect_to);
        let response = self
            .service_scoped(self.client.post(url))
            .json(&json!({
                "email": request.email,
                "data": request.metadata,
            }))
            .send()
            .await
            .map_err(IdentityError::from)?;
        let response = Self::ensure_success("invite", response).await?;

        // Older servers answer with an empty body.
        let invited: Option<UserResponse> = response.json().await.ok();
        Ok(InvitedIdentity {
            id: invited.map(|u| u.id),
        })
    }

    async fn sign_out(&self, access_token: &str) -> DashportResult<()> {
        let response = self
            .user_scoped(self.client.post(self.endpoint("logout")?))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(IdentityError::from)?;
        // An already-invalid session is as good as signed out.
        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        Self::ensure_success("logout", response).await?;
        Ok(())
    }
}
