//! Power BI embedding through an Azure AD service principal.
//!
//! Each embed request runs three calls: a client-credentials grant for
//! an AAD bearer token, a report lookup for the embed URL, and a
//! `GenerateToken` call for a view-only embed token. The AAD token is
//! used for that one request only.

use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error};

use crate::config::{POWERBI_SCOPE, PowerBiConfig};
use crate::error::EmbedError;

/// Embed payload handed to the Power BI JavaScript SDK.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PowerBiEmbed {
    pub report_id: String,
    pub embed_url: String,
    pub access_token: String,
    pub token_expiry: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct AadTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportResponse {
    id: String,
    embed_url: String,
}

#[derive(Debug, Deserialize)]
struct GenerateTokenResponse {
    token: String,
    expiration: DateTime<Utc>,
}

/// Pull a readable message out of an AAD or Power BI error body.
fn error_message(body: &Value) -> Option<String> {
    body.get("error_description")
        .and_then(Value::as_str)
        .or_else(|| body.pointer("/error/message").and_then(Value::as_str))
        .or_else(|| body.get("message").and_then(Value::as_str))
        .or_else(|| body.get("error").and_then(Value::as_str))
        .map(str::to_string)
}

/// Identifiers end up in URL paths; Power BI ids are GUIDs.
fn check_id(kind: &str, value: &str) -> Result<(), EmbedError> {
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(EmbedError::InvalidIdentifier(format!("{kind} '{value}'")));
    }
    Ok(())
}

#[derive(Clone)]
pub struct PowerBiClient {
    client: Client,
    config: PowerBiConfig,
}

impl PowerBiClient {
    pub fn new(config: PowerBiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn report_url(&self, workspace_id: &str, report_id: &str) -> String {
        format!(
            "{}/v1.0/myorg/groups/{workspace_id}/reports/{report_id}",
            self.config.api_url.trim_end_matches('/')
        )
    }

    /// Status and message of a failed response.
    async fn failure(stage: &str, response: Response) -> (Option<u16>, String) {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = error_message(&body).unwrap_or_else(|| status.to_string());
        error!(stage, status = status.as_u16(), message = %message, "Power BI call failed");
        (Some(status.as_u16()), message)
    }

    /// Client-credentials grant against Azure AD.
    pub async fn access_token(&self) -> Result<String, EmbedError> {
        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.config.authority_url.trim_end_matches('/'),
            self.config.tenant_id
        );
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("scope", POWERBI_SCOPE),
        ];
        let auth_error = |status, message| EmbedError::PowerBiAuth { status, message };

        let response = self
            .client
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(|e| auth_error(None, e.to_string()))?;
        if !response.status().is_success() {
            let (status, message) = Self::failure("aad_token", response).await;
            return Err(auth_error(status, message));
        }
        let token: AadTokenResponse = response
            .json()
            .await
            .map_err(|e| auth_error(None, format!("malformed token response: {e}")))?;
        Ok(token.access_token)
    }

    async fn report(
        &self,
        bearer: &str,
        workspace_id: &str,
        report_id: &str,
    ) -> Result<ReportResponse, EmbedError> {
        let lookup_error = |status, message| EmbedError::ReportLookup { status, message };
        let response = self
            .client
            .get(self.report_url(workspace_id, report_id))
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| lookup_error(None, e.to_string()))?;
        if !response.status().is_success() {
            let (status, message) = Self::failure("report", response).await;
            return Err(lookup_error(status, message));
        }
        response
            .json()
            .await
            .map_err(|e| lookup_error(None, format!("malformed report response: {e}")))
    }

    async fn generate_token(
        &self,
        bearer: &str,
        workspace_id: &str,
        report_id: &str,
    ) -> Result<GenerateTokenResponse, EmbedError> {
        let token_error = |status, message| EmbedError::EmbedToken { status, message };
        let response = self
            .client
            .post(format!(
                "{}/GenerateToken",
                self.report_url(workspace_id, report_id)
            ))
            .bearer_auth(bearer)
            .json(&json!({ "accessLevel": "View", "allowSaveAs": false }))
            .send()
            .await
            .map_err(|e| token_error(None, e.to_string()))?;
        if !response.status().is_success() {
            let (status, message) = Self::failure("generate_token", response).await;
            return Err(token_error(status, message));
        }
        response
            .json()
            .await
            .map_err(|e| token_error(None, format!("malformed embed token response: {e}")))
    }

    /// Run the full flow for one report.
    pub async fn embed(&self, workspace_id: &str, report_id: &str) -> Result<PowerBiEmbed, EmbedError> {
        check_id("workspace id", workspace_id)?;
        check_id("report id", report_id)?;

        let bearer = self.access_token().await?;
        let report = self.report(&bearer, workspace_id, report_id).await?;
        let token = self.generate_token(&bearer, workspace_id, report_id).await?;
        debug!(report_id = %report.id, expires = %token.expiration, "Issued Power BI embed token");

        Ok(PowerBiEmbed {
            report_id: report.id,
            embed_url: report.embed_url,
            access_token: token.token,
            token_expiry: token.expiration,
        })
    }
}
