//! Metabase static embedding tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::MetabaseConfig;
use crate::error::EmbedError;

/// Lifetime of a signed embedding token.
pub const EMBED_TOKEN_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbedResource {
    pub dashboard: u64,
}

/// Claims Metabase expects in an embedding JWT.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbedClaims {
    pub resource: EmbedResource,
    /// Locked filter values; empty when the dashboard is unfiltered.
    pub params: Map<String, Value>,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetabaseEmbed {
    pub token: String,
    /// Expiry in milliseconds since the epoch.
    pub expires_at: i64,
    pub site_url: String,
}

#[derive(Clone)]
pub struct MetabaseSigner {
    config: MetabaseConfig,
    key: EncodingKey,
}

impl MetabaseSigner {
    pub fn new(config: MetabaseConfig) -> Self {
        let key = EncodingKey::from_secret(config.secret_key.as_bytes());
        Self { config, key }
    }

    /// Sign an HS256 token for one dashboard.
    pub fn sign(
        &self,
        dashboard_id: &str,
        params: Map<String, Value>,
    ) -> Result<MetabaseEmbed, EmbedError> {
        let dashboard: u64 = dashboard_id.trim().parse().map_err(|_| {
            EmbedError::InvalidIdentifier(format!("Metabase dashboard id '{dashboard_id}'"))
        })?;
        let expires = Utc::now() + Duration::seconds(EMBED_TOKEN_TTL_SECS);
        let claims = EmbedClaims {
            resource: EmbedResource { dashboard },
            params,
            exp: expires.timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.key)
            .map_err(|e| EmbedError::MetabaseSigning(e.to_string()))?;

        Ok(MetabaseEmbed {
            token,
            expires_at: expires.timestamp_millis(),
            site_url: self.config.site_url.trim_end_matches('/').to_string(),
        })
    }
}
