//! Dashboard access broker.
//!
//! Every credential request walks the same checks in order: the
//! dashboard must exist, the caller must be allowed to view it, and it
//! must carry the ids its backend needs. Only then is the backend
//! contacted.

use dashport_access::AccessResolver;
use dashport_core::error::{DashportError, DashportResult};
use dashport_core::models::dashboard::{BiTarget, Dashboard, DashboardType};
use dashport_core::repository::{DashboardRepository, PrivilegedStore};
use serde::Serialize;
use serde_json::Map;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::EmbedConfig;
use crate::error::EmbedError;
use crate::metabase::{MetabaseEmbed, MetabaseSigner};
use crate::powerbi::{PowerBiClient, PowerBiEmbed};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EmbedCredential {
    Powerbi(PowerBiEmbed),
    Metabase(MetabaseEmbed),
}

#[derive(Clone)]
pub struct EmbedBroker<S: PrivilegedStore> {
    store: S,
    resolver: AccessResolver<S>,
    powerbi: Option<PowerBiClient>,
    metabase: Option<MetabaseSigner>,
}

/// An explicit id from the request wins over the stored one.
fn pick(explicit: Option<String>, stored: &Option<String>) -> Option<String> {
    let present = |v: &str| Some(v.trim().to_string()).filter(|v| !v.is_empty());
    explicit
        .as_deref()
        .and_then(present)
        .or_else(|| stored.as_deref().and_then(present))
}

impl<S: PrivilegedStore> EmbedBroker<S> {
    pub fn new(store: S, config: EmbedConfig) -> Self {
        Self {
            resolver: AccessResolver::new(store.clone()),
            store,
            powerbi: config.powerbi.map(PowerBiClient::new),
            metabase: config.metabase.map(MetabaseSigner::new),
        }
    }

    /// Load the dashboard and check the caller may view it.
    async fn authorize(&self, user_id: Uuid, dashboard_id: Uuid) -> DashportResult<Dashboard> {
        let dashboard = self.store.dashboards().get_by_id(dashboard_id).await?;
        if !self.resolver.can_view(user_id, &dashboard).await? {
            warn!(%user_id, %dashboard_id, "Dashboard access denied");
            return Err(DashportError::access_denied(
                "no active membership in the dashboard's group",
            ));
        }
        Ok(dashboard)
    }

    fn powerbi(&self) -> Result<&PowerBiClient, EmbedError> {
        self.powerbi.as_ref().ok_or(EmbedError::NotConfigured("Power BI"))
    }

    fn metabase(&self) -> Result<&MetabaseSigner, EmbedError> {
        self.metabase.as_ref().ok_or(EmbedError::NotConfigured("Metabase"))
    }

    fn not_configured(dashboard: &Dashboard) -> DashportError {
        DashportError::DashboardNotConfigured {
            id: dashboard.id.to_string(),
        }
    }

    /// Embed credential for a dashboard, using the ids stored on it.
    pub async fn get_embed_credential(
        &self,
        user_id: Uuid,
        dashboard_id: Uuid,
    ) -> DashportResult<EmbedCredential> {
        let dashboard = self.authorize(user_id, dashboard_id).await?;
        let target = dashboard
            .bi_target()
            .ok_or_else(|| Self::not_configured(&dashboard))?;

        let credential = match target {
            BiTarget::Powerbi {
                workspace_id,
                report_id,
            } => EmbedCredential::Powerbi(self.powerbi()?.embed(&workspace_id, &report_id).await?),
            BiTarget::Metabase { dashboard_id } => {
                EmbedCredential::Metabase(self.metabase()?.sign(&dashboard_id, Map::new())?)
            }
        };
        info!(%user_id, %dashboard_id, backend = %dashboard.dashboard_type, "Issued embed credential");
        Ok(credential)
    }

    /// Power BI credential. Request ids take precedence over the stored
    /// ones once access is granted.
    pub async fn powerbi_embed(
        &self,
        user_id: Uuid,
        dashboard_id: Uuid,
        workspace_id: Option<String>,
        report_id: Option<String>,
    ) -> DashportResult<PowerBiEmbed> {
        let dashboard = self.authorize(user_id, dashboard_id).await?;
        if dashboard.dashboard_type != DashboardType::Powerbi {
            return Err(DashportError::validation("dashboard is not a Power BI dashboard"));
        }
        let (Some(workspace_id), Some(report_id)) = (
            pick(workspace_id, &dashboard.powerbi_workspace_id),
            pick(report_id, &dashboard.powerbi_report_id),
        ) else {
            return Err(Self::not_configured(&dashboard));
        };

        let embed = self.powerbi()?.embed(&workspace_id, &report_id).await?;
        info!(%user_id, %dashboard_id, "Issued Power BI embed token");
        Ok(embed)
    }

    /// Metabase credential. A request id takes precedence over the
    /// stored one once access is granted.
    pub async fn metabase_embed(
        &self,
        user_id: Uuid,
        dashboard_id: Uuid,
        metabase_dashboard_id: Option<String>,
    ) -> DashportResult<MetabaseEmbed> {
        let dashboard = self.authorize(user_id, dashboard_id).await?;
        if dashboard.dashboard_type != DashboardType::Metabase {
            return Err(DashportError::validation("dashboard is not a Metabase dashboard"));
        }
        let Some(metabase_id) = pick(metabase_dashboard_id, &dashboard.metabase_dashboard_id) else {
            return Err(Self::not_configured(&dashboard));
        };

        let embed = self.metabase()?.sign(&metabase_id, Map::new())?;
        info!(%user_id, %dashboard_id, "Issued Metabase embed token");
        Ok(embed)
    }
}
