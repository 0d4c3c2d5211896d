//! Dashboard domain model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// BI backend a dashboard is rendered by.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DashboardType {
    Powerbi,
    Metabase,
}

impl DashboardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DashboardType::Powerbi => "powerbi",
            DashboardType::Metabase => "metabase",
        }
    }
}

impl fmt::Display for DashboardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DashboardType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "powerbi" => Ok(DashboardType::Powerbi),
            "metabase" => Ok(DashboardType::Metabase),
            other => Err(format!("unknown dashboard type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub group_id: Uuid,
    pub dashboard_type: DashboardType,
    pub powerbi_workspace_id: Option<String>,
    pub powerbi_report_id: Option<String>,
    pub metabase_dashboard_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Backend-specific identifiers of a configured dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BiTarget {
    Powerbi {
        workspace_id: String,
        report_id: String,
    },
    Metabase {
        dashboard_id: String,
    },
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl Dashboard {
    /// The identifiers required by this dashboard's backend, or `None`
    /// when any of them is missing.
    pub fn bi_target(&self) -> Option<BiTarget> {
        match self.dashboard_type {
            DashboardType::Powerbi => Some(BiTarget::Powerbi {
                workspace_id: present(&self.powerbi_workspace_id)?,
                report_id: present(&self.powerbi_report_id)?,
            }),
            DashboardType::Metabase => Some(BiTarget::Metabase {
                dashboard_id: present(&self.metabase_dashboard_id)?,
            }),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.bi_target().is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDashboard {
    pub title: String,
    pub description: String,
    pub group_id: Uuid,
    pub dashboard_type: DashboardType,
    pub powerbi_workspace_id: Option<String>,
    pub powerbi_report_id: Option<String>,
    pub metabase_dashboard_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateDashboard {
    pub title: Option<String>,
    pub description: Option<String>,
    pub group_id: Option<Uuid>,
    pub dashboard_type: Option<DashboardType>,
    /// `Some(Some(val))` = set, `Some(None)` = clear, `None` = no change.
    pub powerbi_workspace_id: Option<Option<String>>,
    pub powerbi_report_id: Option<Option<String>>,
    pub metabase_dashboard_id: Option<Option<String>>,
}
