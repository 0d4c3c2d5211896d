//! SurrealDB implementation of [`DashboardRepository`].

use chrono::{DateTime, Utc};
use dashport_core::error::DashportResult;
use dashport_core::models::dashboard::{
    CreateDashboard, Dashboard, DashboardType, UpdateDashboard,
};
use dashport_core::repository::{DashboardRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid, statement_error, uuid_strings};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct DashboardRow {
    title: String,
    description: String,
    group_id: String,
    dashboard_type: String,
    powerbi_workspace_id: Option<String>,
    powerbi_report_id: Option<String>,
    metabase_dashboard_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct DashboardRowWithId {
    record_id: String,
    title: String,
    description: String,
    group_id: String,
    dashboard_type: String,
    powerbi_workspace_id: Option<String>,
    powerbi_report_id: Option<String>,
    metabase_dashboard_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_type(s: &str) -> Result<DashboardType, DbError> {
    s.parse().map_err(DbError::Decode)
}

impl DashboardRow {
    fn into_dashboard(self, id: Uuid) -> Result<Dashboard, DbError> {
        Ok(Dashboard {
            id,
            title: self.title,
            description: self.description,
            group_id: parse_uuid(&self.group_id, "group")?,
            dashboard_type: parse_type(&self.dashboard_type)?,
            powerbi_workspace_id: self.powerbi_workspace_id,
            powerbi_report_id: self.powerbi_report_id,
            metabase_dashboard_id: self.metabase_dashboard_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl DashboardRowWithId {
    fn try_into_dashboard(self) -> Result<Dashboard, DbError> {
        let id = parse_uuid(&self.record_id, "dashboard")?;
        DashboardRow {
            title: self.title,
            description: self.description,
            group_id: self.group_id,
            dashboard_type: self.dashboard_type,
            powerbi_workspace_id: self.powerbi_workspace_id,
            powerbi_report_id: self.powerbi_report_id,
            metabase_dashboard_id: self.metabase_dashboard_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_dashboard(id)
    }
}

/// SurrealDB implementation of the Dashboard repository.
#[derive(Clone)]
pub struct SurrealDashboardRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealDashboardRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> DashboardRepository for SurrealDashboardRepository<C> {
    async fn create(&self, input: CreateDashboard) -> DashportResult<Dashboard> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('dashboard', $id) SET \
                 title = $title, description = $description, \
                 group_id = $group_id, dashboard_type = $dashboard_type, \
                 powerbi_workspace_id = $powerbi_workspace_id, \
                 powerbi_report_id = $powerbi_report_id, \
                 metabase_dashboard_id = $metabase_dashboard_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("title", input.title))
            .bind(("description", input.description))
            .bind(("group_id", input.group_id.to_string()))
            .bind(("dashboard_type", input.dashboard_type.as_str().to_string()))
            .bind(("powerbi_workspace_id", input.powerbi_workspace_id))
            .bind(("powerbi_report_id", input.powerbi_report_id))
            .bind(("metabase_dashboard_id", input.metabase_dashboard_id))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| statement_error("dashboard", e))?;

        let rows: Vec<DashboardRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "dashboard".into(),
            id: id_str,
        })?;

        Ok(row.into_dashboard(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> DashportResult<Dashboard> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('dashboard', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DashboardRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "dashboard".into(),
            id: id_str,
        })?;

        Ok(row.into_dashboard(id)?)
    }

    async fn update(&self, id: Uuid, input: UpdateDashboard) -> DashportResult<Dashboard> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.title.is_some() {
            sets.push("title = $title");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.group_id.is_some() {
            sets.push("group_id = $group_id");
        }
        if input.dashboard_type.is_some() {
            sets.push("dashboard_type = $dashboard_type");
        }
        if input.powerbi_workspace_id.is_some() {
            sets.push("powerbi_workspace_id = $powerbi_workspace_id");
        }
        if input.powerbi_report_id.is_some() {
            sets.push("powerbi_report_id = $powerbi_report_id");
        }
        if input.metabase_dashboard_id.is_some() {
            sets.push("metabase_dashboard_id = $metabase_dashboard_id");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('dashboard', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(title) = input.title {
            builder = builder.bind(("title", title));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(group_id) = input.group_id {
            builder = builder.bind(("group_id", group_id.to_string()));
        }
        if let Some(dashboard_type) = input.dashboard_type {
            builder = builder.bind(("dashboard_type", dashboard_type.as_str().to_string()));
        }
        if let Some(workspace_id) = input.powerbi_workspace_id {
            builder = builder.bind(("powerbi_workspace_id", workspace_id));
        }
        if let Some(report_id) = input.powerbi_report_id {
            builder = builder.bind(("powerbi_report_id", report_id));
        }
        if let Some(metabase_id) = input.metabase_dashboard_id {
            builder = builder.bind(("metabase_dashboard_id", metabase_id));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| statement_error("dashboard", e))?;

        let rows: Vec<DashboardRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "dashboard".into(),
            id: id_str,
        })?;

        Ok(row.into_dashboard(id)?)
    }

    async fn delete(&self, id: Uuid) -> DashportResult<()> {
        self.db
            .query("DELETE type::record('dashboard', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> DashportResult<PaginatedResult<Dashboard>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM dashboard GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM dashboard \
                 ORDER BY title ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DashboardRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_dashboard())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_by_groups(&self, group_ids: &[Uuid]) -> DashportResult<Vec<Dashboard>> {
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM dashboard \
                 WHERE group_id INSIDE $group_ids \
                 ORDER BY title ASC",
            )
            .bind(("group_ids", uuid_strings(group_ids)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DashboardRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|row| row.try_into_dashboard())
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
