//! SurrealDB implementation of [`MembershipRepository`].
//!
//! Rows are never removed here; removal flips `is_deleted` and
//! `is_active` so membership history is retained.

use chrono::{DateTime, Utc};
use dashport_core::error::DashportResult;
use dashport_core::models::membership::{CreateMembership, GroupMember};
use dashport_core::repository::MembershipRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{parse_optional_uuid, parse_uuid, statement_error};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct MemberRow {
    group_id: String,
    user_id: Option<String>,
    pending_user_id: Option<String>,
    is_admin: bool,
    is_active: bool,
    is_deleted: bool,
    joined_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct MemberRowWithId {
    record_id: String,
    group_id: String,
    user_id: Option<String>,
    pending_user_id: Option<String>,
    is_admin: bool,
    is_active: bool,
    is_deleted: bool,
    joined_at: DateTime<Utc>,
}

impl MemberRow {
    fn into_member(self, id: Uuid) -> Result<GroupMember, DbError> {
        Ok(GroupMember {
            id,
            group_id: parse_uuid(&self.group_id, "group")?,
            user_id: parse_optional_uuid(self.user_id.as_deref(), "user")?,
            pending_user_id: parse_optional_uuid(self.pending_user_id.as_deref(), "invitation")?,
            is_admin: self.is_admin,
            is_active: self.is_active,
            is_deleted: self.is_deleted,
            joined_at: self.joined_at,
        })
    }
}

impl MemberRowWithId {
    fn try_into_member(self) -> Result<GroupMember, DbError> {
        Ok(GroupMember {
            id: parse_uuid(&self.record_id, "membership")?,
            group_id: parse_uuid(&self.group_id, "group")?,
            user_id: parse_optional_uuid(self.user_id.as_deref(), "user")?,
            pending_user_id: parse_optional_uuid(self.pending_user_id.as_deref(), "invitation")?,
            is_admin: self.is_admin,
            is_active: self.is_active,
            is_deleted: self.is_deleted,
            joined_at: self.joined_at,
        })
    }
}

/// SurrealDB implementation of the Membership repository.
#[derive(Clone)]
pub struct SurrealMembershipRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMembershipRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Run an `UPDATE ... SET` against one row and decode the result.
    async fn update_row(
        &self,
        id: Uuid,
        sets: &str,
        is_admin: Option<bool>,
        user_id: Option<Uuid>,
    ) -> DashportResult<GroupMember> {
        let id_str = id.to_string();
        let query = format!("UPDATE type::record('group_member', $id) SET {sets}");

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(is_admin) = is_admin {
            builder = builder.bind(("is_admin", is_admin));
        }
        if let Some(user_id) = user_id {
            builder = builder.bind(("user_id", user_id.to_string()));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| statement_error("membership", e))?;

        let rows: Vec<MemberRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "membership".into(),
            id: id_str,
        })?;

        Ok(row.into_member(id)?)
    }

    async fn select_many(
        &self,
        query: &'static str,
        field: &'static str,
        value: Uuid,
    ) -> DashportResult<Vec<GroupMember>> {
        let mut result = self
            .db
            .query(query)
            .bind((field, value.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MemberRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|row| row.try_into_member())
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}

impl<C: Connection> MembershipRepository for SurrealMembershipRepository<C> {
    async fn create(&self, input: CreateMembership) -> DashportResult<GroupMember> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('group_member', $id) SET \
                 group_id = $group_id, \
                 user_id = $user_id, \
                 pending_user_id = $pending_user_id, \
                 is_admin = $is_admin, \
                 is_active = $is_active, \
                 is_deleted = false",
            )
            .bind(("id", id_str.clone()))
            .bind(("group_id", input.group_id.to_string()))
            .bind(("user_id", input.user_id.map(|u| u.to_string())))
            .bind((
                "pending_user_id",
                input.pending_user_id.map(|p| p.to_string()),
            ))
            .bind(("is_admin", input.is_admin))
            .bind(("is_active", input.is_active))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| statement_error("membership", e))?;

        let rows: Vec<MemberRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "membership".into(),
            id: id_str,
        })?;

        Ok(row.into_member(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> DashportResult<GroupMember> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('group_member', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MemberRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "membership".into(),
            id: id_str,
        })?;

        Ok(row.into_member(id)?)
    }

    async fn find_current(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> DashportResult<Option<GroupMember>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM group_member \
                 WHERE group_id = $group_id AND user_id = $user_id \
                 AND is_deleted = false \
                 ORDER BY joined_at DESC LIMIT 1",
            )
            .bind(("group_id", group_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MemberRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(MemberRowWithId::try_into_member)
            .transpose()?)
    }

    async fn find_latest(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> DashportResult<Option<GroupMember>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM group_member \
                 WHERE group_id = $group_id AND user_id = $user_id \
                 ORDER BY is_deleted ASC, joined_at DESC LIMIT 1",
            )
            .bind(("group_id", group_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MemberRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(MemberRowWithId::try_into_member)
            .transpose()?)
    }

    async fn find_reconcilable(
        &self,
        group_id: Uuid,
        invitation_id: Uuid,
        user_id: Uuid,
    ) -> DashportResult<Option<GroupMember>> {
        // An already-active row for the user wins over a reserved seat.
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM group_member \
                 WHERE group_id = $group_id AND is_deleted = false \
                 AND (pending_user_id = $invitation_id OR user_id = $user_id) \
                 ORDER BY is_active DESC, joined_at ASC LIMIT 1",
            )
            .bind(("group_id", group_id.to_string()))
            .bind(("invitation_id", invitation_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MemberRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(MemberRowWithId::try_into_member)
            .transpose()?)
    }

    async fn find_pending(&self, invitation_id: Uuid) -> DashportResult<Vec<GroupMember>> {
        self.select_many(
            "SELECT meta::id(id) AS record_id, * FROM group_member \
             WHERE pending_user_id = $invitation_id AND is_deleted = false",
            "invitation_id",
            invitation_id,
        )
        .await
    }

    async fn activate(&self, id: Uuid, user_id: Uuid) -> DashportResult<GroupMember> {
        self.update_row(
            id,
            "user_id = $user_id, pending_user_id = NONE, is_active = true",
            None,
            Some(user_id),
        )
        .await
    }

    async fn reactivate(&self, id: Uuid) -> DashportResult<GroupMember> {
        self.update_row(id, "is_deleted = false, is_active = true", None, None)
            .await
    }

    async fn soft_delete(&self, id: Uuid) -> DashportResult<GroupMember> {
        self.update_row(id, "is_deleted = true, is_active = false", None, None)
            .await
    }

    async fn set_admin(&self, id: Uuid, is_admin: bool) -> DashportResult<GroupMember> {
        self.update_row(id, "is_admin = $is_admin", Some(is_admin), None)
            .await
    }

    async fn list_active_by_group(&self, group_id: Uuid) -> DashportResult<Vec<GroupMember>> {
        self.select_many(
            "SELECT meta::id(id) AS record_id, * FROM group_member \
             WHERE group_id = $group_id AND is_active = true \
             AND is_deleted = false ORDER BY joined_at ASC",
            "group_id",
            group_id,
        )
        .await
    }

    async fn list_active_by_user(&self, user_id: Uuid) -> DashportResult<Vec<GroupMember>> {
        self.select_many(
            "SELECT meta::id(id) AS record_id, * FROM group_member \
             WHERE user_id = $user_id AND is_active = true \
             AND is_deleted = false ORDER BY joined_at ASC",
            "user_id",
            user_id,
        )
        .await
    }
}
