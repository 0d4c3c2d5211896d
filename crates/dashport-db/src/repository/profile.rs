//! SurrealDB implementation of [`ProfileRepository`].

use chrono::{DateTime, Utc};
use dashport_core::error::DashportResult;
use dashport_core::models::profile::{EnsureProfile, Profile, Role, UpdateProfile};
use dashport_core::repository::{PaginatedResult, Pagination, ProfileRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;
use uuid::Uuid;

use super::{CountRow, parse_uuid, statement_error};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ProfileRow {
    email: String,
    full_name: Option<String>,
    role: String,
    email_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_sign_in_at: Option<DateTime<Utc>>,
}

#[derive(Debug, SurrealValue)]
struct ProfileRowWithId {
    record_id: String,
    email: String,
    full_name: Option<String>,
    role: String,
    email_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_sign_in_at: Option<DateTime<Utc>>,
}

fn parse_role(s: &str) -> Result<Role, DbError> {
    s.parse().map_err(DbError::Decode)
}

impl ProfileRow {
    fn into_profile(self, id: Uuid) -> Result<Profile, DbError> {
        Ok(Profile {
            id,
            email: self.email,
            full_name: self.full_name,
            role: parse_role(&self.role)?,
            email_verified: self.email_verified,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_sign_in_at: self.last_sign_in_at,
        })
    }
}

impl ProfileRowWithId {
    fn try_into_profile(self) -> Result<Profile, DbError> {
        Ok(Profile {
            id: parse_uuid(&self.record_id, "profile")?,
            email: self.email,
            full_name: self.full_name,
            role: parse_role(&self.role)?,
            email_verified: self.email_verified,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_sign_in_at: self.last_sign_in_at,
        })
    }
}

/// SurrealDB implementation of the Profile repository.
#[derive(Clone)]
pub struct SurrealProfileRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealProfileRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SurrealProfileRepository<C> {
    async fn bootstrap_claimed(&self) -> Result<bool, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM super_admin_claim \
                 WHERE meta::id(id) = 'bootstrap' GROUP ALL",
            )
            .await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }
}

impl<C: Connection> ProfileRepository for SurrealProfileRepository<C> {
    async fn get_by_id(&self, id: Uuid) -> DashportResult<Profile> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('profile', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProfileRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "profile".into(),
            id: id_str,
        })?;

        Ok(row.into_profile(id)?)
    }

    async fn find_by_email(&self, email: &str) -> DashportResult<Option<Profile>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM profile \
                 WHERE string::lowercase(email) = $email LIMIT 1",
            )
            .bind(("email", email.trim().to_lowercase()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProfileRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(ProfileRowWithId::try_into_profile)
            .transpose()?)
    }

    async fn ensure(&self, input: EnsureProfile) -> DashportResult<Profile> {
        let id_str = input.id.to_string();

        // Role and verification flag keep their defaults on creation and
        // are never touched for an existing row.
        let result = self
            .db
            .query(
                "UPSERT type::record('profile', $id) SET \
                 email = $email, \
                 full_name = full_name ?? $full_name, \
                 last_sign_in_at = time::now(), \
                 updated_at = time::now()",
            )
            .bind(("id", id_str.clone()))
            .bind(("email", input.email.trim().to_lowercase()))
            .bind(("full_name", input.full_name))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| statement_error("profile", e))?;

        let rows: Vec<ProfileRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "profile".into(),
            id: id_str,
        })?;

        Ok(row.into_profile(input.id)?)
    }

    async fn update(&self, id: Uuid, input: UpdateProfile) -> DashportResult<Profile> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.full_name.is_some() {
            sets.push("full_name = $full_name");
        }
        if input.role.is_some() {
            sets.push("role = $role");
        }
        if input.email_verified.is_some() {
            sets.push("email_verified = $email_verified");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('profile', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(full_name) = input.full_name {
            builder = builder.bind(("full_name", full_name));
        }
        if let Some(role) = input.role {
            builder = builder.bind(("role", role.as_str().to_string()));
        }
        if let Some(email_verified) = input.email_verified {
            builder = builder.bind(("email_verified", email_verified));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| statement_error("profile", e))?;

        let rows: Vec<ProfileRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "profile".into(),
            id: id_str,
        })?;

        Ok(row.into_profile(id)?)
    }

    async fn list(&self, pagination: Pagination) -> DashportResult<PaginatedResult<Profile>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM profile GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM profile \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProfileRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_profile())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn count_with_role(&self, role: Role) -> DashportResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM profile \
                 WHERE role = $role GROUP ALL",
            )
            .bind(("role", role.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }

    async fn claim_super_admin(&self, id: Uuid) -> DashportResult<Profile> {
        let id_str = id.to_string();

        // The fixed claim record makes a second bootstrap fail inside
        // the transaction, so the role update never commits twice.
        let outcome = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 CREATE super_admin_claim:bootstrap SET profile_id = $id; \
                 UPDATE type::record('profile', $id) SET \
                 role = 'super_admin', updated_at = time::now(); \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id_str))
            .await
            .map_err(DbError::from)?
            .check();

        if let Err(e) = outcome {
            if self.bootstrap_claimed().await? {
                return Err(DbError::AlreadyExists {
                    entity: "super_admin_claim".into(),
                }
                .into());
            }
            return Err(DbError::Query(e.to_string()).into());
        }

        info!(user_id = %id, "Bootstrap super admin claimed");

        self.get_by_id(id).await
    }
}
