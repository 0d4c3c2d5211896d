//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Profiles (one per identity-provider user; record id = identity id)
-- =======================================================================
DEFINE TABLE profile SCHEMAFULL;
DEFINE FIELD email ON TABLE profile TYPE string;
DEFINE FIELD full_name ON TABLE profile TYPE option<string>;
DEFINE FIELD role ON TABLE profile TYPE string DEFAULT 'user' \
    ASSERT $value IN ['user', 'group_admin', 'super_admin'];
DEFINE FIELD email_verified ON TABLE profile TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE profile TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE profile TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD last_sign_in_at ON TABLE profile TYPE option<datetime>;
DEFINE INDEX idx_profile_email ON TABLE profile COLUMNS email UNIQUE;
DEFINE INDEX idx_profile_role ON TABLE profile COLUMNS role;

-- =======================================================================
-- Super admin bootstrap claim (at most one record: bootstrap)
-- =======================================================================
DEFINE TABLE super_admin_claim SCHEMAFULL;
DEFINE FIELD profile_id ON TABLE super_admin_claim TYPE string;
DEFINE FIELD claimed_at ON TABLE super_admin_claim TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Groups
-- =======================================================================
DEFINE TABLE user_group SCHEMAFULL;
DEFINE FIELD name ON TABLE user_group TYPE string;
DEFINE FIELD description ON TABLE user_group TYPE string;
DEFINE FIELD created_at ON TABLE user_group TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user_group TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_group_name ON TABLE user_group COLUMNS name UNIQUE;

-- =======================================================================
-- Group members (soft-deleted, never removed)
-- =======================================================================
DEFINE TABLE group_member SCHEMAFULL;
DEFINE FIELD group_id ON TABLE group_member TYPE string;
DEFINE FIELD user_id ON TABLE group_member TYPE option<string>;
DEFINE FIELD pending_user_id ON TABLE group_member TYPE option<string>;
DEFINE FIELD is_admin ON TABLE group_member TYPE bool DEFAULT false;
DEFINE FIELD is_active ON TABLE group_member TYPE bool DEFAULT false;
DEFINE FIELD is_deleted ON TABLE group_member TYPE bool DEFAULT false;
DEFINE FIELD joined_at ON TABLE group_member TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_member_group_user ON TABLE group_member \
    COLUMNS group_id, user_id;
DEFINE INDEX idx_member_user ON TABLE group_member COLUMNS user_id;
DEFINE INDEX idx_member_pending ON TABLE group_member \
    COLUMNS pending_user_id;

-- =======================================================================
-- Dashboards (exactly one group, exactly one BI backend)
-- =======================================================================
DEFINE TABLE dashboard SCHEMAFULL;
DEFINE FIELD title ON TABLE dashboard TYPE string;
DEFINE FIELD description ON TABLE dashboard TYPE string;
DEFINE FIELD group_id ON TABLE dashboard TYPE string;
DEFINE FIELD dashboard_type ON TABLE dashboard TYPE string \
    ASSERT $value IN ['powerbi', 'metabase'];
DEFINE FIELD powerbi_workspace_id ON TABLE dashboard \
    TYPE option<string>;
DEFINE FIELD powerbi_report_id ON TABLE dashboard TYPE option<string>;
DEFINE FIELD metabase_dashboard_id ON TABLE dashboard \
    TYPE option<string>;
DEFINE FIELD created_at ON TABLE dashboard TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE dashboard TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_dashboard_group ON TABLE dashboard COLUMNS group_id;

-- =======================================================================
-- Invitations (single-use tokens)
-- =======================================================================
DEFINE TABLE invitation SCHEMAFULL;
DEFINE FIELD email ON TABLE invitation TYPE string;
DEFINE FIELD role ON TABLE invitation TYPE string \
    ASSERT $value IN ['user', 'group_admin', 'super_admin'];
DEFINE FIELD group_id ON TABLE invitation TYPE option<string>;
DEFINE FIELD invited_by ON TABLE invitation TYPE string;
DEFINE FIELD token ON TABLE invitation TYPE string;
DEFINE FIELD expires_at ON TABLE invitation TYPE datetime;
DEFINE FIELD used_at ON TABLE invitation TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE invitation TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_invitation_token ON TABLE invitation \
    COLUMNS token UNIQUE;
DEFINE INDEX idx_invitation_email ON TABLE invitation COLUMNS email;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
