//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;
use taskshare_core::{Clock, SystemClock};

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, SystemClock.now_millis()],
            )?;
            tracing::debug!(version, "applied schema migration");
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per shareable link
        CREATE TABLE grants (
            grant_id INTEGER PRIMARY KEY AUTOINCREMENT,
            resource_id TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            token TEXT NOT NULL UNIQUE,
            tier TEXT NOT NULL CHECK (tier IN ('view', 'edit', 'admin')),
            expires_at INTEGER,                  -- Unix ms, NULL = never
            revoked INTEGER NOT NULL DEFAULT 0 CHECK (revoked IN (0, 1)),
            revoked_at INTEGER,
            access_count INTEGER NOT NULL DEFAULT 0,
            last_accessed_at INTEGER,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX idx_grants_resource ON grants(resource_id, created_at);
        CREATE INDEX idx_grants_owner ON grants(owner_id);
        CREATE INDEX idx_grants_expires ON grants(expires_at);

        -- Revocation is terminal
        CREATE TRIGGER grants_revoke_is_terminal
        BEFORE UPDATE OF revoked ON grants
        WHEN OLD.revoked = 1 AND NEW.revoked = 0
        BEGIN
            SELECT RAISE(ABORT, 'revoked grants cannot be reinstated');
        END;

        -- Identity and tier are fixed at creation
        CREATE TRIGGER grants_identity_is_immutable
        BEFORE UPDATE OF resource_id, owner_id, token, tier, created_at ON grants
        BEGIN
            SELECT RAISE(ABORT, 'grant identity and tier are immutable');
        END;
        "#,
    )?;

    Ok(())
}
