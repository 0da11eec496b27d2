//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for share grants. It uses rusqlite
//! with bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{ffi, params, Connection, OptionalExtension, TransactionBehavior};

use taskshare_core::{
    Grant, GrantId, NewGrant, PermissionTier, PrincipalId, Requester, ResourceId, ShareToken,
    Timestamp,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{InsertResult, RevokeOutcome, Store};

const GRANT_COLUMNS: &str = "grant_id, resource_id, owner_id, token, tier, expires_at, revoked, \
                             revoked_at, access_count, last_accessed_at, created_at";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking thread pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Poisoned(format!("connection mutex: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Join(format!("spawn_blocking failed: {}", e)))?
    }
}

// Helper to convert a row to Grant
fn row_to_grant(row: &rusqlite::Row<'_>) -> rusqlite::Result<Grant> {
    let tier_text: String = row.get("tier")?;
    let tier: PermissionTier = tier_text
        .parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    let token_text: String = row.get("token")?;
    let token = ShareToken::parse(&token_text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    let raw_count: i64 = row.get("access_count")?;
    let access_count =
        u64::try_from(raw_count).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(8, raw_count))?;

    Ok(Grant {
        grant_id: GrantId(row.get("grant_id")?),
        resource_id: ResourceId(row.get("resource_id")?),
        owner_id: PrincipalId(row.get("owner_id")?),
        token,
        tier,
        expires_at: row.get("expires_at")?,
        revoked: row.get::<_, i64>("revoked")? != 0,
        revoked_at: row.get("revoked_at")?,
        access_count,
        last_accessed_at: row.get("last_accessed_at")?,
        created_at: row.get("created_at")?,
    })
}

fn select_grant(conn: &Connection, grant_id: GrantId) -> rusqlite::Result<Option<Grant>> {
    conn.query_row(
        &format!("SELECT {} FROM grants WHERE grant_id = ?1", GRANT_COLUMNS),
        params![grant_id.0],
        row_to_grant,
    )
    .optional()
}

/// A UNIQUE constraint failure. CHECK and trigger aborts share the primary
/// constraint code and must not read as a token collision.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_grant(&self, grant: &NewGrant) -> Result<InsertResult> {
        let grant = grant.clone();

        self.blocking(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            // Check if the token is already taken
            let existing: Option<i64> = tx
                .query_row(
                    "SELECT grant_id FROM grants WHERE token = ?1",
                    params![grant.token.as_str()],
                    |row| row.get(0),
                )
                .optional()?;

            if existing.is_some() {
                return Ok(InsertResult::TokenTaken);
            }

            let inserted = tx.execute(
                "INSERT INTO grants (resource_id, owner_id, token, tier, expires_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    grant.resource_id.as_str(),
                    grant.owner_id.as_str(),
                    grant.token.as_str(),
                    grant.tier.as_str(),
                    grant.expires_at,
                    grant.created_at,
                ],
            );

            match inserted {
                Ok(_) => {}
                // Another process won the race for this token
                Err(e) if is_unique_violation(&e) => return Ok(InsertResult::TokenTaken),
                Err(e) => return Err(e.into()),
            }

            let grant_id = GrantId(tx.last_insert_rowid());
            tx.commit()?;

            tracing::debug!(%grant_id, "inserted grant row");
            Ok(InsertResult::Inserted(grant.into_grant(grant_id)))
        })
        .await
    }

    async fn find_by_token(&self, token: &ShareToken) -> Result<Option<Grant>> {
        let token = token.clone();

        self.blocking(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM grants WHERE token = ?1", GRANT_COLUMNS),
                params![token.as_str()],
                row_to_grant,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn get_grant(&self, grant_id: GrantId) -> Result<Option<Grant>> {
        self.blocking(move |conn| select_grant(conn, grant_id).map_err(StoreError::from))
            .await
    }

    async fn list_by_resource(&self, resource_id: &ResourceId) -> Result<Vec<Grant>> {
        let resource_id = resource_id.clone();

        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM grants WHERE resource_id = ?1 ORDER BY created_at, grant_id",
                GRANT_COLUMNS
            ))?;

            let grants = stmt
                .query_map(params![resource_id.as_str()], row_to_grant)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(grants)
        })
        .await
    }

    async fn revoke(
        &self,
        grant_id: GrantId,
        requester: &Requester,
        now: Timestamp,
    ) -> Result<RevokeOutcome> {
        let requester = requester.clone();

        self.blocking(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let owner: Option<String> = tx
                .query_row(
                    "SELECT owner_id FROM grants WHERE grant_id = ?1",
                    params![grant_id.0],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(owner) = owner else {
                return Ok(RevokeOutcome::NotFound);
            };

            if !requester.may_administer(&PrincipalId(owner)) {
                return Ok(RevokeOutcome::Forbidden);
            }

            // COALESCE keeps the first revocation time on repeat calls
            tx.execute(
                "UPDATE grants SET revoked = 1, revoked_at = COALESCE(revoked_at, ?2)
                 WHERE grant_id = ?1",
                params![grant_id.0, now],
            )?;
            tx.commit()?;

            Ok(RevokeOutcome::Revoked)
        })
        .await
    }

    async fn record_access(&self, grant_id: GrantId, now: Timestamp) -> Result<Option<Grant>> {
        self.blocking(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let changed = tx.execute(
                "UPDATE grants SET access_count = access_count + 1, last_accessed_at = ?2
                 WHERE grant_id = ?1 AND revoked = 0",
                params![grant_id.0, now],
            )?;

            if changed == 0 {
                return Ok(None);
            }

            let grant = select_grant(&tx, grant_id)?;
            tx.commit()?;
            Ok(grant)
        })
        .await
    }
}
