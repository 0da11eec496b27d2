//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use taskshare_core::{Grant, GrantId, NewGrant, Requester, ResourceId, ShareToken, Timestamp};

use crate::error::{Result, StoreError};
use crate::traits::{InsertResult, RevokeOutcome, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock;
/// every mutation happens under one write lock, which makes each of them
/// atomic.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Grants indexed by id.
    grants: BTreeMap<GrantId, Grant>,

    /// Token index: token -> grant id.
    by_token: HashMap<ShareToken, GrantId>,

    /// Last assigned grant id.
    last_id: i64,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    /// Number of stored grants.
    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.grants.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_grant(&self, grant: &NewGrant) -> Result<InsertResult> {
        let mut inner = self.write()?;

        if inner.by_token.contains_key(&grant.token) {
            return Ok(InsertResult::TokenTaken);
        }

        inner.last_id += 1;
        let grant_id = GrantId(inner.last_id);
        let stored = grant.clone().into_grant(grant_id);

        inner.by_token.insert(stored.token.clone(), grant_id);
        inner.grants.insert(grant_id, stored.clone());

        Ok(InsertResult::Inserted(stored))
    }

    async fn find_by_token(&self, token: &ShareToken) -> Result<Option<Grant>> {
        let inner = self.read()?;
        Ok(inner
            .by_token
            .get(token)
            .and_then(|id| inner.grants.get(id))
            .cloned())
    }

    async fn get_grant(&self, grant_id: GrantId) -> Result<Option<Grant>> {
        let inner = self.read()?;
        Ok(inner.grants.get(&grant_id).cloned())
    }

    async fn list_by_resource(&self, resource_id: &ResourceId) -> Result<Vec<Grant>> {
        let inner = self.read()?;

        let mut grants: Vec<Grant> = inner
            .grants
            .values()
            .filter(|g| &g.resource_id == resource_id)
            .cloned()
            .collect();

        grants.sort_by_key(|g| (g.created_at, g.grant_id));
        Ok(grants)
    }

    async fn revoke(
        &self,
        grant_id: GrantId,
        requester: &Requester,
        now: Timestamp,
    ) -> Result<RevokeOutcome> {
        let mut inner = self.write()?;

        let Some(grant) = inner.grants.get_mut(&grant_id) else {
            return Ok(RevokeOutcome::NotFound);
        };

        if !requester.may_administer(&grant.owner_id) {
            return Ok(RevokeOutcome::Forbidden);
        }

        if !grant.revoked {
            grant.revoked = true;
            grant.revoked_at = Some(now);
        }

        Ok(RevokeOutcome::Revoked)
    }

    async fn record_access(&self, grant_id: GrantId, now: Timestamp) -> Result<Option<Grant>> {
        let mut inner = self.write()?;

        match inner.grants.get_mut(&grant_id) {
            Some(grant) if !grant.revoked => {
                grant.access_count += 1;
                grant.last_accessed_at = Some(now);
                Ok(Some(grant.clone()))
            }
            _ => Ok(None),
        }
    }
}
