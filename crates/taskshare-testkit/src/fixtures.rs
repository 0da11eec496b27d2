//! Test fixtures and fakes.
//!
//! Common setup code for integration tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use taskshare::notify::memory::MemoryNotifier;
use taskshare::{ResourceProvider, ShareConfig, ShareService, TaskSnapshot};
use taskshare_core::{
    Clock, CoreError, OsTokenSource, PrincipalId, ResourceId, ShareToken, Timestamp, TokenSource,
    TOKEN_BYTES,
};
use taskshare_perms::{FieldUpdate, TaskStatus};
use taskshare_store::{MemoryStore, Store};

/// Fixture start time: 2023-11-14T22:13:20Z.
pub const START: Timestamp = 1_700_000_000_000;

/// One day in milliseconds.
pub const DAY_MS: i64 = 86_400_000;

/// Install a test-writer tracing subscriber. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .try_init();
}

/// A task snapshot with sensible defaults.
pub fn task(id: &str, title: &str, created_at: Timestamp) -> TaskSnapshot {
    TaskSnapshot {
        id: id.into(),
        title: title.to_string(),
        description: String::new(),
        status: TaskStatus::Todo,
        notes: String::new(),
        urgent: false,
        deadline: None,
        created_at,
        updated_at: created_at,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Clock
// ─────────────────────────────────────────────────────────────────────────────

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance_millis(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.advance_millis(by.as_millis() as i64);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Token sources
// ─────────────────────────────────────────────────────────────────────────────

/// Mints tokens from a counter: the n-th token encodes `n`.
///
/// Two sources started at the same value produce the same tokens, which
/// is how tests force collisions.
#[derive(Debug)]
pub struct SequenceTokenSource {
    next: AtomicU64,
}

impl SequenceTokenSource {
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// The token this source mints for `n`.
    pub fn token_for(n: u64) -> ShareToken {
        let mut bytes = [0u8; TOKEN_BYTES];
        bytes[..8].copy_from_slice(&n.to_be_bytes());
        ShareToken::from_random_bytes(&bytes)
    }
}

impl TokenSource for SequenceTokenSource {
    fn generate(&self) -> Result<ShareToken, CoreError> {
        Ok(Self::token_for(self.next.fetch_add(1, Ordering::SeqCst)))
    }
}

/// Always mints the same token.
#[derive(Debug, Clone)]
pub struct FixedTokenSource(pub ShareToken);

impl TokenSource for FixedTokenSource {
    fn generate(&self) -> Result<ShareToken, CoreError> {
        Ok(self.0.clone())
    }
}

/// A token source whose entropy is gone.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrokenTokenSource;

impl TokenSource for BrokenTokenSource {
    fn generate(&self) -> Result<ShareToken, CoreError> {
        Err(CoreError::EntropyUnavailable("test source exhausted".into()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Task store
// ─────────────────────────────────────────────────────────────────────────────

struct TaskEntry {
    snapshot: TaskSnapshot,
    sharers: HashSet<PrincipalId>,
}

/// An in-memory task store with a small user directory.
///
/// `sharers` stands in for the task's assignee and supervisor.
#[derive(Default)]
pub struct MemoryResources {
    tasks: RwLock<HashMap<ResourceId, TaskEntry>>,
    names: RwLock<HashMap<PrincipalId, String>>,
    unavailable: AtomicBool,
}

impl MemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a task.
    pub async fn insert<I, P>(&self, snapshot: TaskSnapshot, sharers: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PrincipalId>,
    {
        let entry = TaskEntry {
            sharers: sharers.into_iter().map(Into::into).collect(),
            snapshot,
        };
        self.tasks
            .write()
            .await
            .insert(entry.snapshot.id.clone(), entry);
    }

    /// Register a user's display name.
    pub async fn set_name(&self, principal: impl Into<PrincipalId>, name: &str) {
        self.names
            .write()
            .await
            .insert(principal.into(), name.to_string());
    }

    pub async fn remove(&self, resource_id: &ResourceId) {
        self.tasks.write().await.remove(resource_id);
    }

    pub async fn get(&self, resource_id: &ResourceId) -> Option<TaskSnapshot> {
        self.tasks
            .read()
            .await
            .get(resource_id)
            .map(|entry| entry.snapshot.clone())
    }

    /// Make every call fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> anyhow::Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            anyhow::bail!("task store unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceProvider for MemoryResources {
    async fn snapshot(&self, resource_id: &ResourceId) -> anyhow::Result<Option<TaskSnapshot>> {
        self.check_available()?;
        Ok(self.get(resource_id).await)
    }

    async fn can_share(
        &self,
        resource_id: &ResourceId,
        principal: &PrincipalId,
    ) -> anyhow::Result<bool> {
        self.check_available()?;
        Ok(self
            .tasks
            .read()
            .await
            .get(resource_id)
            .is_some_and(|entry| entry.sharers.contains(principal)))
    }

    async fn display_name(&self, principal: &PrincipalId) -> anyhow::Result<Option<String>> {
        self.check_available()?;
        Ok(self.names.read().await.get(principal).cloned())
    }

    async fn apply_update(
        &self,
        resource_id: &ResourceId,
        update: &FieldUpdate,
        now: Timestamp,
    ) -> anyhow::Result<Option<TaskSnapshot>> {
        self.check_available()?;
        let mut tasks = self.tasks.write().await;
        Ok(tasks.get_mut(resource_id).map(|entry| {
            entry.snapshot.apply(update, now);
            entry.snapshot.clone()
        }))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fixture
// ─────────────────────────────────────────────────────────────────────────────

/// A fully wired sharing service over fakes.
pub struct TestFixture<S: Store = MemoryStore> {
    pub store: Arc<S>,
    pub resources: Arc<MemoryResources>,
    pub notifier: Arc<MemoryNotifier>,
    pub clock: Arc<ManualClock>,
    pub service: ShareService<S, MemoryResources, MemoryNotifier>,
}

impl TestFixture<MemoryStore> {
    /// Memory store, default config, OS tokens, clock at [`START`].
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }
}

impl Default for TestFixture<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Store> TestFixture<S> {
    /// Default config and OS tokens over the given store.
    pub fn with_store(store: Arc<S>) -> Self {
        Self::build(store, ShareConfig::default(), Arc::new(OsTokenSource))
    }

    pub fn build(store: Arc<S>, config: ShareConfig, tokens: Arc<dyn TokenSource>) -> Self {
        let resources = Arc::new(MemoryResources::new());
        let notifier = Arc::new(MemoryNotifier::new());
        let clock = Arc::new(ManualClock::new(START));

        let service = ShareService::new(
            Arc::clone(&store),
            Arc::clone(&resources),
            Arc::clone(&notifier),
            config,
        )
        .with_clock(clock.clone())
        .with_token_source(tokens);

        Self {
            store,
            resources,
            notifier,
            clock,
            service,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now_millis()
    }

    pub fn advance_days(&self, days: i64) {
        self.clock.advance_millis(days * DAY_MS);
    }

    /// Add a task that `sharers` may share.
    pub async fn add_task(&self, id: &str, title: &str, sharers: &[&str]) -> TaskSnapshot {
        let snapshot = task(id, title, self.now());
        self.resources
            .insert(snapshot.clone(), sharers.iter().copied())
            .await;
        snapshot
    }
}
