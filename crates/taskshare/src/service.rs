//! The sharing service: the operations behind the share-link routes.
//!
//! Owner operations (`share`, `revoke`, `list_grants`) take an
//! authenticated [`Requester`]. Anonymous operations (`access`, `update`)
//! take only the token string from the request path.

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use taskshare_core::{
    Clock, GrantId, GrantSpec, GrantStatus, OsTokenSource, PermissionTier, PrincipalId, Requester,
    ResourceId, ShareToken, SystemClock, Timestamp, TokenSource,
};
use taskshare_perms::{
    authorize_mutation, AccessDecision, AccessEvaluator, DenyReason, FieldSet, FieldUpdate,
    MutationDecision, MutationDenial,
};
use taskshare_store::{RevokeOutcome, Store, StoreExt};

use crate::config::ShareConfig;
use crate::error::{Result, ShareError};
use crate::notify::{DeliveryOutcome, Invitation, Notifier};
use crate::resource::{ResourceProvider, TaskSnapshot};

/// Longest accepted email address.
const MAX_ADDRESS_LEN: usize = 254;

/// Shown when the identity system has no name for a sharer.
pub const UNKNOWN_SHARER: &str = "Unknown";

/// How long a new link lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expiry {
    /// The configured default.
    #[default]
    Default,
    /// This many days, between 1 and the configured maximum.
    Days(u32),
    Never,
}

/// An owner's request to share a task.
#[derive(Debug, Clone)]
pub struct ShareRequest {
    pub resource_id: ResourceId,
    /// Email addresses to invite. May be empty.
    pub recipients: Vec<String>,
    pub tier: PermissionTier,
    pub expiry: Expiry,
}

impl ShareRequest {
    pub fn new(resource_id: impl Into<ResourceId>, tier: PermissionTier) -> Self {
        Self {
            resource_id: resource_id.into(),
            recipients: Vec::new(),
            tier,
            expiry: Expiry::Default,
        }
    }

    pub fn recipients<I, A>(mut self, recipients: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.recipients = recipients.into_iter().map(Into::into).collect();
        self
    }

    pub fn expiry(mut self, expiry: Expiry) -> Self {
        self.expiry = expiry;
        self
    }
}

/// What the owner gets back from a successful share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareReceipt {
    pub grant_id: GrantId,
    pub token: ShareToken,
    pub access_url: String,
    pub tier: PermissionTier,
    pub expires_at: Option<Timestamp>,
    /// One entry per deduplicated recipient, in request order.
    pub deliveries: Vec<(String, DeliveryOutcome)>,
}

/// Result of an owner operation on a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerOutcome<T> {
    Done(T),
    /// The task does not exist.
    NotFound,
    /// The requester may not share or audit this task.
    Forbidden,
}

impl<T> OwnerOutcome<T> {
    pub fn status_code(&self) -> u16 {
        match self {
            OwnerOutcome::Done(_) => 200,
            OwnerOutcome::NotFound => 404,
            OwnerOutcome::Forbidden => 403,
        }
    }

    /// The payload, if the operation went through.
    pub fn done(self) -> Option<T> {
        match self {
            OwnerOutcome::Done(value) => Some(value),
            _ => None,
        }
    }
}

/// Share metadata shown to an anonymous holder. No grant or owner ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareInfo {
    pub tier: PermissionTier,
    /// Display name of whoever created the link.
    pub shared_by: String,
    pub shared_at: Timestamp,
    pub expires_at: Option<Timestamp>,
    pub access_count: u64,
}

/// A task as seen through a share link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedTask {
    pub task: TaskSnapshot,
    pub share: ShareInfo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessOutcome {
    Granted(SharedTask),
    Denied(DenyReason),
}

impl AccessOutcome {
    pub fn status_code(&self) -> u16 {
        match self {
            AccessOutcome::Granted(_) => 200,
            AccessOutcome::Denied(reason) => reason.status_code(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated {
        updated_fields: FieldSet,
        task: TaskSnapshot,
    },
    /// The token does not open the task.
    Denied(DenyReason),
    /// The token opens the task but the tier may not make this change.
    Rejected(MutationDenial),
}

impl UpdateOutcome {
    pub fn status_code(&self) -> u16 {
        match self {
            UpdateOutcome::Updated { .. } => 200,
            UpdateOutcome::Denied(reason) => reason.status_code(),
            UpdateOutcome::Rejected(denial) => denial.status_code(),
        }
    }
}

/// Owner audit view of one grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantView {
    pub grant_id: GrantId,
    pub access_url: String,
    pub tier: PermissionTier,
    pub created_at: Timestamp,
    pub expires_at: Option<Timestamp>,
    pub last_accessed_at: Option<Timestamp>,
    pub access_count: u64,
    pub revoked: bool,
    pub revoked_at: Option<Timestamp>,
    pub status: GrantStatus,
}

/// The sharing service.
///
/// Holds the grant store, the task store, and the notifier. Time and token
/// minting are injectable for tests.
pub struct ShareService<S, R, N>
where
    S: Store + ?Sized,
    R: ResourceProvider + ?Sized,
    N: Notifier + ?Sized,
{
    store: Arc<S>,
    evaluator: AccessEvaluator<S>,
    resources: Arc<R>,
    notifier: Arc<N>,
    tokens: Arc<dyn TokenSource>,
    clock: Arc<dyn Clock>,
    config: ShareConfig,
}

impl<S, R, N> ShareService<S, R, N>
where
    S: Store + ?Sized,
    R: ResourceProvider + ?Sized,
    N: Notifier + ?Sized,
{
    /// Create a service with the system clock and OS token source.
    pub fn new(store: Arc<S>, resources: Arc<R>, notifier: Arc<N>, config: ShareConfig) -> Self {
        Self {
            evaluator: AccessEvaluator::new(Arc::clone(&store)),
            store,
            resources,
            notifier,
            tokens: Arc::new(OsTokenSource),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn config(&self) -> &ShareConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Owner Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a share link for a task and invite recipients.
    ///
    /// Recipients are validated before anything is written. Delivery
    /// failures are reported in the receipt and do not undo the grant.
    pub async fn share(
        &self,
        requester: &Requester,
        request: ShareRequest,
    ) -> Result<OwnerOutcome<ShareReceipt>> {
        let recipients = normalize_recipients(&request.recipients, self.config.max_recipients)?;
        let ttl = match request.expiry {
            Expiry::Default => self.config.default_ttl(),
            Expiry::Never => None,
            Expiry::Days(days) if (1..=self.config.max_ttl_days).contains(&days) => {
                Some(ShareConfig::ttl_for_days(days))
            }
            Expiry::Days(days) => {
                return Err(ShareError::InvalidRequest(format!(
                    "expiry must be between 1 and {} days, got {}",
                    self.config.max_ttl_days, days
                )));
            }
        };

        let Some(task) = self.resources.snapshot(&request.resource_id).await? else {
            return Ok(OwnerOutcome::NotFound);
        };
        if !self.may_share(&request.resource_id, requester).await? {
            debug!(
                resource_id = %request.resource_id,
                requester = %requester.id,
                "share refused"
            );
            return Ok(OwnerOutcome::Forbidden);
        }

        let sender_name = self.sharer_name(&requester.id).await?;

        let mut spec = GrantSpec::new(request.resource_id, requester.id.clone(), request.tier);
        spec.ttl = ttl;

        let now = self.clock.now_millis();
        let grant = self
            .store
            .create(self.tokens.as_ref(), spec, now, self.config.token_attempts)
            .await?;
        let access_url = self.config.access_url(&grant.token);

        let mut deliveries = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            let invitation = Invitation {
                recipient: recipient.clone(),
                resource_title: task.title.clone(),
                access_url: access_url.clone(),
                tier: grant.tier,
                expires_at: grant.expires_at,
                sender_name: sender_name.clone(),
            };
            let outcome = match self.notifier.deliver(&invitation).await {
                Ok(()) => DeliveryOutcome::Sent,
                Err(e) => {
                    warn!(
                        grant_id = %grant.grant_id,
                        recipient = %recipient,
                        error = %e,
                        "invitation delivery failed"
                    );
                    DeliveryOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            deliveries.push((recipient, outcome));
        }

        Ok(OwnerOutcome::Done(ShareReceipt {
            grant_id: grant.grant_id,
            token: grant.token,
            access_url,
            tier: grant.tier,
            expires_at: grant.expires_at,
            deliveries,
        }))
    }

    /// Revoke a grant. Owner or admin only; idempotent.
    pub async fn revoke(&self, grant_id: GrantId, requester: &Requester) -> Result<RevokeOutcome> {
        let now = self.clock.now_millis();
        let outcome = self.store.revoke(grant_id, requester, now).await?;

        match outcome {
            RevokeOutcome::Revoked => {
                info!(%grant_id, requester = %requester.id, "share grant revoked")
            }
            RevokeOutcome::Forbidden => {
                debug!(%grant_id, requester = %requester.id, "revoke refused")
            }
            RevokeOutcome::NotFound => debug!(%grant_id, "revoke of unknown grant"),
        }

        Ok(outcome)
    }

    /// Every grant for a task, oldest first.
    pub async fn list_grants(
        &self,
        resource_id: &ResourceId,
        requester: &Requester,
    ) -> Result<OwnerOutcome<Vec<GrantView>>> {
        if self.resources.snapshot(resource_id).await?.is_none() {
            return Ok(OwnerOutcome::NotFound);
        }
        if !self.may_share(resource_id, requester).await? {
            return Ok(OwnerOutcome::Forbidden);
        }

        let now = self.clock.now_millis();
        let views = self
            .store
            .list_by_resource(resource_id)
            .await?
            .into_iter()
            .map(|grant| GrantView {
                grant_id: grant.grant_id,
                access_url: self.config.access_url(&grant.token),
                tier: grant.tier,
                created_at: grant.created_at,
                expires_at: grant.expires_at,
                last_accessed_at: grant.last_accessed_at,
                access_count: grant.access_count,
                revoked: grant.revoked,
                revoked_at: grant.revoked_at,
                status: grant.status(now),
            })
            .collect();

        Ok(OwnerOutcome::Done(views))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Anonymous Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Open a task through a share link.
    ///
    /// A valid token counts as an access even if the task has since been
    /// deleted; the caller then sees `NotFound`.
    pub async fn access(&self, token: &str) -> Result<AccessOutcome> {
        let now = self.clock.now_millis();
        let (grant, tier) = match self.evaluator.evaluate_str(token, now).await? {
            AccessDecision::Allow { grant, tier } => (grant, tier),
            denied => return Ok(AccessOutcome::Denied(deny_reason(&denied))),
        };

        let Some(task) = self.resources.snapshot(&grant.resource_id).await? else {
            debug!(grant_id = %grant.grant_id, "shared task no longer exists");
            return Ok(AccessOutcome::Denied(DenyReason::NotFound));
        };

        let shared_by = self.sharer_name(&grant.owner_id).await?;

        Ok(AccessOutcome::Granted(SharedTask {
            task,
            share: ShareInfo {
                tier,
                shared_by,
                shared_at: grant.created_at,
                expires_at: grant.expires_at,
                access_count: grant.access_count,
            },
        }))
    }

    /// Change a task through a share link.
    ///
    /// The token is evaluated first, which counts an access. The requested
    /// field names then go through the tier's allow-list, all or nothing,
    /// before any value is parsed.
    pub async fn update(&self, token: &str, changes: &Map<String, Value>) -> Result<UpdateOutcome> {
        let now = self.clock.now_millis();
        let (grant, tier) = match self.evaluator.evaluate_str(token, now).await? {
            AccessDecision::Allow { grant, tier } => (grant, tier),
            denied => return Ok(UpdateOutcome::Denied(deny_reason(&denied))),
        };

        if let MutationDecision::Denied(denial) = authorize_mutation(tier, changes.keys()) {
            return Ok(UpdateOutcome::Rejected(denial));
        }

        let update = FieldUpdate::from_json(changes)?;
        let Some(task) = self
            .resources
            .apply_update(&grant.resource_id, &update, now)
            .await?
        else {
            return Ok(UpdateOutcome::Denied(DenyReason::NotFound));
        };

        let updated_fields = update.fields();
        info!(
            grant_id = %grant.grant_id,
            resource_id = %grant.resource_id,
            %tier,
            fields = ?updated_fields.names(),
            "shared task updated"
        );

        Ok(UpdateOutcome::Updated {
            updated_fields,
            task,
        })
    }

    async fn may_share(&self, resource_id: &ResourceId, requester: &Requester) -> Result<bool> {
        if requester.admin {
            return Ok(true);
        }
        Ok(self.resources.can_share(resource_id, &requester.id).await?)
    }

    async fn sharer_name(&self, principal: &PrincipalId) -> Result<String> {
        Ok(self
            .resources
            .display_name(principal)
            .await?
            .unwrap_or_else(|| UNKNOWN_SHARER.to_string()))
    }
}

fn deny_reason(decision: &AccessDecision) -> DenyReason {
    decision.reason().unwrap_or(DenyReason::NotFound)
}

/// Trim, validate, and deduplicate recipient addresses.
///
/// Deduplication is case-insensitive and keeps the first spelling seen,
/// in request order. The cap applies after deduplication.
pub fn normalize_recipients(raw: &[String], max: usize) -> Result<Vec<String>> {
    let mut seen = std::collections::HashSet::new();
    let mut recipients = Vec::new();

    for address in raw {
        let address = address.trim();
        if !is_plausible_address(address) {
            return Err(ShareError::InvalidRequest(format!(
                "invalid email address: {:?}",
                address
            )));
        }
        if seen.insert(address.to_lowercase()) {
            recipients.push(address.to_string());
        }
    }

    if recipients.len() > max {
        return Err(ShareError::InvalidRequest(format!(
            "at most {} recipients per share, got {}",
            max,
            recipients.len()
        )));
    }

    Ok(recipients)
}

fn is_plausible_address(address: &str) -> bool {
    if address.is_empty() || address.len() > MAX_ADDRESS_LEN {
        return false;
    }
    if address.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }
    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
