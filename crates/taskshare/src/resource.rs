//! The task store this service shares from.
//!
//! Tasks live elsewhere. The service only needs to read a snapshot, ask
//! who may share, name a sharer, and apply a validated update.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use taskshare_core::{PrincipalId, ResourceId, Timestamp};
use taskshare_perms::{FieldUpdate, TaskStatus};

/// The parts of a task a share-link holder may see.
///
/// Carries no owner, assignee, or supervisor ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: ResourceId,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub notes: String,
    pub urgent: bool,
    pub deadline: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TaskSnapshot {
    /// Apply `update` in place and stamp `updated_at`.
    pub fn apply(&mut self, update: &FieldUpdate, now: Timestamp) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(notes) = &update.notes {
            self.notes = notes.clone();
        }
        if let Some(description) = &update.description {
            self.description = description.clone();
        }
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(urgent) = update.urgent {
            self.urgent = urgent;
        }
        if let Some(deadline) = update.deadline {
            self.deadline = deadline;
        }
        self.updated_at = now;
    }
}

/// Access to the external task store.
///
/// Failures are reported as `anyhow::Error`; the service surfaces them as
/// faults without detail.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Current state of a task, or `None` if it does not exist.
    async fn snapshot(&self, resource_id: &ResourceId) -> anyhow::Result<Option<TaskSnapshot>>;

    /// Whether `principal` may share the task and audit its links
    /// (its assignee or supervisor).
    async fn can_share(
        &self,
        resource_id: &ResourceId,
        principal: &PrincipalId,
    ) -> anyhow::Result<bool>;

    /// Display name of a principal, or `None` if the identity system does
    /// not know it. Shown to share-link holders in place of the id.
    async fn display_name(&self, principal: &PrincipalId) -> anyhow::Result<Option<String>>;

    /// Apply an already-authorized update. `None` if the task is gone.
    async fn apply_update(
        &self,
        resource_id: &ResourceId,
        update: &FieldUpdate,
        now: Timestamp,
    ) -> anyhow::Result<Option<TaskSnapshot>>;
}
