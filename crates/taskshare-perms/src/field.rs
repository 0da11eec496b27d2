//! Editable task fields and the per-tier allow-list.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use taskshare_core::PermissionTier;

/// A task field that some tier may change through a share link.
///
/// Identity and ownership fields (`id`, `owner_id`, `assignee_id`,
/// `permission`, `created_at`, ...) have no variant and so can never be
/// named in an allowed mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskField {
    Status,
    Notes,
    Description,
    Title,
    Urgent,
    Deadline,
}

impl TaskField {
    /// Every field that appears on any allow-list.
    pub const ALL: [TaskField; 6] = [
        TaskField::Status,
        TaskField::Notes,
        TaskField::Description,
        TaskField::Title,
        TaskField::Urgent,
        TaskField::Deadline,
    ];

    /// The wire name.
    pub const fn name(&self) -> &'static str {
        match self {
            TaskField::Status => "status",
            TaskField::Notes => "notes",
            TaskField::Description => "description",
            TaskField::Title => "title",
            TaskField::Urgent => "urgent",
            TaskField::Deadline => "deadline",
        }
    }

    /// Exact lookup by wire name.
    pub fn from_name(name: &str) -> Option<TaskField> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

impl fmt::Display for TaskField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const VIEW_FIELDS: &[TaskField] = &[];

const EDIT_FIELDS: &[TaskField] = &[TaskField::Status, TaskField::Notes];

const ADMIN_FIELDS: &[TaskField] = &[
    TaskField::Status,
    TaskField::Notes,
    TaskField::Description,
    TaskField::Title,
    TaskField::Urgent,
    TaskField::Deadline,
];

/// The fields `tier` may change.
pub const fn allowed_fields(tier: PermissionTier) -> &'static [TaskField] {
    match tier {
        PermissionTier::View => VIEW_FIELDS,
        PermissionTier::Edit => EDIT_FIELDS,
        PermissionTier::Admin => ADMIN_FIELDS,
    }
}

/// An ordered set of task fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSet(BTreeSet<TaskField>);

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: TaskField) -> bool {
        self.0.insert(field)
    }

    pub fn contains(&self, field: TaskField) -> bool {
        self.0.contains(&field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = TaskField> + '_ {
        self.0.iter().copied()
    }

    /// Wire names in field order.
    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(|f| f.name()).collect()
    }

    pub fn is_subset(&self, other: &FieldSet) -> bool {
        self.0.is_subset(&other.0)
    }
}

impl FromIterator<TaskField> for FieldSet {
    fn from_iter<I: IntoIterator<Item = TaskField>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
