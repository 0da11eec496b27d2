//! Typed, validated field updates.
//!
//! The guard decides *which* fields a tier may touch; this module decides
//! whether the values are acceptable. Callers run the guard first, so keys
//! that are not [`TaskField`] names never reach here and are ignored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use taskshare_core::Timestamp;

use crate::error::{PermsError, Result};
use crate::field::{FieldSet, TaskField};

/// Maximum length of `notes`, in characters.
pub const MAX_NOTES_CHARS: usize = 1_000;

/// Maximum length of `title`, in characters.
pub const MAX_TITLE_CHARS: usize = 200;

/// Maximum length of `description`, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 10_000;

/// Workflow status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "todo")]
    Todo,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "done")]
    Done,
}

impl TaskStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "todo" => Ok(TaskStatus::Todo),
            "in-progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

/// A set of field changes with validated values.
///
/// `None` means "leave unchanged". For `deadline`, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldUpdate {
    pub status: Option<TaskStatus>,
    pub notes: Option<String>,
    pub description: Option<String>,
    pub title: Option<String>,
    pub urgent: Option<bool>,
    pub deadline: Option<Option<Timestamp>>,
}

impl FieldUpdate {
    /// Parse and validate the recognised fields of a JSON object.
    pub fn from_json(map: &Map<String, Value>) -> Result<Self> {
        let mut update = FieldUpdate::default();

        for (name, value) in map {
            let Some(field) = TaskField::from_name(name) else {
                continue;
            };

            match field {
                TaskField::Status => {
                    let raw = expect_str(field, value)?;
                    let status = raw
                        .parse()
                        .map_err(|reason| invalid(field, reason))?;
                    update.status = Some(status);
                }
                TaskField::Notes => {
                    let notes = expect_str(field, value)?;
                    check_max(field, notes, MAX_NOTES_CHARS)?;
                    update.notes = Some(notes.to_string());
                }
                TaskField::Description => {
                    let description = strip_control(expect_str(field, value)?);
                    check_max(field, &description, MAX_DESCRIPTION_CHARS)?;
                    update.description = Some(description);
                }
                TaskField::Title => {
                    let title = expect_str(field, value)?.trim();
                    if title.is_empty() {
                        return Err(invalid(field, "must not be empty"));
                    }
                    check_max(field, title, MAX_TITLE_CHARS)?;
                    update.title = Some(title.to_string());
                }
                TaskField::Urgent => {
                    let urgent = value
                        .as_bool()
                        .ok_or_else(|| invalid(field, "expected a boolean"))?;
                    update.urgent = Some(urgent);
                }
                TaskField::Deadline => {
                    let deadline = match value {
                        Value::Null => None,
                        other => Some(
                            other
                                .as_i64()
                                .ok_or_else(|| invalid(field, "expected a timestamp or null"))?,
                        ),
                    };
                    update.deadline = Some(deadline);
                }
            }
        }

        Ok(update)
    }

    /// The fields this update changes.
    pub fn fields(&self) -> FieldSet {
        let mut set = FieldSet::new();
        if self.status.is_some() {
            set.insert(TaskField::Status);
        }
        if self.notes.is_some() {
            set.insert(TaskField::Notes);
        }
        if self.description.is_some() {
            set.insert(TaskField::Description);
        }
        if self.title.is_some() {
            set.insert(TaskField::Title);
        }
        if self.urgent.is_some() {
            set.insert(TaskField::Urgent);
        }
        if self.deadline.is_some() {
            set.insert(TaskField::Deadline);
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }
}

fn invalid(field: TaskField, reason: impl Into<String>) -> PermsError {
    PermsError::InvalidValue {
        field,
        reason: reason.into(),
    }
}

fn expect_str(field: TaskField, value: &Value) -> Result<&str> {
    value
        .as_str()
        .ok_or_else(|| invalid(field, "expected a string"))
}

fn check_max(field: TaskField, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max {
        return Err(invalid(
            field,
            format!("{len} characters exceeds the limit of {max}"),
        ));
    }
    Ok(())
}

fn strip_control(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}
