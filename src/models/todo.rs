use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{due_date::DueDate, priority::Priority};

#[derive(Debug, Clone, PartialEq)]
pub struct ToDo {
    /// Generated at creation, never reassigned
    id: Uuid,
    /// Title of the todo
    pub title: String,
    /// Priority of the todo
    pub priority: Priority,
    /// Name of the owning project. Not updated when that project is renamed.
    pub project: String,
    /// When the todo is due
    pub due_date: DueDate,
    /// Whether the todo is done
    pub completed: bool,
}

/// Plain representation of a todo as it is persisted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToDoRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub priority: Priority,
    pub project: String,
    pub due_date: DueDate,
    #[serde(default)]
    pub completed: bool,
}

/// What happens to the persisted id when a record becomes a todo again.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum IdPolicy {
    /// Every reconstructed todo gets a fresh id
    #[default]
    Regenerate,
    /// Keep the persisted id when it is a valid UUID
    Preserve,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Field '{0}' must not be empty")]
pub struct MissingField(pub &'static str);

/// The editable fields of a todo, all supplied at once.
#[derive(Debug, Clone)]
pub struct ToDoEdit {
    pub title: String,
    pub priority: Priority,
    pub project: String,
    pub due_date: DueDate,
}

impl ToDo {
    pub fn new(
        title: impl Into<String>,
        priority: Priority,
        project: impl Into<String>,
        due_date: DueDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            priority,
            project: project.into(),
            due_date,
            completed: false,
        }
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn toggle_complete(&mut self) {
        self.completed = !self.completed;
    }

    /// Replaces every editable field. Only presence is checked: a blank
    /// title or project leaves the todo untouched.
    pub fn apply_edit(&mut self, edit: ToDoEdit) -> Result<(), MissingField> {
        if edit.title.trim().is_empty() {
            return Err(MissingField("title"));
        }
        if edit.project.trim().is_empty() {
            return Err(MissingField("project"));
        }

        self.title = edit.title;
        self.priority = edit.priority;
        self.project = edit.project;
        self.due_date = edit.due_date;
        Ok(())
    }

    pub fn to_record(&self) -> ToDoRecord {
        ToDoRecord {
            id: Some(self.id.to_string()),
            title: self.title.clone(),
            priority: self.priority,
            project: self.project.clone(),
            due_date: self.due_date,
            completed: self.completed,
        }
    }

    /// Rebuilds a todo with a freshly generated id, whatever the record says.
    pub fn from_record(record: ToDoRecord) -> Self {
        Self::from_record_with(record, IdPolicy::Regenerate)
    }

    pub fn from_record_with(record: ToDoRecord, policy: IdPolicy) -> Self {
        let id = match (policy, record.id.as_deref()) {
            (IdPolicy::Preserve, Some(raw)) => Uuid::parse_str(raw).unwrap_or_else(|_| Uuid::new_v4()),
            _ => Uuid::new_v4(),
        };

        Self {
            id,
            title: record.title,
            priority: record.priority,
            project: record.project,
            due_date: record.due_date,
            completed: record.completed,
        }
    }
}
