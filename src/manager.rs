//! Ownership of all projects, the current-project pointer, and the
//! write-through persistence of both.
//!
//! Every mutating method changes the in-memory state first and then writes
//! the complete state under a single storage key. There are no partial
//! writes: the last write wins.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::{
        due_date::DueDate,
        priority::Priority,
        project::{Project, ProjectRecord},
        todo::{IdPolicy, MissingField, ToDo, ToDoEdit},
    },
    storage::{KeyValueStore, StorageError},
};

pub const DEFAULT_STORAGE_KEY: &str = "projectData";
pub const DEFAULT_PROJECT_NAME: &str = "Default Project";
pub const UNTITLED_PROJECT_NAME: &str = "Untitled Project";

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Project '{0}' not found")]
    ProjectNotFound(String),

    #[error("No project at position {0}")]
    NoProjectAt(usize),

    #[error("Todo '{0}' not found")]
    TodoNotFound(Uuid),

    #[error("There is no current project")]
    NoCurrentProject,

    #[error(transparent)]
    MissingField(#[from] MissingField),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// The full persisted state.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManagerRecord {
    pub projects: Vec<ProjectRecord>,
    #[serde(default)]
    pub current_project: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored { projects: usize },
    NoSavedState,
    /// Stored data could not be read; state was left untouched.
    Discarded { reason: String },
}

pub struct ProjectManager<S> {
    storage: S,
    storage_key: String,
    id_policy: IdPolicy,
    projects: Vec<Project>,
    current: Option<usize>,
}

impl<S: KeyValueStore> ProjectManager<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            id_policy: IdPolicy::default(),
            projects: vec![],
            current: None,
        }
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn with_id_policy(mut self, policy: IdPolicy) -> Self {
        self.id_policy = policy;
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn projects_size(&self) -> usize {
        self.projects.len()
    }

    pub fn current_project(&self) -> Option<&Project> {
        self.current.and_then(|index| self.projects.get(index))
    }

    /// Position of the current project in `projects()`, if there is one.
    pub fn current_project_index(&self) -> Option<usize> {
        self.current
    }

    pub fn get_project_by_name(&self, name: &str) -> Option<&Project> {
        self.projects.iter().find(|project| project.name == name)
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.projects.iter().position(|project| project.name == name)
    }

    /// Appends the project and makes it current. Returns its position.
    pub fn add_project(&mut self, mut project: Project) -> Result<usize, ManagerError> {
        if project.name.trim().is_empty() {
            project.name = UNTITLED_PROJECT_NAME.to_string();
        }
        self.projects.push(project);
        let index = self.projects.len() - 1;
        self.current = Some(index);
        self.persist()?;
        Ok(index)
    }

    /// Removes the project at `index`. When it was the current project, the
    /// last remaining project becomes current.
    pub fn remove_project(&mut self, index: usize) -> Result<Project, ManagerError> {
        if index >= self.projects.len() {
            return Err(ManagerError::NoProjectAt(index));
        }

        let removed = self.projects.remove(index);
        self.current = match self.current {
            Some(current) if current == index => self.projects.len().checked_sub(1),
            Some(current) if current > index => Some(current - 1),
            other => other,
        };

        self.persist()?;
        Ok(removed)
    }

    pub fn set_current_project(&mut self, index: usize) -> Result<(), ManagerError> {
        if index >= self.projects.len() {
            return Err(ManagerError::NoProjectAt(index));
        }
        self.current = Some(index);
        self.persist()?;
        Ok(())
    }

    pub fn set_current_project_by_name(&mut self, name: &str) -> Result<usize, ManagerError> {
        let index = self
            .position_of(name)
            .ok_or_else(|| ManagerError::ProjectNotFound(name.to_string()))?;
        self.set_current_project(index)?;
        Ok(index)
    }

    /// Renames the project at `index`. Todos that referenced the old name
    /// keep doing so.
    pub fn rename_project(&mut self, index: usize, new_name: &str) -> Result<(), ManagerError> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(MissingField("name").into());
        }

        let project = self
            .projects
            .get_mut(index)
            .ok_or(ManagerError::NoProjectAt(index))?;

        let stale = project
            .todos
            .iter()
            .filter(|todo| todo.project == project.name)
            .count();
        if stale > 0 {
            debug!(
                "Renaming '{}' to '{}' leaves {} todo(s) referencing the old name",
                project.name, new_name, stale
            );
        }

        project.rename(new_name);
        self.persist()?;
        Ok(())
    }

    /// Appends the todo to the current project.
    pub fn add_todo(&mut self, todo: ToDo) -> Result<Uuid, ManagerError> {
        let id = todo.id();
        let project = self.current_project_mut()?;
        project.add_todo(todo);
        self.persist()?;
        Ok(id)
    }

    /// Appends the todo to the first project called `project_name`.
    pub fn add_todo_to_project(
        &mut self,
        project_name: &str,
        todo: ToDo,
    ) -> Result<Uuid, ManagerError> {
        let id = todo.id();
        let project = self
            .projects
            .iter_mut()
            .find(|project| project.name == project_name)
            .ok_or_else(|| ManagerError::ProjectNotFound(project_name.to_string()))?;
        project.add_todo(todo);
        self.persist()?;
        Ok(id)
    }

    /// Flips completion of a todo in the current project. Returns the new state.
    pub fn toggle_todo(&mut self, id: Uuid) -> Result<bool, ManagerError> {
        let todo = self
            .current_project_mut()?
            .get_todo_mut(id)
            .ok_or(ManagerError::TodoNotFound(id))?;
        todo.toggle_complete();
        let completed = todo.completed;
        self.persist()?;
        Ok(completed)
    }

    /// Edits a todo of the current project in place. A changed `project`
    /// only rewrites the back-reference; the todo is not moved.
    pub fn edit_todo(&mut self, id: Uuid, edit: ToDoEdit) -> Result<(), ManagerError> {
        let todo = self
            .current_project_mut()?
            .get_todo_mut(id)
            .ok_or(ManagerError::TodoNotFound(id))?;
        todo.apply_edit(edit)?;
        self.persist()?;
        Ok(())
    }

    /// Deletes a todo from the project its back-reference names.
    ///
    /// Fails with `ProjectNotFound` when that name no longer resolves (for
    /// example after a rename) and `TodoNotFound` when the resolved project
    /// does not hold the todo.
    pub fn delete_todo(&mut self, id: Uuid) -> Result<ToDo, ManagerError> {
        let owner_name = self
            .find_todo(id)
            .map(|todo| todo.project.clone())
            .ok_or(ManagerError::TodoNotFound(id))?;

        let index = self
            .position_of(&owner_name)
            .ok_or_else(|| ManagerError::ProjectNotFound(owner_name.clone()))?;

        let project = &mut self.projects[index];
        let todo = project
            .get_todo(id)
            .cloned()
            .ok_or(ManagerError::TodoNotFound(id))?;
        project.remove_todo(id);

        self.persist()?;
        Ok(todo)
    }

    /// Installs the starter project when there are no projects at all.
    /// Returns whether anything was seeded.
    pub fn seed_default(&mut self, due_date: DueDate) -> Result<bool, ManagerError> {
        if !self.projects.is_empty() {
            return Ok(false);
        }

        let mut project = Project::new(DEFAULT_PROJECT_NAME);
        project.add_todo(ToDo::new(
            "Finish homework",
            Priority::High,
            DEFAULT_PROJECT_NAME,
            due_date,
        ));

        info!("Seeding '{}'", DEFAULT_PROJECT_NAME);
        self.add_project(project)?;
        Ok(true)
    }

    pub fn to_record(&self) -> ManagerRecord {
        ManagerRecord {
            projects: self.projects.iter().map(Project::to_record).collect(),
            current_project: self.current_project().map(|project| project.name.clone()),
        }
    }

    /// Writes the whole state under the storage key.
    pub fn persist(&self) -> Result<(), StorageError> {
        let json = serde_json::to_string(&self.to_record())
            .map_err(|e| StorageError::SerializeFailed { source: e })?;
        self.storage.set(&self.storage_key, &json)?;
        debug!("Persisted '{}' ({} bytes)", self.storage_key, json.len());
        Ok(())
    }

    /// Replaces the state with what is stored under the storage key.
    ///
    /// Unreadable data is discarded as a whole and the state stays as it
    /// was. A stored current-project name with no matching project leaves
    /// no current project.
    pub fn restore(&mut self) -> Result<RestoreOutcome, StorageError> {
        let stored = match self.storage.get(&self.storage_key) {
            Err(StorageError::ParseFailed { path, source }) => {
                warn!("Discarding unreadable store {}: {}", path.display(), source);
                return Ok(RestoreOutcome::Discarded {
                    reason: source.to_string(),
                });
            }
            other => other?,
        };

        let raw = match stored {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => {
                info!("No saved state under '{}'", self.storage_key);
                return Ok(RestoreOutcome::NoSavedState);
            }
        };

        let record: ManagerRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!("Discarding saved state under '{}': {}", self.storage_key, e);
                return Ok(RestoreOutcome::Discarded {
                    reason: e.to_string(),
                });
            }
        };

        let policy = self.id_policy;
        self.projects = record
            .projects
            .into_iter()
            .map(|project| Project::from_record_with(project, policy))
            .collect();

        self.current = record
            .current_project
            .and_then(|name| match self.position_of(&name) {
                Some(index) => Some(index),
                None => {
                    warn!("Saved current project '{}' no longer exists", name);
                    None
                }
            });

        info!(
            "Restored {} project(s) from '{}'",
            self.projects.len(),
            self.storage_key
        );
        Ok(RestoreOutcome::Restored {
            projects: self.projects.len(),
        })
    }

    fn current_project_mut(&mut self) -> Result<&mut Project, ManagerError> {
        let index = self.current.ok_or(ManagerError::NoCurrentProject)?;
        self.projects
            .get_mut(index)
            .ok_or(ManagerError::NoCurrentProject)
    }

    fn find_todo(&self, id: Uuid) -> Option<&ToDo> {
        self.current_project()
            .and_then(|project| project.get_todo(id))
            .or_else(|| self.projects.iter().find_map(|project| project.get_todo(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;

    fn due() -> DueDate {
        "2024-05-03T10:00:00Z".parse().unwrap()
    }

    fn todo(title: &str, project: &str) -> ToDo {
        ToDo::new(title, Priority::Medium, project, due())
    }

    fn stored_record(store: &MemoryStore) -> serde_json::Value {
        let raw = store.get(DEFAULT_STORAGE_KEY).unwrap().unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn test_empty_manager_has_no_current_project() {
        let store = MemoryStore::new();
        let manager = ProjectManager::new(&store);

        assert_eq!(manager.projects_size(), 0);
        assert!(manager.current_project().is_none());
        assert_eq!(manager.current_project_index(), None);
    }

    #[test]
    fn test_add_project_makes_it_current_and_persists() {
        let store = MemoryStore::new();
        let mut manager = ProjectManager::new(&store);

        manager.add_project(Project::new("Work")).unwrap();
        manager.add_project(Project::new("Home")).unwrap();

        assert_eq!(manager.current_project_index(), Some(1));
        assert_eq!(manager.current_project().unwrap().name, "Home");

        let record = stored_record(&store);
        assert_eq!(record["projects"].as_array().unwrap().len(), 2);
        assert_eq!(record["currentProject"], "Home");
    }

    #[test]
    fn test_blank_project_name_becomes_untitled() {
        let store = MemoryStore::new();
        let mut manager = ProjectManager::new(&store);

        manager.add_project(Project::new("  ")).unwrap();

        assert_eq!(manager.projects()[0].name, UNTITLED_PROJECT_NAME);
    }

    #[test]
    fn test_remove_current_project_selects_last_remaining() {
        let store = MemoryStore::new();
        let mut manager = ProjectManager::new(&store);
        manager.add_project(Project::new("A")).unwrap();
        manager.add_project(Project::new("B")).unwrap();
        manager.add_project(Project::new("C")).unwrap();
        manager.set_current_project(0).unwrap();

        let removed = manager.remove_project(0).unwrap();

        assert_eq!(removed.name, "A");
        assert_eq!(manager.current_project().unwrap().name, "C");
    }

    #[test]
    fn test_remove_non_current_project_keeps_current() {
        let store = MemoryStore::new();
        let mut manager = ProjectManager::new(&store);
        manager.add_project(Project::new("A")).unwrap();
        manager.add_project(Project::new("B")).unwrap();
        manager.add_project(Project::new("C")).unwrap();
        manager.set_current_project(1).unwrap();

        manager.remove_project(0).unwrap();
        assert_eq!(manager.current_project().unwrap().name, "B");
        assert_eq!(manager.current_project_index(), Some(0));

        manager.remove_project(1).unwrap();
        assert_eq!(manager.current_project().unwrap().name, "B");
    }

    #[test]
    fn test_remove_last_project_clears_current() {
        let store = MemoryStore::new();
        let mut manager = ProjectManager::new(&store);
        manager.add_project(Project::new("Only")).unwrap();

        manager.remove_project(0).unwrap();

        assert!(manager.current_project().is_none());
        assert_eq!(manager.current_project_index(), None);
        assert_eq!(stored_record(&store)["currentProject"], serde_json::Value::Null);
    }

    #[test]
    fn test_remove_project_out_of_range() {
        let store = MemoryStore::new();
        let mut manager = ProjectManager::new(&store);
        manager.add_project(Project::new("Only")).unwrap();

        assert!(matches!(
            manager.remove_project(3),
            Err(ManagerError::NoProjectAt(3))
        ));
        assert_eq!(manager.projects_size(), 1);
    }

    #[test]
    fn test_add_todo_without_current_project_fails() {
        let store = MemoryStore::new();
        let mut manager = ProjectManager::new(&store);

        let result = manager.add_todo(todo("Ship report", "Work"));

        assert!(matches!(result, Err(ManagerError::NoCurrentProject)));
        assert_eq!(store.get(DEFAULT_STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn test_add_todo_goes_to_current_project() {
        let store = MemoryStore::new();
        let mut manager = ProjectManager::new(&store);
        manager.add_project(Project::new("Work")).unwrap();
        manager.add_project(Project::new("Home")).unwrap();

        manager.add_todo(todo("Water plants", "Home")).unwrap();

        assert_eq!(manager.projects()[0].todos.len(), 0);
        assert_eq!(manager.projects()[1].todos.len(), 1);
        assert_eq!(stored_record(&store)["projects"][1]["todos"][0]["title"], "Water plants");
    }

    #[test]
    fn test_add_todo_to_named_project() {
        let store = MemoryStore::new();
        let mut manager = ProjectManager::new(&store);
        manager.add_project(Project::new("Work")).unwrap();
        manager.add_project(Project::new("Home")).unwrap();

        manager
            .add_todo_to_project("Work", todo("Ship report", "Work"))
            .unwrap();

        assert_eq!(manager.projects()[0].todos.len(), 1);
        assert_eq!(manager.current_project().unwrap().name, "Home");
        assert!(matches!(
            manager.add_todo_to_project("Garden", todo("Dig", "Garden")),
            Err(ManagerError::ProjectNotFound(name)) if name == "Garden"
        ));
    }

    #[test]
    fn test_get_project_by_name_returns_first_match() {
        let store = MemoryStore::new();
        let mut manager = ProjectManager::new(&store);
        let mut first = Project::new("Dup");
        first.add_todo(todo("marker", "Dup"));
        manager.add_project(first).unwrap();
        manager.add_project(Project::new("Dup")).unwrap();

        let found = manager.get_project_by_name("Dup").unwrap();
        assert_eq!(found.todos.len(), 1);
        assert!(manager.get_project_by_name("Missing").is_none());
    }

    #[test]
    fn test_set_current_project_by_name() {
        let store = MemoryStore::new();
        let mut manager = ProjectManager::new(&store);
        manager.add_project(Project::new("Work")).unwrap();
        manager.add_project(Project::new("Home")).unwrap();

        assert_eq!(manager.set_current_project_by_name("Work").unwrap(), 0);
        assert_eq!(stored_record(&store)["currentProject"], "Work");
        assert!(matches!(
            manager.set_current_project_by_name("Garden"),
            Err(ManagerError::ProjectNotFound(_))
        ));
    }

    #[test]
    fn test_toggle_todo_persists() {
        let store = MemoryStore::new();
        let mut manager = ProjectManager::new(&store);
        manager.add_project(Project::new("Work")).unwrap();
        let id = manager.add_todo(todo("Ship report", "Work")).unwrap();

        assert!(manager.toggle_todo(id).unwrap());
        assert_eq!(stored_record(&store)["projects"][0]["todos"][0]["completed"], true);
        assert!(!manager.toggle_todo(id).unwrap());

        let missing = Uuid::new_v4();
        assert!(matches!(
            manager.toggle_todo(missing),
            Err(ManagerError::TodoNotFound(id)) if id == missing
        ));
    }

    #[test]
    fn test_edit_todo_reassigns_back_reference_without_moving() {
        let store = MemoryStore::new();
        let mut manager = ProjectManager::new(&store);
        manager.add_project(Project::new("Home")).unwrap();
        manager.add_project(Project::new("Work")).unwrap();
        let id = manager.add_todo(todo("Ship report", "Work")).unwrap();

        let edit = ToDoEdit {
            title: String::from("Ship report v2"),
            priority: Priority::High,
            project: String::from("Home"),
            due_date: "2024-06-01".parse().unwrap(),
        };
        manager.edit_todo(id, edit).unwrap();

        let work = manager.get_project_by_name("Work").unwrap();
        assert_eq!(work.todos.len(), 1);
        assert_eq!(work.todos[0].project, "Home");
        assert_eq!(work.todos[0].title, "Ship report v2");
        assert!(manager.get_project_by_name("Home").unwrap().todos.is_empty());
    }

    #[test]
    fn test_edit_todo_with_blank_title_is_rejected() {
        let store = MemoryStore::new();
        let mut manager = ProjectManager::new(&store);
        manager.add_project(Project::new("Work")).unwrap();
        let id = manager.add_todo(todo("Ship report", "Work")).unwrap();

        let edit = ToDoEdit {
            title: String::new(),
            priority: Priority::High,
            project: String::from("Work"),
            due_date: due(),
        };

        assert!(matches!(
            manager.edit_todo(id, edit),
            Err(ManagerError::MissingField(MissingField("title")))
        ));
        assert_eq!(manager.projects()[0].todos[0].title, "Ship report");
    }

    #[test]
    fn test_delete_todo_removes_only_matching_id() {
        let store = MemoryStore::new();
        let mut manager = ProjectManager::new(&store);
        manager.add_project(Project::new("Work")).unwrap();
        let first = manager.add_todo(todo("Same", "Work")).unwrap();
        let second = manager.add_todo(todo("Same", "Work")).unwrap();
        let third = manager.add_todo(todo("Other", "Work")).unwrap();

        let deleted = manager.delete_todo(second).unwrap();

        assert_eq!(deleted.id(), second);
        let remaining: Vec<Uuid> = manager.projects()[0].todos.iter().map(ToDo::id).collect();
        assert_eq!(remaining, vec![first, third]);
    }

    #[test]
    fn test_delete_todo_twice_is_not_found() {
        let store = MemoryStore::new();
        let mut manager = ProjectManager::new(&store);
        manager.add_project(Project::new("Work")).unwrap();
        let id = manager.add_todo(todo("Ship report", "Work")).unwrap();

        manager.delete_todo(id).unwrap();

        assert!(matches!(
            manager.delete_todo(id),
            Err(ManagerError::TodoNotFound(_))
        ));
    }

    #[test]
    fn test_delete_todo_after_rename_reports_stale_project() {
        let store = MemoryStore::new();
        let mut manager = ProjectManager::new(&store);
        manager.add_project(Project::new("Work")).unwrap();
        let id = manager.add_todo(todo("Ship report", "Work")).unwrap();
        manager.rename_project(0, "Office").unwrap();

        assert!(matches!(
            manager.delete_todo(id),
            Err(ManagerError::ProjectNotFound(name)) if name == "Work"
        ));
        assert_eq!(manager.projects()[0].todos.len(), 1);
    }

    #[test]
    fn test_rename_project_does_not_cascade() {
        let store = MemoryStore::new();
        let mut manager = ProjectManager::new(&store);
        manager.add_project(Project::new("Work")).unwrap();
        manager.add_todo(todo("Ship report", "Work")).unwrap();

        manager.rename_project(0, "  Office ").unwrap();

        let project = &manager.projects()[0];
        assert_eq!(project.name, "Office");
        assert_eq!(project.todos[0].project, "Work");
        assert_eq!(stored_record(&store)["currentProject"], "Office");
    }

    #[test]
    fn test_rename_project_rejects_blank_name() {
        let store = MemoryStore::new();
        let mut manager = ProjectManager::new(&store);
        manager.add_project(Project::new("Work")).unwrap();

        assert!(matches!(
            manager.rename_project(0, "   "),
            Err(ManagerError::MissingField(_))
        ));
        assert_eq!(manager.projects()[0].name, "Work");
    }

    #[test]
    fn test_persist_then_restore_round_trip() {
        let store = MemoryStore::new();
        let mut manager = ProjectManager::new(&store);
        let due = DueDate::days_after(jiff::Timestamp::now(), 2).unwrap();

        manager.add_project(Project::new("Work")).unwrap();
        manager
            .add_todo(ToDo::new("Ship report", Priority::High, "Work", due))
            .unwrap();
        manager.add_project(Project::new("Home")).unwrap();
        manager.persist().unwrap();

        let mut restored = ProjectManager::new(&store);
        let outcome = restored.restore().unwrap();

        assert_eq!(outcome, RestoreOutcome::Restored { projects: 2 });
        assert_eq!(restored.projects_size(), 2);
        assert_eq!(restored.projects()[0].name, "Work");
        assert_eq!(restored.projects()[0].todos.len(), 1);
        assert_eq!(restored.projects()[0].todos[0].title, "Ship report");
        assert_eq!(restored.projects()[0].todos[0].priority, Priority::High);
        assert_eq!(restored.projects()[0].todos[0].due_date, due);
        assert_eq!(restored.projects()[1].name, "Home");
        assert!(restored.projects()[1].todos.is_empty());
        assert_eq!(restored.current_project().unwrap().name, "Home");
        assert_eq!(restored.current_project_index(), Some(1));
    }

    #[test]
    fn test_restore_regenerates_ids_by_default() {
        let store = MemoryStore::new();
        let mut manager = ProjectManager::new(&store);
        manager.add_project(Project::new("Work")).unwrap();
        let id = manager.add_todo(todo("Ship report", "Work")).unwrap();

        let mut restored = ProjectManager::new(&store);
        restored.restore().unwrap();
        assert_ne!(restored.projects()[0].todos[0].id(), id);

        let mut preserving = ProjectManager::new(&store).with_id_policy(IdPolicy::Preserve);
        preserving.restore().unwrap();
        assert_eq!(preserving.projects()[0].todos[0].id(), id);
    }

    #[test]
    fn test_restore_without_saved_state() {
        let store = MemoryStore::new();
        let mut manager = ProjectManager::new(&store);

        assert_eq!(manager.restore().unwrap(), RestoreOutcome::NoSavedState);
        assert_eq!(manager.projects_size(), 0);

        store.set(DEFAULT_STORAGE_KEY, "").unwrap();
        assert_eq!(manager.restore().unwrap(), RestoreOutcome::NoSavedState);
    }

    #[test]
    fn test_restore_discards_malformed_state() {
        let store = MemoryStore::new();
        store.set(DEFAULT_STORAGE_KEY, "{ not json").unwrap();
        let mut manager = ProjectManager::new(&store);

        let outcome = manager.restore().unwrap();

        assert!(matches!(outcome, RestoreOutcome::Discarded { .. }));
        assert_eq!(manager.projects_size(), 0);
        assert!(manager.current_project().is_none());
    }

    #[test]
    fn test_restore_discards_wrong_shape_entirely() {
        let store = MemoryStore::new();
        store
            .set(
                DEFAULT_STORAGE_KEY,
                r#"{"projects": [
                    {"name": "Work", "todos": []},
                    {"name": "Home", "todos": [{"title": "x", "priority": "urgent",
                        "project": "Home", "dueDate": "2024-05-03"}]}
                ], "currentProject": "Work"}"#,
            )
            .unwrap();
        let mut manager = ProjectManager::new(&store);

        assert!(matches!(
            manager.restore().unwrap(),
            RestoreOutcome::Discarded { .. }
        ));
        assert_eq!(manager.projects_size(), 0);
    }

    #[test]
    fn test_restore_discard_keeps_existing_state() {
        let store = MemoryStore::new();
        let mut manager = ProjectManager::new(&store);
        manager.add_project(Project::new("Work")).unwrap();
        manager.add_todo(todo("Ship report", "Work")).unwrap();
        manager.add_project(Project::new("Home")).unwrap();
        manager.set_current_project(0).unwrap();
        let before = manager.projects().to_vec();

        store.set(DEFAULT_STORAGE_KEY, "{ truncated").unwrap();
        let outcome = manager.restore().unwrap();

        assert!(matches!(outcome, RestoreOutcome::Discarded { .. }));
        assert_eq!(manager.projects(), before.as_slice());
        assert_eq!(manager.current_project_index(), Some(0));
        assert_eq!(manager.current_project().unwrap().name, "Work");
    }

    #[test]
    fn test_unreadable_data_file_is_discarded_and_reseeded() {
        use crate::storage::json::JsonFileStore;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{ truncated").unwrap();
        let mut manager = ProjectManager::new(JsonFileStore::new(path.clone()));

        assert!(matches!(
            manager.restore().unwrap(),
            RestoreOutcome::Discarded { .. }
        ));
        assert!(manager.seed_default(due()).unwrap());

        let mut reloaded = ProjectManager::new(JsonFileStore::new(path));
        assert_eq!(
            reloaded.restore().unwrap(),
            RestoreOutcome::Restored { projects: 1 }
        );
        assert_eq!(reloaded.projects()[0].name, DEFAULT_PROJECT_NAME);

        let backup = std::fs::read_dir(dir.path().join("backups"))
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| std::fs::read_to_string(entry.path()).unwrap())
            .any(|content| content == "{ truncated");
        assert!(backup, "the unreadable file should be kept as a backup");
    }

    #[test]
    fn test_restore_with_unknown_current_project_leaves_none() {
        let store = MemoryStore::new();
        store
            .set(
                DEFAULT_STORAGE_KEY,
                r#"{"projects": [{"name": "Work", "todos": []}], "currentProject": "Gone"}"#,
            )
            .unwrap();
        let mut manager = ProjectManager::new(&store);

        manager.restore().unwrap();

        assert_eq!(manager.projects_size(), 1);
        assert!(manager.current_project().is_none());
        assert_eq!(manager.current_project_index(), None);
    }

    #[test]
    fn test_restore_accepts_browser_shaped_dates() {
        let store = MemoryStore::new();
        store
            .set(
                DEFAULT_STORAGE_KEY,
                r#"{"projects": [{"name": "Default Project", "todos": [
                    {"id": "c0ffee00-0000-4000-8000-000000000000", "title": "Finish homework",
                     "priority": "high", "project": "Default Project",
                     "dueDate": "2024-05-03T10:00:00.000Z", "completed": false},
                    {"id": "c0ffee00-0000-4000-8000-000000000001", "title": "Read",
                     "priority": "low", "project": "Default Project",
                     "dueDate": "2024-05-04T18:30", "completed": true}
                ]}], "currentProject": "Default Project"}"#,
            )
            .unwrap();
        let mut manager = ProjectManager::new(&store);

        manager.restore().unwrap();

        let project = manager.current_project().unwrap();
        assert_eq!(project.todos.len(), 2);
        assert!(matches!(project.todos[0].due_date, DueDate::Instant(_)));
        assert!(matches!(project.todos[1].due_date, DueDate::DateTime(_)));
        assert!(project.todos[1].completed);
    }

    #[test]
    fn test_custom_storage_key() {
        let store = MemoryStore::new();
        let mut manager = ProjectManager::new(&store).with_storage_key("other");
        manager.add_project(Project::new("Work")).unwrap();

        assert!(store.get("other").unwrap().is_some());
        assert_eq!(store.get(DEFAULT_STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn test_seed_default_only_when_empty() {
        let store = MemoryStore::new();
        let mut manager = ProjectManager::new(&store);

        assert!(manager.seed_default(due()).unwrap());
        assert!(!manager.seed_default(due()).unwrap());

        let project = manager.current_project().unwrap();
        assert_eq!(project.name, DEFAULT_PROJECT_NAME);
        assert_eq!(project.todos.len(), 1);
        assert_eq!(project.todos[0].title, "Finish homework");
        assert_eq!(project.todos[0].priority, Priority::High);
        assert_eq!(project.todos[0].project, DEFAULT_PROJECT_NAME);
        assert_eq!(stored_record(&store)["currentProject"], DEFAULT_PROJECT_NAME);
    }

    #[test]
    fn test_round_trip_through_json_file() {
        use crate::storage::json::JsonFileStore;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut manager = ProjectManager::new(JsonFileStore::new(path.clone()));
        manager.seed_default(due()).unwrap();
        manager.add_project(Project::new("Home")).unwrap();
        manager.set_current_project(0).unwrap();

        let mut restored = ProjectManager::new(JsonFileStore::new(path));
        assert_eq!(
            restored.restore().unwrap(),
            RestoreOutcome::Restored { projects: 2 }
        );
        assert_eq!(restored.current_project().unwrap().name, DEFAULT_PROJECT_NAME);
        assert_eq!(restored.projects()[0].todos[0].title, "Finish homework");
    }

    #[test]
    fn test_managers_share_store_through_rc() {
        let store = std::rc::Rc::new(MemoryStore::new());
        let mut writer = ProjectManager::new(store.clone());
        writer.add_project(Project::new("Work")).unwrap();

        let mut reader = ProjectManager::new(store);
        reader.restore().unwrap();
        assert_eq!(reader.projects_size(), 1);
    }
}
