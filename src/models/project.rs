use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::todo::{IdPolicy, ToDo, ToDoRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    /// Name of the project. Lookups by name return the first match.
    pub name: String,
    /// Todos in insertion order
    pub todos: Vec<ToDo>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectRecord {
    pub name: String,
    pub todos: Vec<ToDoRecord>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            todos: vec![],
        }
    }

    pub fn add_todo(&mut self, todo: ToDo) {
        self.todos.push(todo);
    }

    /// Removes every todo with the given id and returns how many were removed.
    pub fn remove_todo(&mut self, id: Uuid) -> usize {
        let before = self.todos.len();
        self.todos.retain(|todo| todo.id() != id);
        before - self.todos.len()
    }

    /// Changes the project name only. Todos keep pointing at the old name.
    pub fn rename(&mut self, new_name: impl Into<String>) {
        self.name = new_name.into();
    }

    pub fn get_todo(&self, id: Uuid) -> Option<&ToDo> {
        self.todos.iter().find(|todo| todo.id() == id)
    }

    pub fn get_todo_mut(&mut self, id: Uuid) -> Option<&mut ToDo> {
        self.todos.iter_mut().find(|todo| todo.id() == id)
    }

    pub fn to_record(&self) -> ProjectRecord {
        ProjectRecord {
            name: self.name.clone(),
            todos: self.todos.iter().map(ToDo::to_record).collect(),
        }
    }

    pub fn from_record(record: ProjectRecord) -> Self {
        Self::from_record_with(record, IdPolicy::Regenerate)
    }

    pub fn from_record_with(record: ProjectRecord, policy: IdPolicy) -> Self {
        Self {
            name: record.name,
            todos: record
                .todos
                .into_iter()
                .map(|todo| ToDo::from_record_with(todo, policy))
                .collect(),
        }
    }
}
