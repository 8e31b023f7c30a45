pub mod due_date;
pub mod priority;
pub mod project;
pub mod todo;
