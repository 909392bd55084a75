//! Task record, owned by one project and, redundantly, by that project's user.
//!
//! # Invariants
//! - `(project_id, user_id)` always equals the owning project's
//!   `(id, user_id)`; the `tasks` table enforces this with a composite
//!   foreign key.

use super::{
    limit_optional_text, require_text, today, Model, ModelValidationError, Project, ProjectId,
    UserId,
};
use crate::db::schema::TableDef;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub type TaskId = i64;

pub const TITLE_MAX_CHARS: usize = 200;
pub const PRIORITY_MAX_CHARS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
    /// Free-form label such as `high` or `low`.
    pub priority: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub is_done: bool,
    pub created_at: NaiveDate,
}

impl Task {
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        validate_fields(&self.title, self.priority.as_deref())
    }
}

impl Model for Task {
    const TABLE: TableDef = TableDef {
        name: "tasks",
        ddl: include_str!("../db/schema/tasks.sql"),
    };
}

impl Display for Task {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Task(title={:?})", self.title)
    }
}

/// Insert request for `tasks`. New tasks start not done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<NaiveDate>,
    /// Defaults to today when `None`.
    pub created_at: Option<NaiveDate>,
}

impl NewTask {
    pub fn new(project_id: ProjectId, user_id: UserId, title: impl Into<String>) -> Self {
        Self {
            project_id,
            user_id,
            title: title.into(),
            description: None,
            priority: None,
            due_date: None,
            created_at: None,
        }
    }

    /// Builds a request whose owner is taken from `project`.
    pub fn in_project(project: &Project, title: impl Into<String>) -> Self {
        Self::new(project.id, project.user_id, title)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    pub fn due_on(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        validate_fields(&self.title, self.priority.as_deref())
    }

    pub fn created_on(&self) -> NaiveDate {
        self.created_at.unwrap_or_else(today)
    }

    pub(crate) fn into_task(self, id: TaskId, created_at: NaiveDate) -> Task {
        Task {
            id,
            project_id: self.project_id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            priority: self.priority,
            due_date: self.due_date,
            is_done: false,
            created_at,
        }
    }
}

fn validate_fields(title: &str, priority: Option<&str>) -> Result<(), ModelValidationError> {
    require_text("task", "title", title, TITLE_MAX_CHARS)?;
    limit_optional_text("task", "priority", priority, PRIORITY_MAX_CHARS)
}
