//! Project record, owned by one user.

use super::{require_text, today, Model, ModelValidationError, UserId};
use crate::db::schema::TableDef;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub type ProjectId = i64;

pub const TITLE_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub is_done: bool,
    pub created_at: NaiveDate,
}

impl Project {
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("project", "title", &self.title, TITLE_MAX_CHARS)
    }
}

impl Model for Project {
    const TABLE: TableDef = TableDef {
        name: "projects",
        ddl: include_str!("../db/schema/projects.sql"),
    };
}

impl Display for Project {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Project(title={:?})", self.title)
    }
}

/// Insert request for `projects`. New projects start not done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
    /// Defaults to today when `None`.
    pub created_at: Option<NaiveDate>,
}

impl NewProject {
    pub fn new(user_id: UserId, title: impl Into<String>) -> Self {
        Self {
            user_id,
            title: title.into(),
            description: None,
            created_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("project", "title", &self.title, TITLE_MAX_CHARS)
    }

    pub fn created_on(&self) -> NaiveDate {
        self.created_at.unwrap_or_else(today)
    }

    pub(crate) fn into_project(self, id: ProjectId, created_at: NaiveDate) -> Project {
        Project {
            id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            is_done: false,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_project_starts_open_with_description() {
        let request = NewProject::new(7, "Garden").with_description("raised beds");
        let project = request.clone().into_project(3, request.created_on());
        assert!(!project.is_done);
        assert_eq!(project.user_id, 7);
        assert_eq!(project.description.as_deref(), Some("raised beds"));
        assert_eq!(project.to_string(), "Project(title=\"Garden\")");
    }

    #[test]
    fn blank_title_is_required() {
        assert!(matches!(
            NewProject::new(1, "").validate(),
            Err(ModelValidationError::Required { field: "title", .. })
        ));
    }
}
