//! Persistent records for users, projects, tasks, habits and habit logs.
//!
//! # Responsibility
//! - Define the row shapes and create requests of every table.
//! - Register each record's table with the schema registry via `Model`.
//!
//! # Invariants
//! - Children reference parents by id only; reverse lookups go through
//!   repository queries.
//! - Required text fields are non-blank and within their column limits.
//! - Deletion is hard delete, restricted while children exist.

use crate::db::schema::TableDef;
use chrono::{Local, NaiveDate};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod habit;
pub mod project;
pub mod task;
pub mod user;

pub use habit::{Habit, HabitId, HabitLog, HabitLogId, NewHabit, NewHabitLog};
pub use project::{NewProject, Project, ProjectId};
pub use task::{NewTask, Task, TaskId};
pub use user::{NewUser, User, UserId};

/// Declarative base every persistent record attaches to.
pub trait Model {
    /// Table this record maps to.
    const TABLE: TableDef;
}

/// Field-level rejection raised before any SQL runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    Required {
        entity: &'static str,
        field: &'static str,
    },
    TooLong {
        entity: &'static str,
        field: &'static str,
        max_chars: usize,
        actual_chars: usize,
    },
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Required { entity, field } => write!(f, "{entity}.{field} is required"),
            Self::TooLong {
                entity,
                field,
                max_chars,
                actual_chars,
            } => write!(
                f,
                "{entity}.{field} must be at most {max_chars} characters, got {actual_chars}"
            ),
        }
    }
}

impl Error for ModelValidationError {}

/// Current local calendar day; the default for creation dates.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub(crate) fn require_text(
    entity: &'static str,
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<(), ModelValidationError> {
    if value.trim().is_empty() {
        return Err(ModelValidationError::Required { entity, field });
    }
    limit_text(entity, field, value, max_chars)
}

pub(crate) fn limit_optional_text(
    entity: &'static str,
    field: &'static str,
    value: Option<&str>,
    max_chars: usize,
) -> Result<(), ModelValidationError> {
    match value {
        Some(value) => limit_text(entity, field, value, max_chars),
        None => Ok(()),
    }
}

fn limit_text(
    entity: &'static str,
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<(), ModelValidationError> {
    let actual_chars = value.chars().count();
    if actual_chars > max_chars {
        return Err(ModelValidationError::TooLong {
            entity,
            field,
            max_chars,
            actual_chars,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_text_rejects_blank() {
        assert_eq!(
            require_text("project", "title", "  ", 10),
            Err(ModelValidationError::Required {
                entity: "project",
                field: "title"
            })
        );
    }

    #[test]
    fn limits_count_characters_not_bytes() {
        assert!(require_text("habit", "name", "упражнения", 10).is_ok());
        assert!(matches!(
            require_text("habit", "name", "упражнения!", 10),
            Err(ModelValidationError::TooLong {
                actual_chars: 11,
                ..
            })
        ));
    }

    #[test]
    fn optional_text_allows_none() {
        assert!(limit_optional_text("task", "priority", None, 20).is_ok());
    }
}
