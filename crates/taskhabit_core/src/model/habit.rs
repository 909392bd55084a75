//! Habits and their per-day completion logs.
//!
//! # Invariants
//! - At most one log per `(habit_id, log_date)`.

use super::{limit_optional_text, require_text, today, Model, ModelValidationError, UserId};
use crate::db::schema::TableDef;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub type HabitId = i64;
pub type HabitLogId = i64;

pub const NAME_MAX_CHARS: usize = 100;
pub const FREQUENCY_MAX_CHARS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub user_id: UserId,
    pub name: String,
    /// Cadence label such as `daily` or `weekly`.
    pub frequency: Option<String>,
    pub created_at: NaiveDate,
}

impl Habit {
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        validate_habit(&self.name, self.frequency.as_deref())
    }
}

impl Model for Habit {
    const TABLE: TableDef = TableDef {
        name: "habits",
        ddl: include_str!("../db/schema/habits.sql"),
    };
}

impl Display for Habit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Habit(name={:?})", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHabit {
    pub user_id: UserId,
    pub name: String,
    pub frequency: Option<String>,
    /// Defaults to today when `None`.
    pub created_at: Option<NaiveDate>,
}

impl NewHabit {
    pub fn new(user_id: UserId, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            frequency: None,
            created_at: None,
        }
    }

    pub fn with_frequency(mut self, frequency: impl Into<String>) -> Self {
        self.frequency = Some(frequency.into());
        self
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        validate_habit(&self.name, self.frequency.as_deref())
    }

    pub fn created_on(&self) -> NaiveDate {
        self.created_at.unwrap_or_else(today)
    }

    pub(crate) fn into_habit(self, id: HabitId, created_at: NaiveDate) -> Habit {
        Habit {
            id,
            user_id: self.user_id,
            name: self.name,
            frequency: self.frequency,
            created_at,
        }
    }
}

fn validate_habit(name: &str, frequency: Option<&str>) -> Result<(), ModelValidationError> {
    require_text("habit", "name", name, NAME_MAX_CHARS)?;
    limit_optional_text("habit", "frequency", frequency, FREQUENCY_MAX_CHARS)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitLog {
    pub id: HabitLogId,
    pub habit_id: HabitId,
    pub log_date: NaiveDate,
    pub is_done: bool,
}

impl Model for HabitLog {
    const TABLE: TableDef = TableDef {
        name: "habit_logs",
        ddl: include_str!("../db/schema/habit_logs.sql"),
    };
}

impl Display for HabitLog {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "HabitLog(habit_id={}, date={})", self.habit_id, self.log_date)
    }
}

/// Insert request for `habit_logs`. Logs default to done, dated today.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHabitLog {
    pub habit_id: HabitId,
    pub log_date: Option<NaiveDate>,
    pub is_done: bool,
}

impl NewHabitLog {
    pub fn new(habit_id: HabitId) -> Self {
        Self {
            habit_id,
            log_date: None,
            is_done: true,
        }
    }

    pub fn on(mut self, log_date: NaiveDate) -> Self {
        self.log_date = Some(log_date);
        self
    }

    pub fn done(mut self, is_done: bool) -> Self {
        self.is_done = is_done;
        self
    }

    pub fn logged_on(&self) -> NaiveDate {
        self.log_date.unwrap_or_else(today)
    }

    pub(crate) fn into_log(self, id: HabitLogId, log_date: NaiveDate) -> HabitLog {
        HabitLog {
            id,
            habit_id: self.habit_id,
            log_date,
            is_done: self.is_done,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_log_defaults_to_done_today() {
        let request = NewHabitLog::new(5);
        assert!(request.is_done);
        assert_eq!(request.logged_on(), today());
    }

    #[test]
    fn display_identifies_records() {
        let habit = NewHabit::new(1, "Exercise")
            .with_frequency("daily")
            .into_habit(2, today());
        assert_eq!(habit.to_string(), "Habit(name=\"Exercise\")");

        let date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let log = NewHabitLog::new(2).on(date).done(false).into_log(3, date);
        assert_eq!(log.to_string(), "HabitLog(habit_id=2, date=2026-10-16)");
    }
}
