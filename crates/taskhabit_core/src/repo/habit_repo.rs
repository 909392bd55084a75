//! Habit and habit-log repository contracts and SQLite implementations.
//!
//! # Invariants
//! - A second log for the same habit and day is a constraint violation.
//! - Logs list in `log_date ASC` order.

use super::{ensure_changed, parse_flag, RepoResult};
use crate::model::{Habit, HabitId, HabitLog, HabitLogId, NewHabit, NewHabitLog, UserId};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};

const HABIT_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    name,
    frequency,
    created_at
FROM habits";

const HABIT_LOG_SELECT_SQL: &str = "SELECT
    id,
    habit_id,
    log_date,
    is_done
FROM habit_logs";

pub trait HabitRepository {
    fn create_habit(&self, habit: &NewHabit) -> RepoResult<Habit>;
    fn get_habit(&self, id: HabitId) -> RepoResult<Option<Habit>>;
    fn list_habits_for_user(&self, user_id: UserId) -> RepoResult<Vec<Habit>>;
    /// Writes name and frequency.
    fn update_habit(&self, habit: &Habit) -> RepoResult<()>;
    /// Fails with a constraint violation while the habit has logs.
    fn delete_habit(&self, id: HabitId) -> RepoResult<()>;
}

pub trait HabitLogRepository {
    fn create_log(&self, log: &NewHabitLog) -> RepoResult<HabitLog>;
    fn get_log(&self, id: HabitLogId) -> RepoResult<Option<HabitLog>>;
    fn find_log_for_day(&self, habit_id: HabitId, log_date: NaiveDate)
        -> RepoResult<Option<HabitLog>>;
    fn list_logs_for_habit(&self, habit_id: HabitId) -> RepoResult<Vec<HabitLog>>;
    fn set_log_done(&self, id: HabitLogId, is_done: bool) -> RepoResult<()>;
    fn delete_log(&self, id: HabitLogId) -> RepoResult<()>;
}

pub struct SqliteHabitRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteHabitRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl HabitRepository for SqliteHabitRepository<'_> {
    fn create_habit(&self, habit: &NewHabit) -> RepoResult<Habit> {
        habit.validate()?;
        let created_at = habit.created_on();

        self.conn.execute(
            "INSERT INTO habits (user_id, name, frequency, created_at) VALUES (?1, ?2, ?3, ?4);",
            params![
                habit.user_id,
                habit.name.as_str(),
                habit.frequency.as_deref(),
                created_at,
            ],
        )?;

        Ok(habit
            .clone()
            .into_habit(self.conn.last_insert_rowid(), created_at))
    }

    fn get_habit(&self, id: HabitId) -> RepoResult<Option<Habit>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{HABIT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_habit_row(row)?));
        }
        Ok(None)
    }

    fn list_habits_for_user(&self, user_id: UserId) -> RepoResult<Vec<Habit>> {
        let mut stmt = self.conn.prepare(&format!(
            "{HABIT_SELECT_SQL}
             WHERE user_id = ?1
             ORDER BY created_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([user_id])?;
        let mut habits = Vec::new();
        while let Some(row) = rows.next()? {
            habits.push(parse_habit_row(row)?);
        }
        Ok(habits)
    }

    fn update_habit(&self, habit: &Habit) -> RepoResult<()> {
        habit.validate()?;

        let changed = self.conn.execute(
            "UPDATE habits SET name = ?1, frequency = ?2 WHERE id = ?3;",
            params![habit.name.as_str(), habit.frequency.as_deref(), habit.id],
        )?;
        ensure_changed(changed, "habit", habit.id)
    }

    fn delete_habit(&self, id: HabitId) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM habits WHERE id = ?1;", [id])?;
        ensure_changed(changed, "habit", id)
    }
}

pub struct SqliteHabitLogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteHabitLogRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl HabitLogRepository for SqliteHabitLogRepository<'_> {
    fn create_log(&self, log: &NewHabitLog) -> RepoResult<HabitLog> {
        let log_date = log.logged_on();

        self.conn.execute(
            "INSERT INTO habit_logs (habit_id, log_date, is_done) VALUES (?1, ?2, ?3);",
            params![log.habit_id, log_date, log.is_done],
        )?;

        Ok(log
            .clone()
            .into_log(self.conn.last_insert_rowid(), log_date))
    }

    fn get_log(&self, id: HabitLogId) -> RepoResult<Option<HabitLog>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{HABIT_LOG_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_log_row(row)?));
        }
        Ok(None)
    }

    fn find_log_for_day(
        &self,
        habit_id: HabitId,
        log_date: NaiveDate,
    ) -> RepoResult<Option<HabitLog>> {
        let mut stmt = self.conn.prepare(&format!(
            "{HABIT_LOG_SELECT_SQL} WHERE habit_id = ?1 AND log_date = ?2;"
        ))?;
        let mut rows = stmt.query(params![habit_id, log_date])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_log_row(row)?));
        }
        Ok(None)
    }

    fn list_logs_for_habit(&self, habit_id: HabitId) -> RepoResult<Vec<HabitLog>> {
        let mut stmt = self.conn.prepare(&format!(
            "{HABIT_LOG_SELECT_SQL}
             WHERE habit_id = ?1
             ORDER BY log_date ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([habit_id])?;
        let mut logs = Vec::new();
        while let Some(row) = rows.next()? {
            logs.push(parse_log_row(row)?);
        }
        Ok(logs)
    }

    fn set_log_done(&self, id: HabitLogId, is_done: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE habit_logs SET is_done = ?1 WHERE id = ?2;",
            params![is_done, id],
        )?;
        ensure_changed(changed, "habit_log", id)
    }

    fn delete_log(&self, id: HabitLogId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM habit_logs WHERE id = ?1;", [id])?;
        ensure_changed(changed, "habit_log", id)
    }
}

fn parse_habit_row(row: &Row<'_>) -> RepoResult<Habit> {
    Ok(Habit {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        frequency: row.get("frequency")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_log_row(row: &Row<'_>) -> RepoResult<HabitLog> {
    Ok(HabitLog {
        id: row.get("id")?,
        habit_id: row.get("habit_id")?,
        log_date: row.get("log_date")?,
        is_done: parse_flag(row, "habit_logs", "is_done")?,
    })
}
