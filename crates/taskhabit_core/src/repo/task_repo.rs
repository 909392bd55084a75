//! Task repository contract and SQLite implementation.
//!
//! # Invariants
//! - Inserts must name an existing project together with that project's
//!   owner; the composite foreign key rejects anything else.
//! - Listing is deterministic: `due_date ASC NULLS LAST, created_at ASC, id ASC`.

use super::{ensure_changed, parse_flag, RepoResult};
use crate::model::{NewTask, ProjectId, Task, TaskId, UserId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const TASK_SELECT_SQL: &str = "SELECT
    id,
    project_id,
    user_id,
    title,
    description,
    priority,
    due_date,
    is_done,
    created_at
FROM tasks";

/// Filter options for listing tasks. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListQuery {
    pub project_id: Option<ProjectId>,
    pub user_id: Option<UserId>,
    pub is_done: Option<bool>,
    pub limit: Option<u32>,
    pub offset: u32,
}

pub trait TaskRepository {
    fn create_task(&self, task: &NewTask) -> RepoResult<Task>;
    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>>;
    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>>;
    /// Writes title, description, priority, due date and done flag.
    fn update_task(&self, task: &Task) -> RepoResult<()>;
    fn set_task_done(&self, id: TaskId, is_done: bool) -> RepoResult<()>;
    fn delete_task(&self, id: TaskId) -> RepoResult<()>;

    fn list_tasks_for_project(&self, project_id: ProjectId) -> RepoResult<Vec<Task>> {
        self.list_tasks(&TaskListQuery {
            project_id: Some(project_id),
            ..TaskListQuery::default()
        })
    }

    fn list_tasks_for_user(&self, user_id: UserId) -> RepoResult<Vec<Task>> {
        self.list_tasks(&TaskListQuery {
            user_id: Some(user_id),
            ..TaskListQuery::default()
        })
    }
}

pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn create_task(&self, task: &NewTask) -> RepoResult<Task> {
        task.validate()?;
        let created_at = task.created_on();

        self.conn.execute(
            "INSERT INTO tasks (
                project_id,
                user_id,
                title,
                description,
                priority,
                due_date,
                is_done,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7);",
            params![
                task.project_id,
                task.user_id,
                task.title.as_str(),
                task.description.as_deref(),
                task.priority.as_deref(),
                task.due_date,
                created_at,
            ],
        )?;

        Ok(task
            .clone()
            .into_task(self.conn.last_insert_rowid(), created_at))
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_task_row(row)?));
        }
        Ok(None)
    }

    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        let mut sql = format!("{TASK_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(project_id) = query.project_id {
            sql.push_str(" AND project_id = ?");
            bind_values.push(Value::Integer(project_id));
        }
        if let Some(user_id) = query.user_id {
            sql.push_str(" AND user_id = ?");
            bind_values.push(Value::Integer(user_id));
        }
        if let Some(is_done) = query.is_done {
            sql.push_str(" AND is_done = ?");
            bind_values.push(Value::Integer(i64::from(is_done)));
        }

        sql.push_str(" ORDER BY due_date IS NULL ASC, due_date ASC, created_at ASC, id ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    fn update_task(&self, task: &Task) -> RepoResult<()> {
        task.validate()?;

        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                title = ?1,
                description = ?2,
                priority = ?3,
                due_date = ?4,
                is_done = ?5
             WHERE id = ?6;",
            params![
                task.title.as_str(),
                task.description.as_deref(),
                task.priority.as_deref(),
                task.due_date,
                task.is_done,
                task.id,
            ],
        )?;
        ensure_changed(changed, "task", task.id)
    }

    fn set_task_done(&self, id: TaskId, is_done: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE tasks SET is_done = ?1 WHERE id = ?2;",
            params![is_done, id],
        )?;
        ensure_changed(changed, "task", id)
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM tasks WHERE id = ?1;", [id])?;
        ensure_changed(changed, "task", id)
    }
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    Ok(Task {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        user_id: row.get("user_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        priority: row.get("priority")?,
        due_date: row.get("due_date")?,
        is_done: parse_flag(row, "tasks", "is_done")?,
        created_at: row.get("created_at")?,
    })
}
