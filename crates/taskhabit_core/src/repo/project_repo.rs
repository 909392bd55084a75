//! Project repository contract and SQLite implementation.
//!
//! # Invariants
//! - A project's owner never changes after insert.
//! - Listing is deterministic: `created_at ASC, id ASC`.

use super::{ensure_changed, parse_flag, RepoResult};
use crate::model::{NewProject, Project, ProjectId, UserId};
use rusqlite::{params, Connection, Row};

const PROJECT_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    title,
    description,
    is_done,
    created_at
FROM projects";

pub trait ProjectRepository {
    fn create_project(&self, project: &NewProject) -> RepoResult<Project>;
    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>>;
    fn list_projects_for_user(&self, user_id: UserId) -> RepoResult<Vec<Project>>;
    /// Writes title, description and done flag.
    fn update_project(&self, project: &Project) -> RepoResult<()>;
    fn set_project_done(&self, id: ProjectId, is_done: bool) -> RepoResult<()>;
    /// Fails with a constraint violation while the project has tasks.
    fn delete_project(&self, id: ProjectId) -> RepoResult<()>;
}

pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn create_project(&self, project: &NewProject) -> RepoResult<Project> {
        project.validate()?;
        let created_at = project.created_on();

        self.conn.execute(
            "INSERT INTO projects (user_id, title, description, is_done, created_at)
             VALUES (?1, ?2, ?3, 0, ?4);",
            params![
                project.user_id,
                project.title.as_str(),
                project.description.as_deref(),
                created_at,
            ],
        )?;

        Ok(project
            .clone()
            .into_project(self.conn.last_insert_rowid(), created_at))
    }

    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_project_row(row)?));
        }
        Ok(None)
    }

    fn list_projects_for_user(&self, user_id: UserId) -> RepoResult<Vec<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROJECT_SELECT_SQL}
             WHERE user_id = ?1
             ORDER BY created_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([user_id])?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }
        Ok(projects)
    }

    fn update_project(&self, project: &Project) -> RepoResult<()> {
        project.validate()?;

        let changed = self.conn.execute(
            "UPDATE projects
             SET
                title = ?1,
                description = ?2,
                is_done = ?3
             WHERE id = ?4;",
            params![
                project.title.as_str(),
                project.description.as_deref(),
                project.is_done,
                project.id,
            ],
        )?;
        ensure_changed(changed, "project", project.id)
    }

    fn set_project_done(&self, id: ProjectId, is_done: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE projects SET is_done = ?1 WHERE id = ?2;",
            params![is_done, id],
        )?;
        ensure_changed(changed, "project", id)
    }

    fn delete_project(&self, id: ProjectId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1;", [id])?;
        ensure_changed(changed, "project", id)
    }
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    Ok(Project {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        is_done: parse_flag(row, "projects", "is_done")?,
        created_at: row.get("created_at")?,
    })
}
