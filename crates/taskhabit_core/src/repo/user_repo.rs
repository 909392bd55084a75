//! User repository contract and SQLite implementation.
//!
//! # Invariants
//! - Only digests are written to `users.password`.
//! - Duplicate usernames surface as constraint violations.

use super::{ensure_changed, RepoResult};
use crate::auth::password::PasswordDigest;
use crate::model::{NewUser, User, UserId};
use rusqlite::{params, Connection, Row};

const USER_SELECT_SQL: &str = "SELECT
    id,
    username,
    password,
    created_at
FROM users";

pub trait UserRepository {
    fn create_user(&self, user: &NewUser) -> RepoResult<User>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    /// Persists the digest currently held by `user`.
    fn update_password(&self, user: &User) -> RepoResult<()>;
    /// Fails with a constraint violation while the user owns any row.
    fn delete_user(&self, id: UserId) -> RepoResult<()>;
}

pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &NewUser) -> RepoResult<User> {
        user.validate()?;
        let created_at = user.created_on();

        self.conn.execute(
            "INSERT INTO users (username, password, created_at) VALUES (?1, ?2, ?3);",
            params![user.username.as_str(), user.password.as_str(), created_at],
        )?;

        Ok(user
            .clone()
            .into_user(self.conn.last_insert_rowid(), created_at))
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }

    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE username = ?1;"))?;
        let mut rows = stmt.query([username])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }

    fn update_password(&self, user: &User) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users SET password = ?1 WHERE id = ?2;",
            params![user.password.as_str(), user.id],
        )?;
        ensure_changed(changed, "user", user.id)
    }

    fn delete_user(&self, id: UserId) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM users WHERE id = ?1;", [id])?;
        ensure_changed(changed, "user", id)
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        password: PasswordDigest::from_stored(row.get::<_, String>("password")?),
        created_at: row.get("created_at")?,
    })
}
