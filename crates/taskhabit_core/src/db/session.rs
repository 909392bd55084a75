//! Unit-of-work session over one pooled connection.
//!
//! # Responsibility
//! - Keep one explicit transaction open for the session lifetime.
//! - Commit or roll back only on request.
//! - Return the connection to the pool when dropped.
//!
//! # Invariants
//! - A usable session always has an open transaction.
//! - Drop rolls back pending work on every exit path, including unwinding.
//! - A connection checked out with a leftover transaction is rolled back
//!   before the new session begins.
//! - When a new transaction cannot be started after commit or rollback, the
//!   session turns read-only and refuses further commits.

use super::{DbError, DbResult};
use log::{debug, error, warn};
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::ops::Deref;

/// Scoped database session. Derefs to the underlying `Connection` so
/// repositories can borrow it directly.
pub struct Session {
    conn: PooledConnection<SqliteConnectionManager>,
    broken: bool,
}

impl Session {
    pub(crate) fn begin(conn: PooledConnection<SqliteConnectionManager>) -> DbResult<Self> {
        if !conn.is_autocommit() {
            warn!("event=session_begin module=db status=recovered reason=stale_transaction");
            conn.execute_batch("ROLLBACK;")?;
        }
        conn.execute_batch("BEGIN DEFERRED;")?;
        Ok(Self {
            conn,
            broken: false,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Makes pending writes durable and starts the next transaction.
    ///
    /// Returns `Ok` once `COMMIT` succeeds, even when the next transaction
    /// cannot be started; see `is_usable`.
    pub fn commit(&mut self) -> DbResult<()> {
        self.ensure_usable()?;
        self.conn.execute_batch("COMMIT;")?;
        debug!("event=session_commit module=db status=ok");
        self.restart();
        Ok(())
    }

    /// Discards pending writes and starts the next transaction.
    pub fn rollback(&mut self) -> DbResult<()> {
        self.ensure_usable()?;
        self.conn.execute_batch("ROLLBACK;")?;
        debug!("event=session_rollback module=db status=ok");
        self.restart();
        Ok(())
    }

    /// Returns whether a transaction is currently open.
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Returns `false` once the session could not start a new transaction.
    /// Writes then fail until the session is dropped.
    pub fn is_usable(&self) -> bool {
        !self.broken
    }

    fn ensure_usable(&self) -> DbResult<()> {
        if self.broken {
            return Err(DbError::SessionBroken);
        }
        Ok(())
    }

    fn restart(&mut self) {
        let Err(err) = self.conn.execute_batch("BEGIN DEFERRED;") else {
            return;
        };
        error!("event=session_restart module=db status=error error={err}");
        self.broken = true;
        // Block autocommit writes; reads stay harmless.
        if let Err(err) = self.conn.execute_batch("PRAGMA query_only = ON;") {
            error!("event=session_restart module=db status=error error_code=query_only_failed error={err}");
        }
    }
}

impl Deref for Session {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.connection()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.conn.is_autocommit() {
            if let Err(err) = self.conn.execute_batch("ROLLBACK;") {
                warn!(
                    "event=session_release module=db status=error error_code=rollback_failed error={err}"
                );
            }
        }
        if self.broken {
            if let Err(err) = self.conn.execute_batch("PRAGMA query_only = OFF;") {
                warn!(
                    "event=session_release module=db status=error error_code=query_only_reset_failed error={err}"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{DatabaseConfig, DatabaseUrl};
    use crate::db::{DbError, DbResult, Engine};

    fn users_table(engine: &Engine) {
        engine
            .with_session(|session| -> DbResult<()> {
                session.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);")?;
                session.commit()
            })
            .unwrap();
    }

    #[test]
    fn session_starts_inside_transaction() {
        let engine = Engine::connect(&DatabaseConfig::in_memory()).unwrap();
        let mut session = engine.session().unwrap();
        assert!(session.in_transaction());

        session.commit().unwrap();
        assert!(session.in_transaction());

        session.rollback().unwrap();
        assert!(session.in_transaction());
        assert!(session.is_usable());
    }

    #[test]
    fn dropped_session_returns_connection_to_pool() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig::new(DatabaseUrl::File(dir.path().join("app.db")))
            .with_pool_size(2);
        let engine = Engine::connect(&config).unwrap();
        {
            let _first = engine.session().unwrap();
            let _second = engine.session().unwrap();
            let status = engine.status();
            assert_eq!(status.open, 2);
            assert_eq!(status.idle, 0);
        }
        let status = engine.status();
        assert_eq!(status.open, 2);
        assert_eq!(status.idle, 2);
    }

    #[test]
    fn failed_restart_blocks_writes_and_commits() {
        let engine = Engine::connect(&DatabaseConfig::in_memory()).unwrap();
        users_table(&engine);

        let mut session = engine.session().unwrap();
        // A transaction is already open, so starting another one fails.
        session.restart();
        assert!(!session.is_usable());

        let write = session.execute("INSERT INTO users (name) VALUES ('alice');", []);
        assert!(write.is_err());
        assert!(matches!(session.commit(), Err(DbError::SessionBroken)));
        assert!(matches!(session.rollback(), Err(DbError::SessionBroken)));
        drop(session);

        let mut session = engine.session().unwrap();
        assert!(session.is_usable());
        session
            .execute("INSERT INTO users (name) VALUES ('bob');", [])
            .unwrap();
        session.commit().unwrap();
    }
}
