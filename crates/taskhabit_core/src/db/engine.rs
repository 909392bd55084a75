//! Process-wide SQLite connection pool.
//!
//! # Responsibility
//! - Configure every pooled connection for one `DatabaseUrl`.
//! - Lend connections to sessions; `r2d2` takes them back on drop.
//!
//! # Invariants
//! - At most `pool_size` connections are open at any time.
//! - The first connection is opened eagerly so a bad descriptor fails at
//!   startup, not on the first request.
//! - In-memory databases use exactly one connection and never recycle it.

use super::schema;
use super::session::Session;
use super::{DbError, DbResult};
use crate::config::{DatabaseConfig, DatabaseUrl};
use log::{error, info, warn};
use r2d2::{ManageConnection, Pool};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const MIN_ACQUIRE_TIMEOUT: Duration = Duration::from_millis(1);

/// Shared handle to the connection pool. Cloning is cheap.
#[derive(Clone)]
pub struct Engine {
    config: DatabaseConfig,
    pool: Pool<SqliteConnectionManager>,
}

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub open: u32,
    pub idle: u32,
    pub max: u32,
}

impl Engine {
    /// Opens the pool for `config`.
    ///
    /// # Errors
    /// - Returns `DbError::Sqlite` when the database cannot be opened.
    /// - Returns `UnsupportedSchemaVersion` when the database was stamped by a
    ///   newer build.
    ///
    /// # Side effects
    /// - Emits `db_open` logging events with duration and status.
    pub fn connect(config: &DatabaseConfig) -> DbResult<Self> {
        let started_at = Instant::now();
        let mode = config.url.mode();
        info!("event=db_open module=db status=start mode={mode}");

        let max_size = effective_pool_size(config);
        if max_size < config.pool_size {
            warn!(
                "event=db_open module=db status=adjusted mode={mode} requested_pool_size={} pool_size={max_size}",
                config.pool_size
            );
        }

        let manager = connection_manager(&config.url);

        // Opened outside the pool so open failures keep their SQLite cause.
        let first = match manager.connect() {
            Ok(conn) => conn,
            Err(err) => {
                error!(
                    "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={err}",
                    started_at.elapsed().as_millis()
                );
                return Err(DbError::Sqlite(err));
            }
        };

        if let Err(err) = schema::ensure_supported_version(&first) {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_version_unsupported error={err}",
                started_at.elapsed().as_millis()
            );
            return Err(err);
        }

        let mut builder = Pool::builder()
            .max_size(max_size)
            .min_idle(Some(1))
            .connection_timeout(config.acquire_timeout.max(MIN_ACQUIRE_TIMEOUT));
        if config.url.is_memory() {
            // The shared in-memory database is dropped with its last connection.
            builder = builder.max_lifetime(None).idle_timeout(None);
        }

        let pool = builder.build(manager).map_err(|err| {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=pool_build_failed error={err}",
                started_at.elapsed().as_millis()
            );
            DbError::Pool(err)
        })?;
        drop(first);

        info!(
            "event=db_open module=db status=ok mode={mode} pool_size={max_size} duration_ms={}",
            started_at.elapsed().as_millis()
        );

        Ok(Self {
            config: config.clone(),
            pool,
        })
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Starts a new unit of work on a pooled connection.
    ///
    /// Blocks up to the configured acquire timeout when every connection is
    /// checked out.
    pub fn session(&self) -> DbResult<Session> {
        let started_at = Instant::now();
        let conn = self.pool.get().map_err(|source| {
            let waited = started_at.elapsed();
            warn!(
                "event=pool_checkout module=db status=error error_code=pool_timeout pool_size={} waited_ms={}",
                self.pool.max_size(),
                waited.as_millis()
            );
            DbError::PoolTimeout {
                waited,
                pool_size: self.pool.max_size(),
                source,
            }
        })?;
        Session::begin(conn)
    }

    /// Runs `operation` inside a fresh session and releases it afterwards.
    ///
    /// Nothing is committed unless `operation` calls `Session::commit`. Errors
    /// from `operation` are returned unchanged.
    pub fn with_session<T, E, F>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce(&mut Session) -> Result<T, E>,
        E: From<DbError>,
    {
        let mut session = self.session()?;
        operation(&mut session)
    }

    /// Creates every registered table that does not exist yet and returns
    /// the resulting table names.
    pub fn create_all(&self) -> DbResult<Vec<String>> {
        let started_at = Instant::now();
        let result = self.with_session(|session| {
            schema::create_all(session.connection())?;
            session.commit()?;
            schema::table_names(session.connection())
        });

        match &result {
            Ok(tables) => info!(
                "event=schema_create module=db status=ok tables={} duration_ms={}",
                tables.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=schema_create module=db status=error duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            ),
        }
        result
    }

    pub fn status(&self) -> PoolStatus {
        let state = self.pool.state();
        PoolStatus {
            open: state.connections,
            idle: state.idle_connections,
            max: self.pool.max_size(),
        }
    }
}

/// Shared-cache in-memory databases lock whole tables and ignore the busy
/// timeout, so they are served by a single connection.
fn effective_pool_size(config: &DatabaseConfig) -> u32 {
    if config.url.is_memory() {
        1
    } else {
        config.pool_size.max(1)
    }
}

fn connection_manager(url: &DatabaseUrl) -> SqliteConnectionManager {
    let is_memory = url.is_memory();
    SqliteConnectionManager::file(url.open_target())
        .with_init(move |conn| configure_connection(conn, is_memory))
}

fn configure_connection(conn: &mut Connection, is_memory: bool) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    if !is_memory {
        // journal_mode reports the resulting mode as a row.
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
    }
    Ok(())
}
