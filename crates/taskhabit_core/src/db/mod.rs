//! SQLite connection pool, unit-of-work sessions and schema bootstrap.
//!
//! # Responsibility
//! - Own the process-wide connection pool (`Engine`).
//! - Hand out scoped `Session`s that commit only on request.
//! - Materialize the registered tables on demand.
//!
//! # Invariants
//! - Every pooled connection has `foreign_keys=ON` and a busy timeout.
//! - A session never outlives its connection checkout; dropping it rolls back
//!   uncommitted work and returns the connection to the pool.
//! - Application data must not be touched before `create_all` succeeds.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

mod engine;
pub mod schema;
mod session;

pub use engine::{Engine, PoolStatus};
pub use session::Session;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// No pooled connection became free within the acquire timeout.
    PoolTimeout {
        waited: Duration,
        pool_size: u32,
        source: r2d2::Error,
    },
    /// The pool could not be built.
    Pool(r2d2::Error),
    /// A previous commit or rollback left the session without a transaction.
    SessionBroken,
}

impl DbError {
    /// Returns whether this error is a SQLite constraint failure
    /// (unique, foreign key, not-null or check).
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::PoolTimeout {
                waited,
                pool_size,
                source,
            } => write!(
                f,
                "no database connection available after {}ms (pool size {pool_size}): {source}",
                waited.as_millis()
            ),
            Self::Pool(err) => write!(f, "failed to build connection pool: {err}"),
            Self::SessionBroken => write!(
                f,
                "session has no open transaction; start a new session"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
            Self::PoolTimeout { source, .. } => Some(source),
            Self::Pool(err) => Some(err),
            Self::SessionBroken => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
