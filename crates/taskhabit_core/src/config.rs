//! Process configuration loaded from the environment.
//!
//! # Responsibility
//! - Build typed database, secret and logging settings once at startup.
//! - Parse the database connection descriptor before any connection is opened.
//!
//! # Invariants
//! - Secrets have no compiled-in fallback; a missing or short key fails closed.
//! - `SecretKey` never renders its value through `Debug`.
//! - Every in-memory URL resolves to its own shared-cache database.

use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

pub const DATABASE_URL_VAR: &str = "TASKHABIT_DATABASE_URL";
pub const SECRET_KEY_VAR: &str = "TASKHABIT_SECRET_KEY";
pub const POOL_SIZE_VAR: &str = "TASKHABIT_DB_POOL_SIZE";
pub const ACQUIRE_TIMEOUT_VAR: &str = "TASKHABIT_DB_ACQUIRE_TIMEOUT_SECS";
pub const LOG_LEVEL_VAR: &str = "TASKHABIT_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "TASKHABIT_LOG_DIR";

const MEMORY_URL: &str = "sqlite::memory:";
const FILE_URL_PREFIX: &str = "sqlite://";
const MIN_SECRET_KEY_BYTES: usize = 32;
const DEFAULT_POOL_SIZE: u32 = 4;
const MAX_POOL_SIZE: u32 = 64;
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Startup configuration failure. Always fatal for the process.
#[derive(Debug)]
pub enum ConfigError {
    /// Required variable is unset or empty.
    Missing(&'static str),
    MalformedDatabaseUrl {
        url: String,
        reason: &'static str,
    },
    WeakSecretKey {
        min_bytes: usize,
        actual_bytes: usize,
    },
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
    /// `.env` exists but could not be read or parsed.
    DotEnv(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(var) => write!(f, "required environment variable `{var}` is not set"),
            Self::MalformedDatabaseUrl { url, reason } => {
                write!(f, "malformed database url `{url}`: {reason}")
            }
            Self::WeakSecretKey {
                min_bytes,
                actual_bytes,
            } => write!(
                f,
                "secret key must be at least {min_bytes} bytes, got {actual_bytes}"
            ),
            Self::InvalidValue { var, value, reason } => {
                write!(f, "invalid value `{value}` for `{var}`: {reason}")
            }
            Self::DotEnv(message) => write!(f, "failed to load .env file: {message}"),
        }
    }
}

impl Error for ConfigError {}

/// Parsed database connection descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseUrl {
    /// `sqlite:///absolute/path.db`
    File(PathBuf),
    /// `sqlite::memory:`; `name` keys the shared in-memory cache.
    Memory { name: String },
}

impl DatabaseUrl {
    /// Parses `sqlite://<absolute path>` or `sqlite::memory:`.
    ///
    /// # Errors
    /// - Returns `MalformedDatabaseUrl` for any other scheme, an empty path or
    ///   a relative path.
    pub fn parse(raw: &str) -> ConfigResult<Self> {
        let trimmed = raw.trim();
        if trimmed == MEMORY_URL {
            return Ok(Self::in_memory());
        }

        let malformed = |reason| ConfigError::MalformedDatabaseUrl {
            url: trimmed.to_string(),
            reason,
        };
        let path = trimmed
            .strip_prefix(FILE_URL_PREFIX)
            .ok_or_else(|| malformed("expected `sqlite://<path>` or `sqlite::memory:`"))?;
        if path.is_empty() {
            return Err(malformed("database path is empty"));
        }
        let path = Path::new(path);
        if !path.is_absolute() {
            return Err(malformed("database path must be absolute"));
        }

        Ok(Self::File(path.to_path_buf()))
    }

    /// Creates a descriptor for a fresh, uniquely named in-memory database.
    pub fn in_memory() -> Self {
        Self::Memory {
            name: format!("taskhabit_{}", Uuid::new_v4().simple()),
        }
    }

    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory { .. })
    }

    /// Target string handed to SQLite with `SQLITE_OPEN_URI` enabled.
    pub(crate) fn open_target(&self) -> String {
        match self {
            Self::File(path) => path.to_string_lossy().into_owned(),
            Self::Memory { name } => format!("file:{name}?mode=memory&cache=shared"),
        }
    }

    pub(crate) fn mode(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Memory { .. } => "memory",
        }
    }
}

impl Display for DatabaseUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{FILE_URL_PREFIX}{}", path.display()),
            Self::Memory { .. } => f.write_str(MEMORY_URL),
        }
    }
}

/// Connection pool settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: DatabaseUrl,
    /// Maximum number of open connections. In-memory databases always use
    /// a single connection.
    pub pool_size: u32,
    /// How long a session checkout waits for a free connection.
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(url: DatabaseUrl) -> Self {
        Self {
            url,
            pool_size: DEFAULT_POOL_SIZE,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(DatabaseUrl::in_memory())
    }

    pub fn with_pool_size(mut self, pool_size: u32) -> Self {
        self.pool_size = pool_size.clamp(1, MAX_POOL_SIZE);
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

/// Application secret used to sign form tokens.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(String);

impl SecretKey {
    /// # Errors
    /// - Returns `WeakSecretKey` when the key is shorter than 32 bytes.
    pub fn new(value: impl Into<String>) -> ConfigResult<Self> {
        let value = value.into();
        if value.len() < MIN_SECRET_KEY_BYTES {
            return Err(ConfigError::WeakSecretKey {
                min_bytes: MIN_SECRET_KEY_BYTES,
                actual_bytes: value.len(),
            });
        }
        Ok(Self(value))
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl Debug for SecretKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

/// Complete process configuration, injected into the engine and form layer.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub secret_key: SecretKey,
    pub log_level: &'static str,
    /// File logging is enabled only when set.
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Loads configuration from the process environment, reading `.env` first
    /// when present.
    pub fn from_env() -> ConfigResult<Self> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                return Err(ConfigError::DotEnv(err.to_string()));
            }
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &'static str| lookup(name).filter(|value| !value.trim().is_empty());

        let url = var(DATABASE_URL_VAR).ok_or(ConfigError::Missing(DATABASE_URL_VAR))?;
        let mut database = DatabaseConfig::new(DatabaseUrl::parse(&url)?);

        if let Some(raw) = var(POOL_SIZE_VAR) {
            let pool_size = parse_number::<u32>(POOL_SIZE_VAR, &raw)?;
            if pool_size == 0 || pool_size > MAX_POOL_SIZE {
                return Err(ConfigError::InvalidValue {
                    var: POOL_SIZE_VAR,
                    value: raw,
                    reason: format!("expected 1..={MAX_POOL_SIZE}"),
                });
            }
            database.pool_size = pool_size;
        }
        if let Some(raw) = var(ACQUIRE_TIMEOUT_VAR) {
            let secs = parse_number::<u64>(ACQUIRE_TIMEOUT_VAR, &raw)?;
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    var: ACQUIRE_TIMEOUT_VAR,
                    value: raw,
                    reason: "must be at least 1 second".to_string(),
                });
            }
            database.acquire_timeout = Duration::from_secs(secs);
        }

        let secret = var(SECRET_KEY_VAR).ok_or(ConfigError::Missing(SECRET_KEY_VAR))?;
        let secret_key = SecretKey::new(secret)?;

        let log_level = match var(LOG_LEVEL_VAR) {
            Some(raw) => normalize_level(&raw).map_err(|reason| ConfigError::InvalidValue {
                var: LOG_LEVEL_VAR,
                value: raw.clone(),
                reason,
            })?,
            None => default_log_level(),
        };

        let log_dir = match var(LOG_DIR_VAR) {
            Some(raw) => {
                let path = PathBuf::from(raw.trim());
                if !path.is_absolute() {
                    return Err(ConfigError::InvalidValue {
                        var: LOG_DIR_VAR,
                        value: raw,
                        reason: "must be an absolute path".to_string(),
                    });
                }
                Some(path)
            }
            None => None,
        };

        Ok(Self {
            database,
            secret_key,
            log_level,
            log_dir,
        })
    }
}

fn parse_number<T>(var: &'static str, raw: &str) -> ConfigResult<T>
where
    T: std::str::FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|err| ConfigError::InvalidValue {
            var,
            value: raw.to_string(),
            reason: err.to_string(),
        })
}
