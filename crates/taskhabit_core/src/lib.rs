//! Persistence core for the task/habit tracker.
//! Owns the schema, the session lifecycle and the credential checks.

pub mod auth;
pub mod config;
pub mod db;
pub mod form;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use auth::csrf::{CsrfError, CsrfGuard};
pub use auth::password::{PasswordDigest, PasswordError};
pub use config::{AppConfig, ConfigError, DatabaseConfig, DatabaseUrl, SecretKey};
pub use db::{DbError, DbResult, Engine, Session};
pub use form::login::{Credentials, FormError, LoginForm};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::{
    Habit, HabitLog, Model, ModelValidationError, NewHabit, NewHabitLog, NewProject, NewTask,
    NewUser, Project, Task, User,
};
pub use repo::habit_repo::{
    HabitLogRepository, HabitRepository, SqliteHabitLogRepository, SqliteHabitRepository,
};
pub use repo::project_repo::{ProjectRepository, SqliteProjectRepository};
pub use repo::task_repo::{SqliteTaskRepository, TaskListQuery, TaskRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::auth_service::{AuthError, AuthService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
