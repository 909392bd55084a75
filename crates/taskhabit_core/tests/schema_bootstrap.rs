use rusqlite::Connection;
use taskhabit_core::db::schema::{column_names, current_version, table_names, SCHEMA_VERSION};
use taskhabit_core::{DatabaseConfig, DatabaseUrl, DbError, Engine};

#[test]
fn create_all_on_empty_database_creates_exactly_five_tables() {
    let engine = Engine::connect(&DatabaseConfig::in_memory()).unwrap();

    let before = engine
        .with_session(|session| table_names(session))
        .unwrap();
    assert!(before.is_empty());

    let tables = engine.create_all().unwrap();
    assert_eq!(
        tables,
        vec!["habit_logs", "habits", "projects", "tasks", "users"]
    );
}

#[test]
fn created_tables_have_declared_columns() {
    let engine = Engine::connect(&DatabaseConfig::in_memory()).unwrap();
    engine.create_all().unwrap();
    let session = engine.session().unwrap();

    assert_eq!(
        column_names(&session, "users").unwrap(),
        vec!["id", "username", "password", "created_at"]
    );
    assert_eq!(
        column_names(&session, "projects").unwrap(),
        vec!["id", "user_id", "title", "description", "is_done", "created_at"]
    );
    assert_eq!(
        column_names(&session, "tasks").unwrap(),
        vec![
            "id",
            "project_id",
            "user_id",
            "title",
            "description",
            "priority",
            "due_date",
            "is_done",
            "created_at"
        ]
    );
    assert_eq!(
        column_names(&session, "habits").unwrap(),
        vec!["id", "user_id", "name", "frequency", "created_at"]
    );
    assert_eq!(
        column_names(&session, "habit_logs").unwrap(),
        vec!["id", "habit_id", "log_date", "is_done"]
    );
}

#[test]
fn create_all_is_idempotent_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig::new(DatabaseUrl::File(dir.path().join("taskhabit.db")));

    let first = Engine::connect(&config).unwrap();
    first.create_all().unwrap();
    drop(first);

    let second = Engine::connect(&config).unwrap();
    let tables = second.create_all().unwrap();
    assert_eq!(tables.len(), 5);

    let session = second.session().unwrap();
    assert_eq!(current_version(&session).unwrap(), SCHEMA_VERSION);
}

#[test]
fn connecting_to_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = Engine::connect(&DatabaseConfig::new(DatabaseUrl::File(path)))
        .err()
        .unwrap();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, SCHEMA_VERSION);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn database_url_round_trips_through_config() {
    let dir = tempfile::tempdir().unwrap();
    let raw = format!("sqlite://{}", dir.path().join("app.db").display());
    let url = DatabaseUrl::parse(&raw).unwrap();
    assert_eq!(url.to_string(), raw);

    let engine = Engine::connect(&DatabaseConfig::new(url)).unwrap();
    engine.create_all().unwrap();
    assert!(dir.path().join("app.db").exists());
}
