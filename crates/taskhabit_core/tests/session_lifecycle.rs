use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread;
use std::time::Duration;
use taskhabit_core::{
    DatabaseConfig, DatabaseUrl, DbError, Engine, NewUser, RepoError, SqliteUserRepository,
    UserRepository,
};
use tempfile::TempDir;

fn file_engine(pool_size: u32) -> (TempDir, Engine) {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig::new(DatabaseUrl::File(dir.path().join("taskhabit.db")))
        .with_pool_size(pool_size);
    let engine = Engine::connect(&config).unwrap();
    engine.create_all().unwrap();
    (dir, engine)
}

fn count_users(engine: &Engine) -> i64 {
    engine
        .with_session(|session| {
            session
                .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
                .map_err(DbError::from)
        })
        .unwrap()
}

#[test]
fn uncommitted_writes_are_invisible_and_discarded_on_drop() {
    let (_dir, engine) = file_engine(4);

    let writer = engine.session().unwrap();
    SqliteUserRepository::new(&writer)
        .create_user(&NewUser::new("alice", "secret123").unwrap())
        .unwrap();

    let reader = engine.session().unwrap();
    let seen: i64 = reader
        .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
        .unwrap();
    assert_eq!(seen, 0);
    drop(reader);

    drop(writer);
    assert_eq!(count_users(&engine), 0);
}

#[test]
fn committed_writes_are_visible_to_later_sessions() {
    let (_dir, engine) = file_engine(4);

    let mut session = engine.session().unwrap();
    SqliteUserRepository::new(&session)
        .create_user(&NewUser::new("alice", "secret123").unwrap())
        .unwrap();
    session.commit().unwrap();
    assert!(session.in_transaction());
    drop(session);

    assert_eq!(count_users(&engine), 1);
}

#[test]
fn explicit_rollback_keeps_session_usable() {
    let engine = Engine::connect(&DatabaseConfig::in_memory()).unwrap();
    engine.create_all().unwrap();

    let mut session = engine.session().unwrap();
    let repo = SqliteUserRepository::new(&session);
    repo.create_user(&NewUser::new("alice", "secret123").unwrap())
        .unwrap();
    session.rollback().unwrap();

    let repo = SqliteUserRepository::new(&session);
    assert!(repo.find_by_username("alice").unwrap().is_none());
    repo.create_user(&NewUser::new("bob", "hunter22").unwrap())
        .unwrap();
    session.commit().unwrap();
    drop(session);

    assert_eq!(count_users(&engine), 1);
}

#[test]
fn with_session_returns_operation_error_and_releases_connection() {
    let engine = Engine::connect(&DatabaseConfig::in_memory()).unwrap();
    engine.create_all().unwrap();

    let result: Result<(), RepoError> = engine.with_session(|session| {
        let repo = SqliteUserRepository::new(session);
        repo.create_user(&NewUser::new("alice", "secret123").unwrap())?;
        repo.create_user(&NewUser::new("alice", "other-pass").unwrap())?;
        session.commit()?;
        Ok(())
    });

    let err = result.unwrap_err();
    assert!(err.is_constraint_violation());

    let status = engine.status();
    assert_eq!(status.open, status.idle);
    assert_eq!(count_users(&engine), 0);
}

#[test]
fn panicking_operation_rolls_back_and_returns_connection() {
    let engine = Engine::connect(&DatabaseConfig::in_memory()).unwrap();
    engine.create_all().unwrap();

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let session = engine.session().unwrap();
        SqliteUserRepository::new(&session)
            .create_user(&NewUser::new("alice", "secret123").unwrap())
            .unwrap();
        panic!("handler failed");
    }));
    assert!(outcome.is_err());

    let status = engine.status();
    assert_eq!(status.open, status.idle);
    assert_eq!(count_users(&engine), 0);
}

#[test]
fn exhausted_pool_times_out() {
    let config = DatabaseConfig::in_memory()
        .with_pool_size(1)
        .with_acquire_timeout(Duration::from_millis(50));
    let engine = Engine::connect(&config).unwrap();

    let held = engine.session().unwrap();
    let err = engine.session().err().unwrap();
    assert!(matches!(err, DbError::PoolTimeout { pool_size: 1, .. }));

    drop(held);
    assert!(engine.session().is_ok());
}

#[test]
fn in_memory_sessions_wait_for_each_other_instead_of_locking_tables() {
    let config = DatabaseConfig::in_memory()
        .with_pool_size(4)
        .with_acquire_timeout(Duration::from_millis(50));
    let engine = Engine::connect(&config).unwrap();
    engine.create_all().unwrap();
    assert_eq!(engine.status().max, 1);

    let writer = engine.session().unwrap();
    SqliteUserRepository::new(&writer)
        .create_user(&NewUser::new("alice", "secret123").unwrap())
        .unwrap();

    let err = engine.session().err().unwrap();
    assert!(matches!(err, DbError::PoolTimeout { pool_size: 1, .. }));
    drop(writer);

    let reader = engine.session().unwrap();
    let found = SqliteUserRepository::new(&reader)
        .find_by_username("bob")
        .unwrap();
    assert!(found.is_none());
}

#[test]
fn in_memory_waiter_sees_committed_rows() {
    let engine = Engine::connect(&DatabaseConfig::in_memory().with_pool_size(4)).unwrap();
    engine.create_all().unwrap();

    let mut writer = engine.session().unwrap();
    SqliteUserRepository::new(&writer)
        .create_user(&NewUser::new("alice", "secret123").unwrap())
        .unwrap();

    let waiter = {
        let engine = engine.clone();
        thread::spawn(move || {
            engine.with_session(|session| {
                SqliteUserRepository::new(session)
                    .find_by_username("alice")
                    .map(|user| user.is_some())
            })
        })
    };

    thread::sleep(Duration::from_millis(50));
    writer.commit().unwrap();
    drop(writer);

    assert!(waiter.join().unwrap().unwrap());
}

#[test]
fn pool_never_exceeds_configured_size() {
    let (_dir, engine) = file_engine(2);

    let first = engine.session().unwrap();
    let second = engine.session().unwrap();
    assert_eq!(engine.status().open, 2);
    assert_eq!(engine.status().idle, 0);
    drop(first);
    drop(second);

    let status = engine.status();
    assert_eq!((status.open, status.idle, status.max), (2, 2, 2));
}

#[test]
fn concurrent_sessions_commit_independently() {
    let (_dir, engine) = file_engine(4);

    let workers: Vec<_> = (0..4)
        .map(|index| {
            let engine = engine.clone();
            thread::spawn(move || {
                let mut session = engine.session().unwrap();
                SqliteUserRepository::new(&session)
                    .create_user(&NewUser::new(format!("user{index}"), "secret123").unwrap())
                    .unwrap();
                session.commit().unwrap();
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(count_users(&engine), 4);
    assert!(engine.status().open <= 4);
}
