//! Declarative table registry and "create if absent" bootstrap.
//!
//! # Responsibility
//! - Collect the table definitions every `Model` registers.
//! - Materialize them in dependency order.
//!
//! # Invariants
//! - `REGISTRY` lists parents before children.
//! - Every DDL statement is `IF NOT EXISTS`; bootstrap is idempotent.
//! - The applied layout is mirrored to `PRAGMA user_version`.

use crate::db::{DbError, DbResult};
use crate::model::{Habit, HabitLog, Model, Project, Task, User};
use rusqlite::Connection;

/// Layout version written by `create_all`.
pub const SCHEMA_VERSION: u32 = 1;

/// One persistent table: its name and its `CREATE ... IF NOT EXISTS` script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub ddl: &'static str,
}

/// All tables known to this build, parents first.
pub const REGISTRY: &[TableDef] = &[
    <User as Model>::TABLE,
    <Project as Model>::TABLE,
    <Task as Model>::TABLE,
    <Habit as Model>::TABLE,
    <HabitLog as Model>::TABLE,
];

/// Creates every registered table (and its indexes) that does not exist yet.
///
/// Runs on the caller's transaction; the caller commits.
pub fn create_all(conn: &Connection) -> DbResult<()> {
    ensure_supported_version(conn)?;
    for table in REGISTRY {
        conn.execute_batch(table.ddl)?;
    }
    conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
    Ok(())
}

/// Lists user tables in name order.
pub fn table_names(conn: &Connection) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name
         FROM sqlite_master
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
         ORDER BY name ASC;",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

/// Lists the columns of `table` in declaration order.
pub fn column_names(conn: &Connection, table: &str) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid ASC;")?;
    let names = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

pub fn current_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

pub(crate) fn ensure_supported_version(conn: &Connection) -> DbResult<()> {
    let db_version = current_version(conn)?;
    if db_version > SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported: SCHEMA_VERSION,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_names_are_unique_and_ordered_by_dependency() {
        let names: Vec<_> = REGISTRY.iter().map(|table| table.name).collect();
        assert_eq!(
            names,
            vec!["users", "projects", "tasks", "habits", "habit_logs"]
        );
    }

    #[test]
    fn every_ddl_is_idempotent() {
        for table in REGISTRY {
            assert!(
                table.ddl.contains("IF NOT EXISTS"),
                "{} must be created with IF NOT EXISTS",
                table.name
            );
        }
    }

    #[test]
    fn create_all_twice_on_plain_connection() {
        let conn = Connection::open_in_memory().unwrap();
        create_all(&conn).unwrap();
        create_all(&conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), SCHEMA_VERSION);
        assert_eq!(table_names(&conn).unwrap().len(), REGISTRY.len());
    }
}
