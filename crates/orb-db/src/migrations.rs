//! Schema migrations for the node database.
//!
//! The SQL files under `migrations/` are compiled into the binary and
//! applied in order at startup. `_orb_migrations` records the name of every
//! applied file; a file is applied in the same transaction that records it.

use std::collections::HashSet;

use rusqlite::Connection;
use thiserror::Error;

struct Migration {
    name: &'static str,
    sql: &'static str,
}

macro_rules! migration {
    ($name:literal) => {
        Migration {
            name: $name,
            sql: include_str!(concat!("migrations/", $name, ".sql")),
        }
    };
}

/// Append only; applied names are never re-run.
const MIGRATIONS: &[Migration] = &[
    migration!("000_init"),
    migration!("001_unpublished_operations"),
    migration!("002_vc_status"),
    migration!("003_did_anchors"),
    migration!("004_anchored_transactions"),
];

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("schema migration '{name}' failed: {source}")]
    ExecutionFailed {
        name: String,
        source: rusqlite::Error,
    },

    #[error("cannot read applied schema migrations: {0}")]
    StateQuery(rusqlite::Error),
}

/// Brings the node schema up to date on `conn`.
///
/// Returns how many migrations this call applied; zero on an up-to-date
/// database.
///
/// # Errors
///
/// `MigrationError` naming the first migration that failed. Migrations
/// applied before it stay applied.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    apply(conn, MIGRATIONS)
}

fn applied_names(conn: &Connection) -> Result<HashSet<String>, MigrationError> {
    let mut stmt = conn
        .prepare("SELECT name FROM _orb_migrations")
        .map_err(MigrationError::StateQuery)?;
    let names = stmt
        .query_map([], |row| row.get(0))
        .map_err(MigrationError::StateQuery)?
        .collect::<Result<HashSet<String>, _>>()
        .map_err(MigrationError::StateQuery)?;
    Ok(names)
}

fn apply(conn: &Connection, migrations: &[Migration]) -> Result<usize, MigrationError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _orb_migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .map_err(|source| MigrationError::ExecutionFailed {
        name: "_orb_migrations".to_string(),
        source,
    })?;

    let done = applied_names(conn)?;
    let pending: Vec<&Migration> = migrations
        .iter()
        .filter(|m| !done.contains(m.name))
        .collect();

    for migration in &pending {
        let failed = |source| MigrationError::ExecutionFailed {
            name: migration.name.to_string(),
            source,
        };

        let tx = conn.unchecked_transaction().map_err(failed)?;
        tx.execute_batch(migration.sql).map_err(failed)?;
        tx.execute(
            "INSERT INTO _orb_migrations (name) VALUES (?1)",
            [migration.name],
        )
        .map_err(failed)?;
        tx.commit().map_err(failed)?;

        tracing::info!(migration = migration.name, "applied schema migration");
    }

    tracing::debug!(
        applied = pending.len(),
        already_applied = done.len(),
        "node schema up to date"
    );

    Ok(pending.len())
}
