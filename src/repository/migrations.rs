//! Database migrations using cetane.
//!
//! Runs migrations in a blocking task over rusqlite. Databases written by the
//! older, untracked scraper (a `documents` table but no migration state) are
//! adopted in place first: their columns are renamed or added to the current
//! layout and the migrations that layout corresponds to are marked applied.
//! Adoption never drops a table, a column or a row.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use cetane::migrator::MigrationStateStore;
use rusqlite::{params, Connection};
use thiserror::Error;
use tracing::{debug, info};

use super::pool::BUSY_TIMEOUT_MS;
use crate::migrations::LEGACY_ADOPTED;

/// Errors opening or upgrading the tracking store.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("cannot open tracking store {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migrate(String),

    #[error("migration task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Version-0 claims-track column names and their current names.
const LEGACY_RENAMES: &[(&str, &str)] = &[
    ("status", "claims_status"),
    ("error_message", "claims_error"),
    ("processed_at", "claims_processed_at"),
];

/// Columns of the current `documents` layout that adoption adds when absent.
const CURRENT_COLUMNS: &[(&str, &str)] = &[
    ("doc_id", "TEXT"),
    ("doc_index", "INTEGER"),
    ("discovered_at", "TEXT"),
    ("claims_status", "TEXT DEFAULT 'pending'"),
    ("claims_error", "TEXT"),
    ("claims_processed_at", "TEXT"),
    ("xml_status", "TEXT DEFAULT 'pending'"),
    ("xml_error", "TEXT"),
    ("xml_processed_at", "TEXT"),
];

/// Open the store at `path`, adopt a legacy layout if found, and apply
/// pending migrations.
pub async fn run_migrations(path: &Path) -> Result<(), MigrationError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || migrate_blocking(&path)).await?
}

fn migrate_blocking(path: &Path) -> Result<(), MigrationError> {
    use cetane::backend::Sqlite;
    use cetane::migrator::Migrator;

    let conn = Connection::open(path).map_err(|source| MigrationError::Open {
        path: path.display().to_string(),
        source,
    })?;
    conn.busy_timeout(Duration::from_millis(u64::from(BUSY_TIMEOUT_MS)))?;
    let journal_mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    debug!("Tracking store journal mode: {}", journal_mode);

    let backend = Sqlite;
    let registry = crate::migrations::registry();
    let mut state = SqliteState::new(&conn)?;

    let already_applied = state.applied_migrations().map_err(MigrationError::Migrate)?;
    if already_applied.is_empty() && table_exists(&conn, "documents")? {
        info!("Adopting tracking store written by an older scraper version");
        adopt_legacy_layout(&conn)?;
        for name in LEGACY_ADOPTED {
            info!("Marking existing migration as applied: {}", name);
            state.mark_applied(name).map_err(MigrationError::Migrate)?;
        }
    }

    let mut migrator = Migrator::new(&registry, &backend, state);
    let applied = migrator
        .migrate_forward(|sql| conn.execute_batch(sql).map_err(|e| e.to_string()))
        .map_err(|e| MigrationError::Migrate(e.to_string()))?;

    for name in &applied {
        info!("Applied migration: {}", name);
    }

    if applied.is_empty() {
        debug!("No pending migrations");
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )
}

fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<HashSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(names)
}

fn adopt_legacy_layout(conn: &Connection) -> Result<(), MigrationError> {
    let tx = conn.unchecked_transaction()?;

    let mut columns = table_columns(&tx, "documents")?;
    if columns.contains("status") && !columns.contains("claims_status") {
        for (old, new) in LEGACY_RENAMES {
            if columns.contains(*old) && !columns.contains(*new) {
                info!("Renaming documents.{} to {}", old, new);
                tx.execute_batch(&format!(
                    "ALTER TABLE documents RENAME COLUMN {} TO {}",
                    old, new
                ))?;
            }
        }
        columns = table_columns(&tx, "documents")?;
    }

    for (column, decl) in CURRENT_COLUMNS {
        if !columns.contains(*column) {
            info!("Adding documents.{}", column);
            tx.execute_batch(&format!(
                "ALTER TABLE documents ADD COLUMN {} {}",
                column, decl
            ))?;
        }
    }

    tx.execute_batch(
        "UPDATE documents SET claims_status = 'pending' WHERE claims_status IS NULL;
         UPDATE documents SET xml_status = 'pending' WHERE xml_status IS NULL;
         CREATE TABLE IF NOT EXISTS dates (
             date TEXT PRIMARY KEY,
             discovered_at TEXT,
             status TEXT DEFAULT 'pending'
         );",
    )?;

    let backfilled = backfill_doc_index(&tx)?;
    if backfilled > 0 {
        info!("Assigned doc_index to {} legacy documents", backfilled);
    }

    tx.commit()?;
    Ok(())
}

/// Give rows without a `doc_index` one per date, in insertion order,
/// continuing after the date's current maximum.
fn backfill_doc_index(conn: &Connection) -> rusqlite::Result<usize> {
    let rows: Vec<(i64, String)> = {
        let mut stmt = conn.prepare(
            "SELECT rowid, date FROM documents
             WHERE doc_index IS NULL AND date IS NOT NULL
             ORDER BY date, rowid",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };

    let mut next: HashMap<&str, i64> = HashMap::new();
    for (rowid, date) in &rows {
        let index = match next.get_mut(date.as_str()) {
            Some(last) => {
                *last += 1;
                *last
            }
            None => {
                let max: i64 = conn.query_row(
                    "SELECT COALESCE(MAX(doc_index), 0) FROM documents WHERE date = ?1",
                    [date],
                    |row| row.get(0),
                )?;
                next.insert(date.as_str(), max + 1);
                max + 1
            }
        };
        conn.execute(
            "UPDATE documents SET doc_index = ?1 WHERE rowid = ?2",
            params![index, rowid],
        )?;
    }

    Ok(rows.len())
}

// -- SQLite state store --

struct SqliteState<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteState<'a> {
    fn new(conn: &'a Connection) -> Result<Self, MigrationError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS __cetane_migrations (
                name TEXT PRIMARY KEY NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )?;

        Ok(Self { conn })
    }
}

impl MigrationStateStore for SqliteState<'_> {
    fn applied_migrations(&mut self) -> Result<Vec<String>, String> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM __cetane_migrations ORDER BY name")
            .map_err(|e| e.to_string())?;

        let names = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| e.to_string())?
            .collect::<Result<Vec<String>, _>>()
            .map_err(|e| e.to_string())?;

        Ok(names)
    }

    fn mark_applied(&mut self, name: &str) -> Result<(), String> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO __cetane_migrations (name) VALUES (?1)",
                [name],
            )
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    fn mark_unapplied(&mut self, name: &str) -> Result<(), String> {
        self.conn
            .execute("DELETE FROM __cetane_migrations WHERE name = ?1", [name])
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}
