#![forbid(unsafe_code)]

mod config;
mod error;
mod repository;
mod tx;

pub use config::TreeConfig;
pub use error::StoreError;
pub use repository::{NewNode, ParentRef, TreeRepository};
pub use tx::SqliteTreeTx;

use config::SqlNames;
use nested_core::{NestedError, Node, TreeStore, UnitOfWork};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A tree row together with its display name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeRow {
    pub node: Node,
    pub name: String,
}

/// SQLite-backed tree table. Every structural operation runs in a `BEGIN IMMEDIATE`
/// transaction, so writers on the same database file are serialized by SQLite's writer lock.
#[derive(Debug)]
pub struct SqliteTreeStore {
    conn: Connection,
    config: TreeConfig,
    names: SqlNames,
    path: Option<PathBuf>,
}

impl SqliteTreeStore {
    pub fn open(path: impl AsRef<Path>, config: TreeConfig) -> Result<Self, StoreError> {
        config.validate()?;
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }

        let conn = Connection::open(&path)?;
        Self::init(conn, config, Some(path))
    }

    pub fn open_in_memory(config: TreeConfig) -> Result<Self, StoreError> {
        config.validate()?;
        let conn = Connection::open_in_memory()?;
        Self::init(conn, config, None)
    }

    fn init(
        conn: Connection,
        config: TreeConfig,
        path: Option<PathBuf>,
    ) -> Result<Self, StoreError> {
        conn.busy_timeout(config.busy_timeout())?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let names = SqlNames::new(&config);
        preflight_gate(&conn, &config)?;
        install_schema(&conn, &names, &config)?;

        debug!(table = %config.table, path = ?path, "opened tree store");
        Ok(Self {
            conn,
            config,
            names,
            path,
        })
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Raw connection for hosts that manage their own columns of the tree table.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Starts a write transaction holding the database writer lock.
    pub fn begin(&mut self) -> Result<SqliteTreeTx<'_>, StoreError> {
        self.begin_with(TransactionBehavior::Immediate)
    }

    /// Starts a read transaction; it only takes a shared lock.
    pub fn begin_read(&mut self) -> Result<SqliteTreeTx<'_>, StoreError> {
        self.begin_with(TransactionBehavior::Deferred)
    }

    fn begin_with(
        &mut self,
        behavior: TransactionBehavior,
    ) -> Result<SqliteTreeTx<'_>, StoreError> {
        let Self { conn, names, .. } = self;
        let tx = conn.transaction_with_behavior(behavior).map_err(map_sql)?;
        Ok(SqliteTreeTx::new(tx, names))
    }
}

impl UnitOfWork for SqliteTreeStore {
    fn atomically<T, F>(&mut self, work: F) -> Result<T, NestedError>
    where
        F: FnOnce(&mut dyn TreeStore) -> Result<T, NestedError>,
    {
        let mut tx = self.begin()?;
        let value = work(&mut tx)?;
        tx.commit()?;
        Ok(value)
    }
}

fn preflight_gate(conn: &Connection, config: &TreeConfig) -> Result<(), StoreError> {
    let exists = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1",
            params![config.table],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some();
    if !exists {
        return Ok(());
    }

    let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{}\")", config.table))?;
    let mut rows = stmt.query([])?;
    let mut columns = BTreeSet::new();
    while let Some(row) = rows.next()? {
        columns.insert(row.get::<_, String>(1)?);
    }

    for column in config.columns() {
        if !columns.contains(column) {
            warn!(table = %config.table, column, "tree table lacks a configured column");
            return Err(StoreError::InvalidInput(
                "existing table lacks a configured tree column",
            ));
        }
    }

    Ok(())
}

fn install_schema(
    conn: &Connection,
    names: &SqlNames,
    config: &TreeConfig,
) -> Result<(), StoreError> {
    let index = |column: &str| format!("\"idx_{}_{}\"", config.table, column);

    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
          {id} INTEGER PRIMARY KEY AUTOINCREMENT,
          {name} TEXT NOT NULL DEFAULT '',
          {parent} INTEGER,
          {lft} INTEGER NOT NULL DEFAULT 0,
          {rgt} INTEGER NOT NULL DEFAULT 0,
          {level} INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS {lft_index} ON {table}({lft});
        CREATE INDEX IF NOT EXISTS {rgt_index} ON {table}({rgt});
        CREATE INDEX IF NOT EXISTS {parent_index} ON {table}({parent});
        "#,
        table = names.table,
        id = names.id,
        name = names.name,
        parent = names.parent,
        lft = names.lft,
        rgt = names.rgt,
        level = names.level,
        lft_index = index(&config.left_column),
        rgt_index = index(&config.right_column),
        parent_index = index(&config.parent_column),
    ))?;

    Ok(())
}

/// Busy and locked reports become retryable conflicts; everything else stays a SQLite error.
fn map_sql(err: rusqlite::Error) -> StoreError {
    if tx::is_busy(&err) {
        warn!(error = %err, "tree transaction conflicted");
        return StoreError::Tree(NestedError::ConcurrentModification {
            detail: err.to_string(),
        });
    }
    StoreError::Sql(err)
}
