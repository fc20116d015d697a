#![forbid(unsafe_code)]

use super::config::SqlNames;
use super::{StoreError, TreeRow, map_sql};
use nested_core::{
    Bounds, Node, NodeId, NodeIdError, ParentFilter, ScanFilter, StoreFault, TreeStore,
};
use rusqlite::types::Type;
use rusqlite::{ErrorCode, OptionalExtension, Row, Transaction, params, params_from_iter};
use tracing::{trace, warn};

/// One open SQLite transaction over the tree table. Dropping it without
/// [`SqliteTreeTx::commit`] rolls back every change.
pub struct SqliteTreeTx<'conn> {
    tx: Transaction<'conn>,
    names: &'conn SqlNames,
}

impl<'conn> SqliteTreeTx<'conn> {
    pub(super) fn new(tx: Transaction<'conn>, names: &'conn SqlNames) -> Self {
        Self { tx, names }
    }

    pub fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().map_err(map_sql)
    }

    /// Persists a new unplaced row and returns its generated id.
    pub fn insert_row(&self, name: &str, parent: Option<NodeId>) -> Result<NodeId, StoreError> {
        let n = self.names;
        self.tx
            .execute(
                &format!(
                    "INSERT INTO {}({}, {}, {}, {}, {}) VALUES (?1, ?2, 0, 0, 0)",
                    n.table, n.name, n.parent, n.lft, n.rgt, n.level
                ),
                params![name, parent.map(NodeId::get)],
            )
            .map_err(map_sql)?;
        NodeId::try_new(self.tx.last_insert_rowid())
            .map_err(|_| StoreError::InvalidInput("generated row id is not positive"))
    }

    /// Rewrites the caller-owned columns of a row.
    pub fn update_row(
        &self,
        id: NodeId,
        name: &str,
        parent: Option<NodeId>,
    ) -> Result<(), StoreError> {
        let n = self.names;
        let changed = self
            .tx
            .execute(
                &format!(
                    "UPDATE {} SET {}=?2, {}=?3 WHERE {}=?1",
                    n.table, n.name, n.parent, n.id
                ),
                params![id.get(), name, parent.map(NodeId::get)],
            )
            .map_err(map_sql)?;
        if changed == 0 {
            return Err(StoreError::UnknownId);
        }
        Ok(())
    }

    pub fn set_parent(&self, id: NodeId, parent: Option<NodeId>) -> Result<(), StoreError> {
        let n = self.names;
        let changed = self
            .tx
            .execute(
                &format!("UPDATE {} SET {}=?2 WHERE {}=?1", n.table, n.parent, n.id),
                params![id.get(), parent.map(NodeId::get)],
            )
            .map_err(map_sql)?;
        if changed == 0 {
            return Err(StoreError::UnknownId);
        }
        Ok(())
    }

    /// Deletes exactly one row, leaving the numbering of the others alone.
    pub fn delete_row(&self, id: NodeId) -> Result<bool, StoreError> {
        let n = self.names;
        let deleted = self
            .tx
            .execute(
                &format!("DELETE FROM {} WHERE {}=?1", n.table, n.id),
                params![id.get()],
            )
            .map_err(map_sql)?;
        Ok(deleted > 0)
    }

    /// A row by id, placed or not.
    pub fn row(&self, id: NodeId) -> Result<Option<TreeRow>, StoreError> {
        self.select_row(id).map_err(map_sql)
    }

    pub fn find_by_name(&self, name: &str) -> Result<Option<TreeRow>, StoreError> {
        let n = self.names;
        self.tx
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE {}=?1 ORDER BY {} ASC LIMIT 1",
                    n.select_list(),
                    n.table,
                    n.name,
                    n.id
                ),
                params![name],
                decode_row,
            )
            .optional()
            .map_err(map_sql)
    }

    /// Placed rows matching `filter`, ascending `lft`.
    pub fn rows(&self, filter: &ScanFilter) -> Result<Vec<TreeRow>, StoreError> {
        self.select_rows(filter).map_err(map_sql)
    }

    fn select_row(&self, id: NodeId) -> rusqlite::Result<Option<TreeRow>> {
        let n = self.names;
        self.tx
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE {}=?1",
                    n.select_list(),
                    n.table,
                    n.id
                ),
                params![id.get()],
                decode_row,
            )
            .optional()
    }

    fn select_rows(&self, filter: &ScanFilter) -> rusqlite::Result<Vec<TreeRow>> {
        let n = self.names;
        let mut clauses = vec![format!("{} > 0", n.lft)];
        let mut args: Vec<i64> = Vec::new();

        let ranges = [
            (filter.lft_min, &n.lft, ">="),
            (filter.lft_max, &n.lft, "<="),
            (filter.rgt_min, &n.rgt, ">="),
            (filter.rgt_max, &n.rgt, "<="),
        ];
        for (limit, column, op) in ranges {
            if let Some(value) = limit {
                args.push(value);
                clauses.push(format!("{column} {op} ?{}", args.len()));
            }
        }

        match filter.parent {
            ParentFilter::Any => {}
            ParentFilter::Root => {
                clauses.push(format!("({0} IS NULL OR {0} = 0)", n.parent));
            }
            ParentFilter::Child(parent) => {
                args.push(parent.get());
                clauses.push(format!("{} = ?{}", n.parent, args.len()));
            }
        }

        let sql = format!(
            "SELECT {} FROM {} WHERE {} ORDER BY {} ASC",
            n.select_list(),
            n.table,
            clauses.join(" AND "),
            n.lft
        );
        let mut stmt = self.tx.prepare_cached(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), decode_row)?;
        rows.collect()
    }
}

impl TreeStore for SqliteTreeTx<'_> {
    fn get(&mut self, id: NodeId) -> Result<Option<Node>, StoreFault> {
        Ok(self.select_row(id).map_err(fault)?.map(|row| row.node))
    }

    fn scan(&mut self, filter: &ScanFilter) -> Result<Vec<Node>, StoreFault> {
        Ok(self
            .select_rows(filter)
            .map_err(fault)?
            .into_iter()
            .map(|row| row.node)
            .collect())
    }

    fn max_right(&mut self) -> Result<i64, StoreFault> {
        let n = self.names;
        self.tx
            .query_row(
                &format!("SELECT COALESCE(MAX({}), 0) FROM {}", n.rgt, n.table),
                [],
                |row| row.get::<_, i64>(0),
            )
            .map_err(fault)
    }

    fn shift_left(&mut self, threshold: i64, delta: i64) -> Result<usize, StoreFault> {
        let n = self.names;
        let shifted = self
            .tx
            .prepare_cached(&format!(
                "UPDATE {0} SET {1} = {1} + ?2 WHERE {1} > ?1 AND {1} > 0",
                n.table, n.lft
            ))
            .and_then(|mut stmt| stmt.execute(params![threshold, delta]))
            .map_err(fault)?;
        trace!(threshold, delta, shifted, "shifted lft");
        Ok(shifted)
    }

    fn shift_right(&mut self, threshold: i64, delta: i64) -> Result<usize, StoreFault> {
        let n = self.names;
        let shifted = self
            .tx
            .prepare_cached(&format!(
                "UPDATE {0} SET {1} = {1} + ?2 WHERE {1} >= ?1 AND {1} > 0",
                n.table, n.rgt
            ))
            .and_then(|mut stmt| stmt.execute(params![threshold, delta]))
            .map_err(fault)?;
        trace!(threshold, delta, shifted, "shifted rgt");
        Ok(shifted)
    }

    fn delete_range(&mut self, lo: i64, hi: i64) -> Result<usize, StoreFault> {
        let n = self.names;
        self.tx
            .execute(
                &format!(
                    "DELETE FROM {0} WHERE {1} >= ?1 AND {2} <= ?2 AND {1} > 0",
                    n.table, n.lft, n.rgt
                ),
                params![lo, hi],
            )
            .map_err(fault)
    }

    fn write(&mut self, node: &Node) -> Result<(), StoreFault> {
        let n = self.names;
        let changed = self
            .tx
            .prepare_cached(&format!(
                "UPDATE {} SET {}=?2, {}=?3, {}=?4 WHERE {}=?1",
                n.table, n.lft, n.rgt, n.level, n.id
            ))
            .and_then(|mut stmt| {
                stmt.execute(params![
                    node.id.get(),
                    node.bounds.lft,
                    node.bounds.rgt,
                    node.level
                ])
            })
            .map_err(fault)?;
        if changed == 0 {
            return Err(StoreFault::backend(StoreError::UnknownId));
        }
        Ok(())
    }
}

fn decode_row(row: &Row<'_>) -> rusqlite::Result<TreeRow> {
    let id = NodeId::try_new(row.get::<_, i64>(0)?).map_err(|err| conversion(0, err))?;
    let parent_id = NodeId::parent_from_raw(row.get::<_, Option<i64>>(1)?)
        .map_err(|err| conversion(1, err))?;
    Ok(TreeRow {
        node: Node {
            id,
            parent_id,
            bounds: Bounds::new(row.get(2)?, row.get(3)?),
            level: row.get(4)?,
        },
        name: row.get(5)?,
    })
}

fn conversion(index: usize, err: NodeIdError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, Type::Integer, Box::new(err))
}

pub(super) fn is_busy(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, _) => matches!(
            code.code,
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
        ),
        _ => false,
    }
}

fn fault(err: rusqlite::Error) -> StoreFault {
    if is_busy(&err) {
        warn!(error = %err, "tree store reported a conflict");
        return StoreFault::Conflict(err.to_string());
    }
    StoreFault::backend(err)
}
