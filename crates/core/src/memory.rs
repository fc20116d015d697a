#![forbid(unsafe_code)]

//! In-process [`TreeStore`] used by hosts without a database and by the engine tests.

use crate::error::{NestedError, StoreFault};
use crate::model::{Node, NodeId};
use crate::store::{ScanFilter, TreeStore, UnitOfWork};
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
struct PendingFault {
    remaining: usize,
    conflict: bool,
}

/// Rows keyed by id. [`UnitOfWork::atomically`] snapshots the rows and restores them when the
/// work fails, so a failed operation never leaves partial shifts behind.
#[derive(Clone, Debug, Default)]
pub struct MemoryTreeStore {
    rows: BTreeMap<NodeId, Node>,
    last_id: i64,
    fault: Option<PendingFault>,
}

impl MemoryTreeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an unplaced row the way a host persists a record before the create event fires.
    pub fn insert_row(&mut self, parent: Option<NodeId>) -> NodeId {
        self.last_id += 1;
        let id = NodeId(self.last_id);
        self.rows.insert(id, Node::unplaced(id, parent));
        id
    }

    pub fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) -> bool {
        match self.rows.get_mut(&id) {
            Some(row) => {
                row.parent_id = parent;
                true
            }
            None => false,
        }
    }

    pub fn remove_row(&mut self, id: NodeId) -> Option<Node> {
        self.rows.remove(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.rows.get(&id)
    }

    /// Placed rows, ascending `lft`.
    pub fn nodes(&self) -> Vec<Node> {
        let mut nodes: Vec<Node> = self
            .rows
            .values()
            .filter(|row| row.is_placed())
            .cloned()
            .collect();
        nodes.sort_by_key(|row| row.bounds.lft);
        nodes
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Lets the next `mutations` mutating calls succeed and fails the one after. A conflict
    /// fault surfaces as a retryable error, anything else as a backend failure.
    pub fn fail_after(&mut self, mutations: usize, conflict: bool) {
        self.fault = Some(PendingFault {
            remaining: mutations,
            conflict,
        });
    }

    fn tick(&mut self) -> Result<(), StoreFault> {
        let Some(fault) = self.fault.as_mut() else {
            return Ok(());
        };
        if fault.remaining > 0 {
            fault.remaining -= 1;
            return Ok(());
        }
        let conflict = fault.conflict;
        self.fault = None;
        if conflict {
            Err(StoreFault::Conflict("injected conflict".to_string()))
        } else {
            Err(StoreFault::backend("injected backend failure"))
        }
    }
}

impl TreeStore for MemoryTreeStore {
    fn get(&mut self, id: NodeId) -> Result<Option<Node>, StoreFault> {
        Ok(self.rows.get(&id).cloned())
    }

    fn scan(&mut self, filter: &ScanFilter) -> Result<Vec<Node>, StoreFault> {
        Ok(self
            .nodes()
            .into_iter()
            .filter(|row| filter.matches(row))
            .collect())
    }

    fn shift_left(&mut self, threshold: i64, delta: i64) -> Result<usize, StoreFault> {
        self.tick()?;
        let mut count = 0;
        for row in self.rows.values_mut() {
            if row.bounds.lft > 0 && row.bounds.lft > threshold {
                row.bounds.lft += delta;
                count += 1;
            }
        }
        Ok(count)
    }

    fn shift_right(&mut self, threshold: i64, delta: i64) -> Result<usize, StoreFault> {
        self.tick()?;
        let mut count = 0;
        for row in self.rows.values_mut() {
            if row.bounds.rgt > 0 && row.bounds.rgt >= threshold {
                row.bounds.rgt += delta;
                count += 1;
            }
        }
        Ok(count)
    }

    fn delete_range(&mut self, lo: i64, hi: i64) -> Result<usize, StoreFault> {
        self.tick()?;
        let before = self.rows.len();
        self.rows.retain(|_, row| {
            let inside = lo <= row.bounds.lft && row.bounds.rgt <= hi;
            !(row.bounds.lft > 0 && inside)
        });
        Ok(before - self.rows.len())
    }

    fn write(&mut self, node: &Node) -> Result<(), StoreFault> {
        self.tick()?;
        let row = self
            .rows
            .get_mut(&node.id)
            .ok_or_else(|| StoreFault::backend(format!("no row for node {}", node.id)))?;
        row.bounds = node.bounds;
        row.level = node.level;
        Ok(())
    }
}

impl UnitOfWork for MemoryTreeStore {
    fn atomically<T, F>(&mut self, work: F) -> Result<T, NestedError>
    where
        F: FnOnce(&mut dyn TreeStore) -> Result<T, NestedError>,
    {
        let snapshot = self.rows.clone();
        let result = work(self);
        if result.is_err() {
            self.rows = snapshot;
        }
        result
    }
}
