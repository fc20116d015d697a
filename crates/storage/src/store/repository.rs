#![forbid(unsafe_code)]

use super::{SqliteTreeStore, StoreError, TreeConfig, TreeRow};
use nested_core::capability::{TreeEntity, pending_lineage, resolve_parent};
use nested_core::interval::validate;
use nested_core::{HookSettings, Node, NodeId, ScanFilter};
use std::path::Path;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParentRef {
    Saved(NodeId),
    Unsaved(Box<NewNode>),
}

/// A row to create, optionally hanging off a chain of rows that do not exist yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewNode {
    pub name: String,
    pub parent: Option<ParentRef>,
}

impl NewNode {
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
        }
    }

    pub fn child_of(name: impl Into<String>, parent: NodeId) -> Self {
        Self {
            name: name.into(),
            parent: Some(ParentRef::Saved(parent)),
        }
    }

    pub fn under(name: impl Into<String>, parent: NewNode) -> Self {
        Self {
            name: name.into(),
            parent: Some(ParentRef::Unsaved(Box::new(parent))),
        }
    }
}

impl TreeEntity for NewNode {
    fn node_id(&self) -> Option<NodeId> {
        None
    }

    fn parent_id(&self) -> Option<NodeId> {
        match &self.parent {
            Some(ParentRef::Saved(id)) => Some(*id),
            _ => None,
        }
    }

    fn parent(&self) -> Option<&Self> {
        match &self.parent {
            Some(ParentRef::Unsaved(parent)) => Some(parent),
            _ => None,
        }
    }
}

/// Host-side persistence for a tree table: owns the row lifecycle and dispatches every
/// structural change to the engine inside the same transaction.
#[derive(Debug)]
pub struct TreeRepository {
    store: SqliteTreeStore,
}

impl TreeRepository {
    pub fn open(path: impl AsRef<Path>, config: TreeConfig) -> Result<Self, StoreError> {
        Ok(Self::from_store(SqliteTreeStore::open(path, config)?))
    }

    pub fn open_in_memory(config: TreeConfig) -> Result<Self, StoreError> {
        Ok(Self::from_store(SqliteTreeStore::open_in_memory(config)?))
    }

    pub fn from_store(store: SqliteTreeStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SqliteTreeStore {
        &self.store
    }

    pub fn into_store(self) -> SqliteTreeStore {
        self.store
    }

    fn hooks(&self) -> HookSettings {
        self.store.config().hooks
    }

    pub fn create(&mut self, name: &str, parent: Option<NodeId>) -> Result<TreeRow, StoreError> {
        let hooks = self.hooks();
        let mut tx = self.store.begin()?;

        let id = tx.insert_row(name, parent)?;
        hooks.create(&mut tx, id, parent)?;

        let row = tx.row(id)?.ok_or(StoreError::UnknownId)?;
        tx.commit()?;
        debug!(node = %id, name, "created tree row");
        Ok(row)
    }

    /// Creates `entity` and every unsaved ancestor it hangs off, topmost first, in one
    /// transaction. Returns the created rows in creation order.
    pub fn create_lineage(&mut self, entity: &NewNode) -> Result<Vec<TreeRow>, StoreError> {
        let hooks = self.hooks();
        let lineage = pending_lineage(entity);
        let mut parent = lineage.first().and_then(|top| resolve_parent(*top));

        let mut tx = self.store.begin()?;
        let mut created = Vec::with_capacity(lineage.len());
        for member in lineage {
            let id = tx.insert_row(&member.name, parent)?;
            hooks.create(&mut tx, id, parent)?;
            created.push(id);
            parent = Some(id);
        }

        let mut rows = Vec::with_capacity(created.len());
        for id in created {
            rows.push(tx.row(id)?.ok_or(StoreError::UnknownId)?);
        }
        tx.commit()?;
        debug!(count = rows.len(), "created tree lineage");
        Ok(rows)
    }

    /// Updates a row's name and parent. Whether a changed parent moves the subtree is decided
    /// by [`HookSettings::reparent_trigger`].
    pub fn save(
        &mut self,
        id: NodeId,
        name: &str,
        parent: Option<NodeId>,
    ) -> Result<TreeRow, StoreError> {
        let hooks = self.hooks();
        let mut tx = self.store.begin()?;

        let current = tx.row(id)?.ok_or(StoreError::UnknownId)?;
        tx.update_row(id, name, parent)?;
        hooks.update(&mut tx, id, current.node.parent_id, parent)?;

        let row = tx.row(id)?.ok_or(StoreError::UnknownId)?;
        tx.commit()?;
        Ok(row)
    }

    /// Moves the subtree of `id` under `parent`, or to the roots.
    pub fn reparent(&mut self, id: NodeId, parent: Option<NodeId>) -> Result<TreeRow, StoreError> {
        let hooks = self.hooks();
        let mut tx = self.store.begin()?;

        let current = tx.row(id)?.ok_or(StoreError::UnknownId)?;
        tx.set_parent(id, parent)?;
        hooks.reparent(&mut tx, id, current.node.parent_id, parent)?;

        let row = tx.row(id)?.ok_or(StoreError::UnknownId)?;
        tx.commit()?;
        Ok(row)
    }

    /// Deletes `id` with its whole subtree and returns the number of rows removed.
    pub fn delete(&mut self, id: NodeId) -> Result<usize, StoreError> {
        let hooks = self.hooks();
        let mut tx = self.store.begin()?;

        let current = tx.row(id)?.ok_or(StoreError::UnknownId)?;
        // A placed row is always inside its own range; zero means it was never numbered.
        let removed = match hooks.delete(&mut tx, &current.node)? {
            Some(removed) if removed > 0 => removed,
            _ => usize::from(tx.delete_row(id)?),
        };

        tx.commit()?;
        debug!(node = %id, removed, "deleted tree row");
        Ok(removed)
    }

    pub fn get(&mut self, id: NodeId) -> Result<Option<TreeRow>, StoreError> {
        self.store.begin_read()?.row(id)
    }

    pub fn find_by_name(&mut self, name: &str) -> Result<Option<TreeRow>, StoreError> {
        self.store.begin_read()?.find_by_name(name)
    }

    /// Every placed row, ascending `lft`.
    pub fn list(&mut self) -> Result<Vec<TreeRow>, StoreError> {
        self.store.begin_read()?.rows(&ScanFilter::all())
    }

    pub fn roots(&mut self) -> Result<Vec<TreeRow>, StoreError> {
        self.store.begin_read()?.rows(&ScanFilter::roots())
    }

    pub fn children(&mut self, id: NodeId) -> Result<Vec<TreeRow>, StoreError> {
        self.store.begin_read()?.rows(&ScanFilter::children_of(id))
    }

    /// Every row nested under `id`, in preorder.
    pub fn descendants(&mut self, id: NodeId) -> Result<Vec<TreeRow>, StoreError> {
        let tx = self.store.begin_read()?;
        let node = placed(tx.row(id)?)?;
        let mut rows = tx.rows(&ScanFilter::within(node.bounds))?;
        rows.retain(|row| row.node.id != id);
        Ok(rows)
    }

    /// Every row enclosing `id`, root first.
    pub fn ancestors(&mut self, id: NodeId) -> Result<Vec<TreeRow>, StoreError> {
        let tx = self.store.begin_read()?;
        let node = placed(tx.row(id)?)?;
        let mut rows = tx.rows(&ScanFilter::enclosing(node.bounds))?;
        rows.retain(|row| row.node.id != id);
        Ok(rows)
    }

    /// Checks the stored numbering against the nested-set invariants.
    pub fn validate(&mut self) -> Result<(), StoreError> {
        let nodes: Vec<Node> = self.list()?.into_iter().map(|row| row.node).collect();
        validate(&nodes).map_err(StoreError::Invariant)
    }
}

fn placed(row: Option<TreeRow>) -> Result<Node, StoreError> {
    match row {
        Some(row) if row.node.is_placed() => Ok(row.node),
        _ => Err(StoreError::UnknownId),
    }
}
