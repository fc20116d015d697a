#![forbid(unsafe_code)]

//! Entry points a host's persistence layer calls on structural events.

use crate::engine;
use crate::error::NestedError;
use crate::model::{Node, NodeId};
use crate::store::{TreeStore, UnitOfWork};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// When a changed parent reference triggers a subtree move.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReparentTrigger {
    /// Only explicit reparent events move subtrees; ordinary updates never do.
    Explicit,
    /// Updates move the subtree when the parent reference actually changed.
    #[default]
    ParentChange,
}

/// Per-tree switches for the event hooks. An ignored event leaves the numbering untouched;
/// the host is then responsible for the consistency of the tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookSettings {
    pub ignore_create: bool,
    pub ignore_delete: bool,
    pub ignore_reparent: bool,
    pub reparent_trigger: ReparentTrigger,
}

impl HookSettings {
    pub fn create<S>(
        &self,
        store: &mut S,
        node: NodeId,
        resolved_parent: Option<NodeId>,
    ) -> Result<Option<Node>, NestedError>
    where
        S: TreeStore + ?Sized,
    {
        if self.ignore_create {
            debug!(node = %node, "create hook ignored");
            return Ok(None);
        }
        engine::insert_node(store, node, resolved_parent).map(Some)
    }

    pub fn delete<S>(&self, store: &mut S, node: &Node) -> Result<Option<usize>, NestedError>
    where
        S: TreeStore + ?Sized,
    {
        if self.ignore_delete {
            debug!(node = %node.id, "delete hook ignored");
            return Ok(None);
        }
        engine::delete_subtree(store, node).map(Some)
    }

    /// Explicit reparent. Equal old and new parents are a no-op.
    pub fn reparent<S>(
        &self,
        store: &mut S,
        node: NodeId,
        old_parent: Option<NodeId>,
        new_parent: Option<NodeId>,
    ) -> Result<Option<Node>, NestedError>
    where
        S: TreeStore + ?Sized,
    {
        if self.ignore_reparent || old_parent == new_parent {
            return Ok(None);
        }
        engine::move_subtree(store, node, new_parent).map(Some)
    }

    /// Ordinary row update. Moves only under [`ReparentTrigger::ParentChange`].
    pub fn update<S>(
        &self,
        store: &mut S,
        node: NodeId,
        old_parent: Option<NodeId>,
        new_parent: Option<NodeId>,
    ) -> Result<Option<Node>, NestedError>
    where
        S: TreeStore + ?Sized,
    {
        match self.reparent_trigger {
            ReparentTrigger::Explicit => Ok(None),
            ReparentTrigger::ParentChange => self.reparent(store, node, old_parent, new_parent),
        }
    }
}

/// Dispatches structural events to the engine, one unit of work per event.
#[derive(Debug)]
pub struct NestedSet<U> {
    unit: U,
    settings: HookSettings,
}

impl<U: UnitOfWork> NestedSet<U> {
    pub fn new(unit: U) -> Self {
        Self::with_settings(unit, HookSettings::default())
    }

    pub fn with_settings(unit: U, settings: HookSettings) -> Self {
        Self { unit, settings }
    }

    pub fn settings(&self) -> &HookSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut HookSettings {
        &mut self.settings
    }

    pub fn unit(&self) -> &U {
        &self.unit
    }

    pub fn unit_mut(&mut self) -> &mut U {
        &mut self.unit
    }

    pub fn into_inner(self) -> U {
        self.unit
    }

    pub fn on_create(
        &mut self,
        node: NodeId,
        resolved_parent: Option<NodeId>,
    ) -> Result<Option<Node>, NestedError> {
        let settings = self.settings;
        self.unit
            .atomically(|store| settings.create(store, node, resolved_parent))
    }

    pub fn on_delete(&mut self, node: &Node) -> Result<Option<usize>, NestedError> {
        let settings = self.settings;
        self.unit.atomically(|store| settings.delete(store, node))
    }

    pub fn on_reparent(
        &mut self,
        node: NodeId,
        old_parent: Option<NodeId>,
        new_parent: Option<NodeId>,
    ) -> Result<Option<Node>, NestedError> {
        let settings = self.settings;
        self.unit
            .atomically(|store| settings.reparent(store, node, old_parent, new_parent))
    }

    pub fn on_update(
        &mut self,
        node: NodeId,
        old_parent: Option<NodeId>,
        new_parent: Option<NodeId>,
    ) -> Result<Option<Node>, NestedError> {
        let settings = self.settings;
        self.unit
            .atomically(|store| settings.update(store, node, old_parent, new_parent))
    }
}
