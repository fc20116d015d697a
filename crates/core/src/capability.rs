#![forbid(unsafe_code)]

use crate::model::NodeId;

/// What a host entity must expose to take part in a tree: its own identity once saved, its
/// parent reference, and (for entities built in memory) the parent entity itself.
pub trait TreeEntity {
    /// `None` while the entity has not been persisted.
    fn node_id(&self) -> Option<NodeId>;

    fn parent_id(&self) -> Option<NodeId>;

    fn parent(&self) -> Option<&Self>;
}

/// Parent reference of `entity`, falling back to the id of an attached saved parent.
pub fn resolve_parent<E: TreeEntity + ?Sized>(entity: &E) -> Option<NodeId> {
    entity
        .parent_id()
        .or_else(|| entity.parent().and_then(TreeEntity::node_id))
}

/// `entity` preceded by every unsaved ancestor reachable through [`TreeEntity::parent`],
/// topmost first: the order in which the chain has to be inserted so each child sees its
/// parent's placed bounds.
pub fn pending_lineage<E: TreeEntity>(entity: &E) -> Vec<&E> {
    let mut chain = vec![entity];
    let mut current = entity;
    while current.parent_id().is_none() {
        match current.parent() {
            Some(parent) if parent.node_id().is_none() => {
                chain.push(parent);
                current = parent;
            }
            _ => break,
        }
    }
    chain.reverse();
    chain
}
