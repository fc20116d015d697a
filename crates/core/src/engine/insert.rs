#![forbid(unsafe_code)]

use super::shift::open_gap;
use crate::error::NestedError;
use crate::model::{Bounds, Node, NodeId};
use crate::store::TreeStore;
use tracing::debug;

/// Places `id` as the rightmost child of `parent`, or as the rightmost root.
///
/// The parent must already be placed; callers inserting a pre-built chain go ancestor first
/// (see [`crate::capability::pending_lineage`]). A node that is already placed is returned
/// unchanged.
pub fn insert_node<S>(
    store: &mut S,
    id: NodeId,
    parent: Option<NodeId>,
) -> Result<Node, NestedError>
where
    S: TreeStore + ?Sized,
{
    if let Some(existing) = store.get(id)?.filter(Node::is_placed) {
        debug!(node = %id, "create hook on a placed node");
        return Ok(existing);
    }

    let node = match parent {
        Some(parent_id) => {
            let parent = store
                .get(parent_id)?
                .filter(|row| row.id != id && row.is_placed())
                .ok_or(NestedError::ParentNotFound { parent: parent_id })?;

            let at = parent.bounds.rgt;
            open_gap(store, at, 2)?;

            Node {
                id,
                parent_id: Some(parent_id),
                bounds: Bounds::new(at, at + 1),
                level: parent.level + 1,
            }
        }
        None => {
            let max = store.max_right()?;
            Node {
                id,
                parent_id: None,
                bounds: Bounds::new(max + 1, max + 2),
                level: 0,
            }
        }
    };

    store.write(&node)?;
    debug!(
        node = %node.id,
        parent = ?node.parent_id,
        lft = node.bounds.lft,
        rgt = node.bounds.rgt,
        level = node.level,
        "inserted node"
    );
    Ok(node)
}
