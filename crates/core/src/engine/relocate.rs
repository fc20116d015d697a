#![forbid(unsafe_code)]

use super::shift::{close_gap, open_gap};
use crate::error::NestedError;
use crate::model::{Node, NodeId};
use crate::store::{ScanFilter, TreeStore};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Moves the subtree rooted at `id` to become the rightmost child of `new_parent`, or the
/// rightmost root when `new_parent` is `None`.
///
/// Relative structure inside the subtree is preserved; every member's level changes by the
/// same delta. Rejects targets inside the subtree before writing anything.
pub fn move_subtree<S>(
    store: &mut S,
    id: NodeId,
    new_parent: Option<NodeId>,
) -> Result<Node, NestedError>
where
    S: TreeStore + ?Sized,
{
    let node = store
        .get(id)?
        .filter(Node::is_placed)
        .ok_or(NestedError::NodeNotFound { node: id })?;
    let origin = node.bounds;
    let width = origin.width();

    let new_level = match new_parent {
        Some(parent_id) => {
            let parent = store
                .get(parent_id)?
                .filter(Node::is_placed)
                .ok_or(NestedError::ParentNotFound { parent: parent_id })?;
            if origin.encloses(parent.bounds) {
                warn!(node = %id, target = %parent_id, "rejected move into own subtree");
                return Err(NestedError::CyclicMoveRejected {
                    node: id,
                    target: parent_id,
                });
            }
            parent.level + 1
        }
        None => 0,
    };
    let level_delta = new_level - node.level;

    // Members are tracked by identity: their stored bounds go stale during the shifts below
    // and are rewritten from this snapshot.
    let members = store.scan(&ScanFilter::within(origin))?;
    let member_ids: BTreeSet<NodeId> = members.iter().map(|member| member.id).collect();

    close_gap(store, origin.rgt, width)?;

    let target = match new_parent {
        Some(parent_id) => {
            let parent = store
                .get(parent_id)?
                .ok_or(NestedError::ParentNotFound { parent: parent_id })?;
            let at = parent.bounds.rgt;
            open_gap(store, at, width)?;
            at
        }
        None => {
            // Parent columns are host-owned and may lag behind, so every placed row counts.
            let outside_max = store
                .scan(&ScanFilter::all())?
                .iter()
                .filter(|row| !member_ids.contains(&row.id))
                .map(|row| row.bounds.rgt)
                .max()
                .unwrap_or(0);
            outside_max + 1
        }
    };

    let offset = target - origin.lft;
    let mut moved = None;
    for member in members {
        let mut placed = Node {
            bounds: member.bounds.translate(offset),
            level: member.level + level_delta,
            ..member
        };
        if placed.id == id {
            placed.parent_id = new_parent;
        }
        store.write(&placed)?;
        if placed.id == id {
            moved = Some(placed);
        }
    }

    let moved = moved.ok_or(NestedError::NodeNotFound { node: id })?;
    debug!(
        node = %id,
        parent = ?new_parent,
        from_lft = origin.lft,
        to_lft = moved.bounds.lft,
        width,
        level_delta,
        "moved subtree"
    );
    Ok(moved)
}
