#![forbid(unsafe_code)]

use super::shift::close_gap;
use crate::error::NestedError;
use crate::model::Node;
use crate::store::TreeStore;
use tracing::debug;

/// Removes `node` and every row nested inside it, then closes the numbering gap.
///
/// Bounds are taken from the stored row when it still exists. Hosts that delete their own row
/// before dispatching the event pass the last known bounds in `node`. Returns the number of
/// rows removed by the engine.
pub fn delete_subtree<S>(store: &mut S, node: &Node) -> Result<usize, NestedError>
where
    S: TreeStore + ?Sized,
{
    let bounds = match store.get(node.id)? {
        Some(row) if row.is_placed() => row.bounds,
        // Never numbered: nothing to renumber around.
        Some(_) => return Ok(0),
        None if node.is_placed() => node.bounds,
        None => return Err(NestedError::NodeNotFound { node: node.id }),
    };

    let width = bounds.width();
    let removed = store.delete_range(bounds.lft, bounds.rgt)?;
    close_gap(store, bounds.rgt, width)?;

    debug!(
        node = %node.id,
        lft = bounds.lft,
        rgt = bounds.rgt,
        width,
        removed,
        "deleted subtree"
    );
    Ok(removed)
}
