#![forbid(unsafe_code)]

use crate::error::{NestedError, StoreFault};
use crate::model::{Bounds, Node, NodeId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParentFilter {
    #[default]
    Any,
    Root,
    Child(NodeId),
}

/// Row predicate over `lft`, `rgt` and the parent reference. Range limits are inclusive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanFilter {
    pub lft_min: Option<i64>,
    pub lft_max: Option<i64>,
    pub rgt_min: Option<i64>,
    pub rgt_max: Option<i64>,
    pub parent: ParentFilter,
}

impl ScanFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn roots() -> Self {
        Self {
            parent: ParentFilter::Root,
            ..Self::default()
        }
    }

    pub fn children_of(parent: NodeId) -> Self {
        Self {
            parent: ParentFilter::Child(parent),
            ..Self::default()
        }
    }

    /// Every row whose interval lies inside `bounds`, the owner of `bounds` included.
    pub fn within(bounds: Bounds) -> Self {
        Self {
            lft_min: Some(bounds.lft),
            rgt_max: Some(bounds.rgt),
            ..Self::default()
        }
    }

    /// Every row whose interval encloses `bounds`, the owner of `bounds` included.
    pub fn enclosing(bounds: Bounds) -> Self {
        Self {
            lft_max: Some(bounds.lft),
            rgt_min: Some(bounds.rgt),
            ..Self::default()
        }
    }

    pub fn matches(&self, node: &Node) -> bool {
        let Bounds { lft, rgt } = node.bounds;
        if self.lft_min.is_some_and(|min| lft < min) || self.lft_max.is_some_and(|max| lft > max)
        {
            return false;
        }
        if self.rgt_min.is_some_and(|min| rgt < min) || self.rgt_max.is_some_and(|max| rgt > max)
        {
            return false;
        }
        match self.parent {
            ParentFilter::Any => true,
            ParentFilter::Root => node.parent_id.is_none(),
            ParentFilter::Child(parent) => node.parent_id == Some(parent),
        }
    }
}

/// Row storage the engine runs against.
///
/// Every call happens inside one unit of work supplied by the host (see [`UnitOfWork`]): a
/// later call must observe the effects of earlier ones, and no other structural operation on
/// the same tree may interleave. Rows the engine has not placed yet (bounds `0/0`) are
/// invisible to [`TreeStore::scan`] and never match a shift or range delete.
pub trait TreeStore {
    fn get(&mut self, id: NodeId) -> Result<Option<Node>, StoreFault>;

    /// Placed rows matching `filter`, ascending `lft`.
    fn scan(&mut self, filter: &ScanFilter) -> Result<Vec<Node>, StoreFault>;

    /// Largest `rgt` in the tree, 0 when it is empty.
    fn max_right(&mut self) -> Result<i64, StoreFault> {
        Ok(self
            .scan(&ScanFilter::all())?
            .iter()
            .map(|node| node.bounds.rgt)
            .max()
            .unwrap_or(0))
    }

    /// Adds `delta` to `lft` of every row with `lft > threshold`.
    fn shift_left(&mut self, threshold: i64, delta: i64) -> Result<usize, StoreFault>;

    /// Adds `delta` to `rgt` of every row with `rgt >= threshold`.
    fn shift_right(&mut self, threshold: i64, delta: i64) -> Result<usize, StoreFault>;

    /// Deletes every row with `lo <= lft` and `rgt <= hi`.
    fn delete_range(&mut self, lo: i64, hi: i64) -> Result<usize, StoreFault>;

    /// Persists `(lft, rgt, level)` of one existing row. The parent column belongs to the host.
    fn write(&mut self, node: &Node) -> Result<(), StoreFault>;
}

/// Atomic execution scope for one structural operation.
///
/// Implementations must serialize `work` against every other structural operation on the
/// same tree (serializable isolation or an exclusive writer lock) and commit only when `work`
/// returns `Ok`. On `Err` nothing `work` did may remain visible. Conflicts detected by the
/// backend surface as [`NestedError::ConcurrentModification`].
pub trait UnitOfWork {
    fn atomically<T, F>(&mut self, work: F) -> Result<T, NestedError>
    where
        F: FnOnce(&mut dyn TreeStore) -> Result<T, NestedError>;
}
