#![forbid(unsafe_code)]

use std::fmt;

/// Row identity. Opaque to the engine apart from being positive; zero is reserved for "no
/// parent" in hosts that store roots with a zero parent column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) i64);

impl NodeId {
    pub fn get(self) -> i64 {
        self.0
    }

    pub fn try_new(value: i64) -> Result<Self, NodeIdError> {
        if value <= 0 {
            return Err(NodeIdError::NotPositive(value));
        }
        Ok(Self(value))
    }

    /// Reads a raw parent column: null and zero both mean root.
    pub fn parent_from_raw(value: Option<i64>) -> Result<Option<Self>, NodeIdError> {
        match value {
            None | Some(0) => Ok(None),
            Some(raw) => Self::try_new(raw).map(Some),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeIdError {
    NotPositive(i64),
}

impl NodeIdError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::NotPositive(_) => "node id must be a positive integer",
        }
    }
}

impl fmt::Display for NodeIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPositive(value) => write!(f, "{} (got {value})", self.message()),
        }
    }
}

impl std::error::Error for NodeIdError {}

/// The `[lft, rgt]` interval of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Bounds {
    pub lft: i64,
    pub rgt: i64,
}

impl Bounds {
    /// Bounds of a host row that the engine has not numbered yet.
    pub const UNSET: Bounds = Bounds { lft: 0, rgt: 0 };

    pub fn new(lft: i64, rgt: i64) -> Self {
        Self { lft, rgt }
    }

    pub fn is_set(self) -> bool {
        self.lft > 0 && self.lft < self.rgt
    }

    /// `rgt - lft + 1`; twice the number of nodes in the subtree.
    pub fn width(self) -> i64 {
        self.rgt - self.lft + 1
    }

    pub fn is_leaf(self) -> bool {
        self.rgt == self.lft + 1
    }

    pub fn descendant_count(self) -> i64 {
        (self.width() - 2) / 2
    }

    /// Strict containment: `other` is a descendant of `self`.
    pub fn contains(self, other: Bounds) -> bool {
        self.lft < other.lft && other.rgt < self.rgt
    }

    /// Containment that also accepts `other == self`.
    pub fn encloses(self, other: Bounds) -> bool {
        self.lft <= other.lft && other.rgt <= self.rgt
    }

    pub fn translate(self, offset: i64) -> Self {
        Self {
            lft: self.lft + offset,
            rgt: self.rgt + offset,
        }
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lft, self.rgt)
    }
}

/// A tree row as the engine sees it. `parent_id` is owned by the caller; `bounds` and `level`
/// are derived state owned by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub parent_id: Option<NodeId>,
    pub bounds: Bounds,
    pub level: i64,
}

impl Node {
    /// A row the host has persisted but the engine has not placed yet.
    pub fn unplaced(id: NodeId, parent_id: Option<NodeId>) -> Self {
        Self {
            id,
            parent_id,
            bounds: Bounds::UNSET,
            level: 0,
        }
    }

    pub fn left(&self) -> i64 {
        self.bounds.lft
    }

    pub fn right(&self) -> i64 {
        self.bounds.rgt
    }

    pub fn level(&self) -> i64 {
        self.level
    }

    pub fn width(&self) -> i64 {
        self.bounds.width()
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_placed(&self) -> bool {
        self.bounds.is_set()
    }

    pub fn descendant_count(&self) -> i64 {
        self.bounds.descendant_count()
    }

    pub fn is_descendant_of(&self, other: &Node) -> bool {
        other.bounds.contains(self.bounds)
    }
}
