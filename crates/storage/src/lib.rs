#![forbid(unsafe_code)]

//! SQLite host for the nested-set engine: a configurable tree table, the transaction type the
//! engine runs against, and a repository that drives the hooks on every row change.

mod store;

pub use nested_core::{
    HookSettings, InvariantViolation, NestedError, NestedSet, Node, NodeId, ReparentTrigger,
};
pub use store::{
    NewNode, ParentRef, SqliteTreeStore, SqliteTreeTx, StoreError, TreeConfig, TreeRepository,
    TreeRow,
};
