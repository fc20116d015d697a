#![forbid(unsafe_code)]

//! Nested-set (modified preorder tree traversal) maintenance.
//!
//! Rows carry a parent reference plus a derived `(lft, rgt, level)` triple. The engine keeps
//! that triple consistent across inserts, subtree deletes and subtree moves, working against
//! any [`TreeStore`] the host provides inside one [`UnitOfWork`].

pub mod capability;
pub mod engine;
mod error;
pub mod hooks;
pub mod interval;
pub mod memory;
pub mod model;
pub mod store;

pub use error::{NestedError, StoreFault};
pub use hooks::{HookSettings, NestedSet, ReparentTrigger};
pub use interval::InvariantViolation;
pub use memory::MemoryTreeStore;
pub use model::{Bounds, Node, NodeId, NodeIdError};
pub use store::{ParentFilter, ScanFilter, TreeStore, UnitOfWork};
