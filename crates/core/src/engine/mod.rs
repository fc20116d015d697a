#![forbid(unsafe_code)]

//! The three maintenance algorithms. Each function assumes it already runs inside the unit of
//! work of the caller and leaves the tree valid when it returns `Ok`.

mod delete;
mod insert;
mod relocate;
mod shift;

pub use delete::delete_subtree;
pub use insert::insert_node;
pub use relocate::move_subtree;
