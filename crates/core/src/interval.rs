#![forbid(unsafe_code)]

//! Structural invariants of a nested-set encoding.
//!
//! A valid population of N placed rows satisfies:
//! - `lft < rgt` for every row;
//! - any two intervals are disjoint or strictly nested;
//! - a row's parent is the nearest row whose interval strictly contains it;
//! - roots sit at level 0 and every child one level below its parent;
//! - the endpoints `{lft} ∪ {rgt}` are exactly `1..=2N`.

use crate::model::{Bounds, Node, NodeId};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("node {node} has inverted or unset bounds {bounds}")]
    InvertedBounds { node: NodeId, bounds: Bounds },

    #[error("endpoint {value} is used more than once")]
    DuplicateEndpoint { value: i64 },

    #[error("endpoints are not contiguous: expected {expected}, found {found}")]
    EndpointGap { expected: i64, found: i64 },

    #[error("node {node} partially overlaps node {other}")]
    PartialOverlap { node: NodeId, other: NodeId },

    #[error("node {node} records parent {recorded:?} but is nested in {actual:?}")]
    ParentMismatch {
        node: NodeId,
        recorded: Option<NodeId>,
        actual: Option<NodeId>,
    },

    #[error("node {node} sits at level {found}, expected {expected}")]
    LevelMismatch {
        node: NodeId,
        expected: i64,
        found: i64,
    },
}

/// Checks the full row set of one tree population and reports the first violation.
pub fn validate(nodes: &[Node]) -> Result<(), InvariantViolation> {
    for node in nodes {
        if !node.bounds.is_set() {
            return Err(InvariantViolation::InvertedBounds {
                node: node.id,
                bounds: node.bounds,
            });
        }
    }

    check_endpoints(nodes)?;

    let mut ordered: Vec<&Node> = nodes.iter().collect();
    ordered.sort_by_key(|node| node.bounds.lft);

    let mut open: Vec<&Node> = Vec::new();
    for node in ordered {
        while open
            .last()
            .is_some_and(|top| top.bounds.rgt < node.bounds.lft)
        {
            open.pop();
        }

        let enclosing = open.last().copied();
        if let Some(top) = enclosing {
            if !top.bounds.contains(node.bounds) {
                return Err(InvariantViolation::PartialOverlap {
                    node: node.id,
                    other: top.id,
                });
            }
        }

        let actual = enclosing.map(|top| top.id);
        if node.parent_id != actual {
            return Err(InvariantViolation::ParentMismatch {
                node: node.id,
                recorded: node.parent_id,
                actual,
            });
        }

        let expected = enclosing.map_or(0, |top| top.level + 1);
        if node.level != expected {
            return Err(InvariantViolation::LevelMismatch {
                node: node.id,
                expected,
                found: node.level,
            });
        }

        open.push(node);
    }

    Ok(())
}

fn check_endpoints(nodes: &[Node]) -> Result<(), InvariantViolation> {
    let mut endpoints: Vec<i64> = nodes
        .iter()
        .flat_map(|node| [node.bounds.lft, node.bounds.rgt])
        .collect();
    endpoints.sort_unstable();

    for pair in endpoints.windows(2) {
        if pair[0] == pair[1] {
            return Err(InvariantViolation::DuplicateEndpoint { value: pair[0] });
        }
    }

    for (expected, found) in (1..).zip(endpoints.iter().copied()) {
        if expected != found {
            return Err(InvariantViolation::EndpointGap { expected, found });
        }
    }

    Ok(())
}
