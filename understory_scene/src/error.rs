// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural errors reported by [`Scene`](crate::Scene) operations.
//!
//! All of these are recoverable: the operation that returned the error left the graph unchanged.

use crate::types::NodeId;

/// Errors returned by scene graph edits and queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    /// Linking `child` under `parent` would make a node its own ancestor.
    #[error("adding {child} under {parent} would create a cycle")]
    Cycle {
        /// Prospective parent.
        parent: NodeId,
        /// Prospective child.
        child: NodeId,
    },
    /// There is no edge from `parent` to `child` to remove.
    #[error("{child} is not attached to {parent}")]
    NotAttached {
        /// Parent side of the missing edge.
        parent: NodeId,
        /// Child side of the missing edge.
        child: NodeId,
    },
    /// `target` cannot be reached from `root` by following child edges.
    #[error("{target} is unreachable from {root}")]
    Unreachable {
        /// Traversal root.
        root: NodeId,
        /// Queried node.
        target: NodeId,
    },
    /// The handle refers to a reclaimed node.
    #[error("{0} refers to a reclaimed node")]
    StaleNode(NodeId),
}
