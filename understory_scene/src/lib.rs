// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_scene --heading-base-level=0

//! Understory Scene: a multi-parent scene graph with path-dependent transforms.
//!
//! Understory Scene is the structural half of a retained renderer.
//!
//! - Represents drawable content as a DAG: a node may have several parents, but never becomes its own ancestor.
//! - Keeps one local transform per node and composes effective transforms per traversal path.
//! - Provides a deterministic depth-first traversal (children in insertion order) for painting and
//!   its reverse for hit testing.
//!
//! ## Sharing, not copying
//!
//! A node reachable from two subtrees (for example two independently clipped views that show the same
//! plot line) is stored once. Its effective transform depends on which traversal root reached it, and
//! its local transform is never modified by traversal.
//!
//! ## Ownership
//!
//! Nodes live in an arena and are addressed by generational [`NodeId`]s. Parent and child relations are
//! index lists, so there are no reference cycles to manage. A node lives while at least one parent holds
//! it; when its last parent edge is removed it is reclaimed, and the reclamation cascades to children that
//! were only held by it. The [`Scene::root`] is never reclaimed.
//!
//! ## API overview
//!
//! - [`Scene`]: the arena, edge operations and queries.
//! - [`LocalNode`]: per-node data (name, transform, geometry handle, flags).
//! - [`NodeFlags`]: visibility and picking controls.
//! - [`TransformStack`]: path-aligned transform composition used by traversal.
//! - [`SceneError`]: structural errors; an operation that fails leaves the graph unchanged.
//!
//! Key operations:
//! - [`Scene::insert`], [`Scene::add_child`] / [`Scene::add_parent`], [`Scene::remove_child`] / [`Scene::remove_parent`]
//! - [`Scene::effective_transform`] and [`Scene::path`]
//! - [`Scene::visit`] and [`Scene::pick_order`]
//! - [`Scene::describe_tree`] for diagnostics.
//!
//! # Example
//!
//! ```rust
//! use glam::{DMat4, DVec3};
//! use understory_scene::{LocalNode, Scene, SceneError};
//!
//! let mut scene = Scene::with_root(LocalNode::named("canvas"));
//! let root = scene.root();
//! let left = scene.insert(root, LocalNode::named("left")).unwrap();
//! let right = scene
//!     .insert(root, LocalNode::named("right").with_transform(DMat4::from_translation(DVec3::X)))
//!     .unwrap();
//!
//! // One line, shown under both views.
//! let line = scene.insert(left, LocalNode::named("line")).unwrap();
//! scene.add_parent(line, right).unwrap();
//!
//! let under_right = scene.effective_transform(right, line).unwrap();
//! assert_eq!(under_right, DMat4::IDENTITY);
//! let under_root = scene.effective_transform(root, line).unwrap();
//! assert_eq!(under_root, DMat4::IDENTITY, "the first path goes through `left`");
//!
//! // A node cannot become its own ancestor.
//! assert!(matches!(scene.add_child(line, root), Err(SceneError::Cycle { .. })));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod describe;
mod error;
mod scene;
mod transform;
mod types;

pub use error::SceneError;
pub use scene::{Scene, Visit, VisitControl};
pub use transform::{TransformKind, TransformStack, compose};
pub use types::{GeometryHandle, LocalNode, NodeFlags, NodeId};
