// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the scene graph: node identifiers, flags, geometry handles and local data.

use alloc::string::String;
use glam::DMat4;

/// Identifier for a node in the scene.
///
/// This is a small, copyable handle that stays stable across updates but becomes
/// invalid when the underlying slot is reclaimed.
/// It consists of a slot index and a generation counter.
///
/// ## Semantics
///
/// - On insert, a fresh slot is allocated with generation `1`.
/// - When a node loses its last parent it is reclaimed; any `NodeId` that pointed to that slot is now stale.
/// - On reuse of a reclaimed slot, its generation is incremented, producing a new, distinct `NodeId`.
///
/// Use [`Scene::is_alive`](crate::Scene::is_alive) to check whether a `NodeId` still refers to a live node.
/// Stale `NodeId`s never alias a different live node because the generation must match.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    /// Slot index of this handle.
    pub const fn slot(self) -> u32 {
        self.0
    }

    /// Generation of this handle.
    pub const fn generation(self) -> u32 {
        self.1
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}v{}", self.0, self.1)
    }
}

bitflags::bitflags! {
    /// Node flags controlling visibility and picking.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Node is visible. Invisible nodes are skipped together with their subtree when drawing.
        const VISIBLE  = 0b0000_0001;
        /// Node is pickable (participates in [`Scene::pick_order`](crate::Scene::pick_order)).
        const PICKABLE = 0b0000_0010;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::VISIBLE | Self::PICKABLE
    }
}

/// Opaque reference to geometry owned by the drawing backend.
///
/// The scene never looks inside; it only forwards the handle with each draw call.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct GeometryHandle(pub u64);

/// Local data for a node.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalNode {
    /// Optional diagnostic name, shown by [`Scene::describe_tree`](crate::Scene::describe_tree).
    pub name: Option<String>,
    /// Local transform relative to the parent frame.
    ///
    /// The same node may be reached along several paths; only the composed
    /// (effective) transform differs per path, this one is shared.
    pub transform: DMat4,
    /// Optional geometry payload. Nodes without geometry still carry transforms for their subtree.
    pub geometry: Option<GeometryHandle>,
    /// Visibility and picking flags.
    pub flags: NodeFlags,
}

impl Default for LocalNode {
    fn default() -> Self {
        Self {
            name: None,
            transform: DMat4::IDENTITY,
            geometry: None,
            flags: NodeFlags::default(),
        }
    }
}

impl LocalNode {
    /// A node with the given name and defaults elsewhere.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Builder-style geometry setter.
    #[must_use]
    pub fn with_geometry(mut self, geometry: GeometryHandle) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Builder-style transform setter.
    #[must_use]
    pub fn with_transform(mut self, transform: DMat4) -> Self {
        self.transform = transform;
        self
    }
}
