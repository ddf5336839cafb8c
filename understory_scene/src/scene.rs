// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core scene implementation: arena, edges, reclamation, traversal.

use alloc::vec;
use alloc::vec::Vec;
use glam::DMat4;

use crate::error::SceneError;
use crate::transform::{TransformStack, compose};
use crate::types::{GeometryHandle, LocalNode, NodeFlags, NodeId};

/// Controls how [`Scene::visit`] proceeds after a node has been visited.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisitControl {
    /// Descend into the node's children.
    Continue,
    /// Do not descend below this node.
    SkipChildren,
}

/// A node reached by [`Scene::visit`], with its path-dependent data.
#[derive(Clone, Copy, Debug)]
pub struct Visit<'a> {
    /// The reached node.
    pub node: NodeId,
    /// Its local data.
    pub local: &'a LocalNode,
    /// Effective transform from the traversal root along the current path.
    pub transform: DMat4,
    /// Path depth; the traversal root is depth `0`.
    pub depth: usize,
}

#[derive(Clone, Debug)]
pub(crate) struct Node {
    generation: u32,
    parents: Vec<NodeId>,
    children: Vec<NodeId>,
    local: LocalNode,
}

impl Node {
    fn new(generation: u32, local: LocalNode) -> Self {
        Self {
            generation,
            parents: Vec::new(),
            children: Vec::new(),
            local,
        }
    }
}

/// A multi-parent scene graph.
///
/// Nodes live in generational slots. Every node other than the root has at
/// least one parent; removing the last parent edge reclaims the node, and the
/// reclamation cascades to children that were only held by it.
pub struct Scene {
    nodes: Vec<Option<Node>>, // slots
    generations: Vec<u32>,    // last generation per slot (persists across frees)
    free_list: Vec<usize>,
    root: NodeId,
}

impl core::fmt::Debug for Scene {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.node_count();
        let free = self.free_list.len();
        f.debug_struct("Scene")
            .field("root", &self.root)
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &free)
            .finish_non_exhaustive()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Create a scene with an unnamed root.
    pub fn new() -> Self {
        Self::with_root(LocalNode::default())
    }

    /// Create a scene whose root carries `local`.
    pub fn with_root(local: LocalNode) -> Self {
        let mut scene = Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            root: NodeId::new(0, 1),
        };
        scene.root = scene.alloc(local);
        scene
    }

    /// The root node. It has no parents and is never reclaimed.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, the root included.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Insert a new node as the last child of `parent`.
    pub fn insert(&mut self, parent: NodeId, local: LocalNode) -> Result<NodeId, SceneError> {
        self.check_alive(parent)?;
        let id = self.alloc(local);
        self.link(parent, id);
        Ok(id)
    }

    /// Append `child` to `parent`'s children.
    ///
    /// Linking an existing edge again succeeds without changing the order.
    /// Fails with [`SceneError::Cycle`] if `child` is `parent` or one of its ancestors;
    /// the graph is left unchanged.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        self.check_alive(parent)?;
        self.check_alive(child)?;
        if self.node(parent).children.contains(&child) {
            return Ok(());
        }
        if child == parent || self.reaches(child, parent) {
            return Err(SceneError::Cycle { parent, child });
        }
        self.link(parent, child);
        log::trace!("linked {child} under {parent}");
        Ok(())
    }

    /// Register `parent` as an additional parent of `node`.
    ///
    /// This is [`Scene::add_child`] seen from the child; it is how a node is shared between subtrees.
    pub fn add_parent(&mut self, node: NodeId, parent: NodeId) -> Result<(), SceneError> {
        self.add_child(parent, node)
    }

    /// Remove the edge from `parent` to `child`.
    ///
    /// If that was `child`'s last parent, `child` is reclaimed together with
    /// every descendant that is no longer held by any other parent.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        self.check_alive(parent)?;
        self.check_alive(child)?;
        if !self.node(parent).children.contains(&child) {
            return Err(SceneError::NotAttached { parent, child });
        }
        self.unlink(parent, child);
        log::trace!("unlinked {child} from {parent}");
        if self.node(child).parents.is_empty() {
            self.reclaim(child);
        }
        Ok(())
    }

    /// Remove `parent` from `node`'s parents. See [`Scene::remove_child`].
    pub fn remove_parent(&mut self, node: NodeId, parent: NodeId) -> Result<(), SceneError> {
        self.remove_child(parent, node)
    }

    /// Detach `id` from all of its parents, reclaiming it.
    ///
    /// The root cannot be removed; calling this with the root is a no-op.
    pub fn remove(&mut self, id: NodeId) -> Result<(), SceneError> {
        self.check_alive(id)?;
        if id == self.root {
            return Ok(());
        }
        let parents = self.node(id).parents.clone();
        for parent in parents {
            self.unlink(parent, id);
        }
        self.reclaim(id);
        Ok(())
    }

    /// Returns true if `id` refers to a live node.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .map(|n| n.generation == id.1)
            .unwrap_or(false)
    }

    /// Local data of a live node.
    pub fn local(&self, id: NodeId) -> Option<&LocalNode> {
        self.node_opt(id).map(|n| &n.local)
    }

    /// Children of a live node, in draw order.
    pub fn children(&self, id: NodeId) -> Option<&[NodeId]> {
        self.node_opt(id).map(|n| n.children.as_slice())
    }

    /// Parents of a live node, in the order the edges were made.
    pub fn parents(&self, id: NodeId) -> Option<&[NodeId]> {
        self.node_opt(id).map(|n| n.parents.as_slice())
    }

    /// Update local transform.
    pub fn set_local_transform(&mut self, id: NodeId, transform: DMat4) {
        if let Some(n) = self.node_opt_mut(id) {
            n.local.transform = transform;
        }
    }

    /// Update name.
    pub fn set_name(&mut self, id: NodeId, name: Option<alloc::string::String>) {
        if let Some(n) = self.node_opt_mut(id) {
            n.local.name = name;
        }
    }

    /// Update geometry payload.
    pub fn set_geometry(&mut self, id: NodeId, geometry: Option<GeometryHandle>) {
        if let Some(n) = self.node_opt_mut(id) {
            n.local.geometry = geometry;
        }
    }

    /// Update node flags.
    pub fn set_flags(&mut self, id: NodeId, flags: NodeFlags) {
        if let Some(n) = self.node_opt_mut(id) {
            n.local.flags = flags;
        }
    }

    /// Toggle [`NodeFlags::VISIBLE`].
    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        if let Some(n) = self.node_opt_mut(id) {
            n.local.flags.set(NodeFlags::VISIBLE, visible);
        }
    }

    /// The first root→target path found by depth-first search in child order.
    ///
    /// The returned path includes both ends.
    pub fn path(&self, root: NodeId, target: NodeId) -> Result<Vec<NodeId>, SceneError> {
        self.check_alive(root)?;
        self.check_alive(target)?;
        // Each frame is (node, index of the next child to try).
        let mut frames: Vec<(NodeId, usize)> = vec![(root, 0)];
        let mut exhausted = vec![false; self.nodes.len()];
        while let Some(&(node, next)) = frames.last() {
            if node == target {
                return Ok(frames.iter().map(|(n, _)| *n).collect());
            }
            match self.node(node).children.get(next) {
                Some(&child) => {
                    let top = frames.len() - 1;
                    frames[top].1 += 1;
                    if !exhausted[child.idx()] {
                        frames.push((child, 0));
                    }
                }
                None => {
                    exhausted[node.idx()] = true;
                    frames.pop();
                }
            }
        }
        Err(SceneError::Unreachable { root, target })
    }

    /// Effective transform of `target` under `root`.
    ///
    /// Composes the local transforms strictly below `root` down to and including
    /// `target`, along the path returned by [`Scene::path`]. The effective
    /// transform of a node under itself is the identity.
    pub fn effective_transform(&self, root: NodeId, target: NodeId) -> Result<DMat4, SceneError> {
        let path = self.path(root, target)?;
        Ok(compose(
            path.iter().skip(1).map(|id| &self.node(*id).local.transform),
        ))
    }

    /// Depth-first traversal from `root`, children in insertion order.
    ///
    /// A node reachable along several paths is visited once per path, each time
    /// with that path's effective transform. The visitor decides whether to descend.
    pub fn visit<F>(&self, root: NodeId, mut visitor: F) -> Result<(), SceneError>
    where
        F: FnMut(Visit<'_>) -> VisitControl,
    {
        self.check_alive(root)?;
        let mut transforms = TransformStack::new();
        let mut pending: Vec<(NodeId, usize)> = vec![(root, 0)];
        while let Some((id, depth)) = pending.pop() {
            let node = self.node(id);
            if depth > 0 {
                transforms.unwind_to(depth - 1);
                transforms.push(node.local.transform);
            }
            let control = visitor(Visit {
                node: id,
                local: &node.local,
                transform: transforms.top(),
                depth,
            });
            if control == VisitControl::Continue {
                pending.extend(node.children.iter().rev().map(|c| (*c, depth + 1)));
            }
        }
        Ok(())
    }

    /// True if some path from `root` to `target` has only [`NodeFlags::VISIBLE`] nodes.
    ///
    /// Both ends must be visible. Stale ids are never visible.
    pub fn is_visible_from(&self, root: NodeId, target: NodeId) -> bool {
        self.is_alive(root)
            && self.is_alive(target)
            && self.reaches_through(root, target, |n| {
                n.local.flags.contains(NodeFlags::VISIBLE)
            })
    }

    /// Nodes under `root` in hit-testing order: topmost (last painted) first.
    ///
    /// Invisible subtrees are skipped, only [`NodeFlags::PICKABLE`] nodes are
    /// reported, and a node reachable along several paths is reported once at
    /// its topmost position.
    pub fn pick_order(&self, root: NodeId) -> Result<Vec<NodeId>, SceneError> {
        let mut painted = Vec::new();
        self.visit(root, |v| {
            if !v.local.flags.contains(NodeFlags::VISIBLE) {
                return VisitControl::SkipChildren;
            }
            if v.local.flags.contains(NodeFlags::PICKABLE) {
                painted.push(v.node);
            }
            VisitControl::Continue
        })?;
        let mut seen = vec![false; self.nodes.len()];
        Ok(painted
            .into_iter()
            .rev()
            .filter(|id| !core::mem::replace(&mut seen[id.idx()], true))
            .collect())
    }

    // --- internals ---

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.idx()].as_ref().expect("dangling NodeId")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.idx()].as_mut().expect("dangling NodeId")
    }

    fn node_opt(&self, id: NodeId) -> Option<&Node> {
        let n = self.nodes.get(id.idx())?.as_ref()?;
        (n.generation == id.1).then_some(n)
    }

    fn node_opt_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let n = self.nodes.get_mut(id.idx())?.as_mut()?;
        if n.generation != id.1 {
            return None;
        }
        Some(n)
    }

    pub(crate) fn children_of(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub(crate) fn parent_count(&self, id: NodeId) -> usize {
        self.node(id).parents.len()
    }

    fn check_alive(&self, id: NodeId) -> Result<(), SceneError> {
        if self.is_alive(id) {
            Ok(())
        } else {
            Err(SceneError::StaleNode(id))
        }
    }

    fn alloc(&mut self, local: LocalNode) -> NodeId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node::new(generation, local));
            (idx, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(Node::new(generation, local)));
            self.generations.push(generation);
            (self.nodes.len() - 1, generation)
        };
        #[allow(
            clippy::cast_possible_truncation,
            reason = "NodeId uses 32-bit indices by design."
        )]
        NodeId::new(idx as u32, generation)
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(parent).children.push(child);
        self.node_mut(child).parents.push(parent);
    }

    fn unlink(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(parent).children.retain(|c| *c != child);
        self.node_mut(child).parents.retain(|p| *p != parent);
    }

    /// True if `to` is reachable from `from` through child edges (or equal).
    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        self.reaches_through(from, to, |_| true)
    }

    /// Like [`Scene::reaches`], but only through nodes accepted by `pass`, both ends included.
    fn reaches_through(&self, from: NodeId, to: NodeId, pass: impl Fn(&Node) -> bool) -> bool {
        let mut seen = vec![false; self.nodes.len()];
        let mut pending = vec![from];
        while let Some(id) = pending.pop() {
            if core::mem::replace(&mut seen[id.idx()], true) {
                continue;
            }
            let node = self.node(id);
            if !pass(node) {
                continue;
            }
            if id == to {
                return true;
            }
            pending.extend_from_slice(&node.children);
        }
        false
    }

    /// Free `id` and cascade to children left without parents.
    fn reclaim(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let Some(node) = self.nodes[id.idx()].take() else {
                continue;
            };
            self.free_list.push(id.idx());
            log::trace!("reclaimed {id}");
            for child in node.children {
                let orphaned = {
                    let c = self.node_mut(child);
                    c.parents.retain(|p| *p != id);
                    c.parents.is_empty()
                };
                if orphaned && child != self.root {
                    pending.push(child);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    fn translate(x: f64, y: f64, z: f64) -> DMat4 {
        DMat4::from_translation(DVec3::new(x, y, z))
    }

    fn node(name: &str, transform: DMat4) -> LocalNode {
        LocalNode::named(name).with_transform(transform)
    }

    #[test]
    fn multi_parent_edges_are_ordered_and_idempotent() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.insert(root, LocalNode::named("a")).unwrap();
        let b = scene.insert(root, LocalNode::named("b")).unwrap();
        let line = scene.insert(a, LocalNode::named("line")).unwrap();

        scene.add_parent(line, a).unwrap();
        scene.add_parent(line, b).unwrap();
        assert_eq!(scene.parents(line).unwrap(), &[a, b]);
        assert_eq!(scene.children(a).unwrap(), &[line]);
        assert_eq!(scene.children(b).unwrap(), &[line]);
    }

    #[test]
    fn cycles_are_rejected_and_leave_graph_unchanged() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.insert(root, LocalNode::named("a")).unwrap();
        let b = scene.insert(a, LocalNode::named("b")).unwrap();
        let c = scene.insert(b, LocalNode::named("c")).unwrap();
        let side = scene.insert(root, LocalNode::named("side")).unwrap();
        scene.add_child(side, c).unwrap();

        let before = scene.describe_tree(false);
        assert_eq!(
            scene.add_child(c, a),
            Err(SceneError::Cycle {
                parent: c,
                child: a
            })
        );
        assert_eq!(
            scene.add_parent(a, a),
            Err(SceneError::Cycle {
                parent: a,
                child: a
            })
        );
        assert!(matches!(
            scene.add_child(c, root),
            Err(SceneError::Cycle { .. })
        ));
        // Repeating the failing call fails the same way.
        assert_eq!(scene.add_child(c, a), scene.add_child(c, a));
        assert_eq!(scene.describe_tree(false), before);
        // Sharing across branches is not a cycle.
        assert_eq!(scene.add_child(side, b), Ok(()));
    }

    #[test]
    fn detaching_missing_edge_is_reported() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.insert(root, LocalNode::named("a")).unwrap();
        let b = scene.insert(root, LocalNode::named("b")).unwrap();
        assert_eq!(
            scene.remove_child(a, b),
            Err(SceneError::NotAttached {
                parent: a,
                child: b
            })
        );
        assert!(scene.is_alive(b));
    }

    #[test]
    fn last_parent_removal_reclaims_cascade() {
        let mut scene = Scene::new();
        let root = scene.root();
        let vb1 = scene.insert(root, LocalNode::named("vb1")).unwrap();
        let vb2 = scene.insert(root, LocalNode::named("vb2")).unwrap();
        let shared = scene.insert(vb1, LocalNode::named("shared")).unwrap();
        scene.add_parent(shared, vb2).unwrap();
        let only_vb1 = scene.insert(vb1, LocalNode::named("only")).unwrap();
        let grandchild = scene.insert(only_vb1, LocalNode::named("gc")).unwrap();

        scene.remove_child(root, vb1).unwrap();
        assert!(!scene.is_alive(vb1));
        assert!(!scene.is_alive(only_vb1));
        assert!(!scene.is_alive(grandchild));
        assert!(scene.is_alive(shared), "still held by vb2");
        assert_eq!(scene.parents(shared).unwrap(), &[vb2]);
        assert_eq!(scene.node_count(), 3);
        assert_eq!(scene.local(vb1), None);
        assert_eq!(
            scene.add_child(vb1, shared),
            Err(SceneError::StaleNode(vb1))
        );
    }

    #[test]
    fn reclaimed_slots_are_reused_with_new_generation() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.insert(root, LocalNode::named("a")).unwrap();
        scene.remove(a).unwrap();
        let b = scene.insert(root, LocalNode::named("b")).unwrap();
        assert!(!scene.is_alive(a));
        assert!(scene.is_alive(b));
        assert_eq!(a.slot(), b.slot());
        assert!(b.generation() > a.generation());
        scene.remove(root).unwrap();
        assert!(scene.is_alive(root), "root is never reclaimed");
    }

    #[test]
    fn effective_transform_follows_first_path() {
        let mut scene = Scene::new();
        let root = scene.root();
        let left = scene.insert(root, node("left", translate(-10.0, 0.0, 0.0))).unwrap();
        let right = scene.insert(root, node("right", translate(10.0, 0.0, 0.0))).unwrap();
        let leaf = scene.insert(right, node("leaf", translate(0.0, 1.0, 0.0))).unwrap();
        scene.add_parent(leaf, left).unwrap();

        // `left` comes first in root's child order.
        let tf = scene.effective_transform(root, leaf).unwrap();
        assert_eq!(tf, translate(-10.0, 1.0, 0.0));
        // Rooted at `right`, only one path exists.
        let tf = scene.effective_transform(right, leaf).unwrap();
        assert_eq!(tf, translate(0.0, 1.0, 0.0));
        assert_eq!(
            scene.effective_transform(leaf, leaf).unwrap(),
            DMat4::IDENTITY
        );
        assert_eq!(
            scene.effective_transform(left, right),
            Err(SceneError::Unreachable {
                root: left,
                target: right
            })
        );
    }

    #[test]
    fn effective_transform_is_associative() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene
            .insert(root, node("a", DMat4::from_scale(DVec3::new(2.0, 3.0, 1.0))))
            .unwrap();
        let mid = scene
            .insert(a, node("mid", DMat4::from_rotation_z(0.3)))
            .unwrap();
        let b = scene
            .insert(mid, node("b", translate(1.0, -2.0, 0.5)))
            .unwrap();
        let target = scene
            .insert(b, node("target", DMat4::from_rotation_x(1.1)))
            .unwrap();

        let whole = scene.effective_transform(root, target).unwrap();
        let split = scene.effective_transform(root, mid).unwrap()
            * scene.effective_transform(mid, target).unwrap();
        assert!(whole.abs_diff_eq(split, 1e-12));
    }

    #[test]
    fn visit_reports_each_path_in_child_order() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.insert(root, node("a", translate(1.0, 0.0, 0.0))).unwrap();
        let b = scene.insert(root, node("b", translate(2.0, 0.0, 0.0))).unwrap();
        let shared = scene.insert(a, node("shared", translate(0.0, 1.0, 0.0))).unwrap();
        scene.add_parent(shared, b).unwrap();

        let mut seen = Vec::new();
        scene
            .visit(root, |v| {
                seen.push((v.node, v.depth, v.transform.w_axis.truncate()));
                VisitControl::Continue
            })
            .unwrap();
        assert_eq!(
            seen,
            vec![
                (root, 0, DVec3::ZERO),
                (a, 1, DVec3::new(1.0, 0.0, 0.0)),
                (shared, 2, DVec3::new(1.0, 1.0, 0.0)),
                (b, 1, DVec3::new(2.0, 0.0, 0.0)),
                (shared, 2, DVec3::new(2.0, 1.0, 0.0)),
            ]
        );
        // Local transform is shared and untouched by path composition.
        assert_eq!(
            scene.local(shared).unwrap().transform,
            translate(0.0, 1.0, 0.0)
        );
    }

    #[test]
    fn visit_can_skip_subtrees() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.insert(root, LocalNode::named("a")).unwrap();
        let _hidden = scene.insert(a, LocalNode::named("hidden")).unwrap();
        let b = scene.insert(root, LocalNode::named("b")).unwrap();
        let mut seen = Vec::new();
        scene
            .visit(root, |v| {
                seen.push(v.node);
                if v.node == a {
                    VisitControl::SkipChildren
                } else {
                    VisitControl::Continue
                }
            })
            .unwrap();
        assert_eq!(seen, vec![root, a, b]);
    }

    #[test]
    fn visibility_needs_one_fully_visible_path() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.insert(root, LocalNode::named("a")).unwrap();
        let b = scene.insert(root, LocalNode::named("b")).unwrap();
        let shared = scene.insert(a, LocalNode::named("shared")).unwrap();
        scene.add_parent(shared, b).unwrap();
        let leaf = scene.insert(shared, LocalNode::named("leaf")).unwrap();
        assert!(scene.is_visible_from(root, leaf));

        scene.set_visible(a, false);
        assert!(scene.is_visible_from(root, leaf), "still shown through b");
        scene.set_visible(b, false);
        assert!(!scene.is_visible_from(root, leaf));
        assert!(!scene.is_visible_from(root, shared));

        scene.set_visible(b, true);
        scene.set_visible(leaf, false);
        assert!(!scene.is_visible_from(root, leaf), "target itself hidden");
        assert!(scene.is_visible_from(root, root));
        scene.remove(leaf).unwrap();
        assert!(!scene.is_visible_from(root, leaf));
    }

    #[test]
    fn pick_order_is_reverse_paint_order() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.insert(root, LocalNode::named("a")).unwrap();
        let b = scene.insert(root, LocalNode::named("b")).unwrap();
        let c = scene.insert(a, LocalNode::named("c")).unwrap();
        scene.add_parent(c, b).unwrap();
        let hidden = scene.insert(root, LocalNode::named("hidden")).unwrap();
        let under_hidden = scene.insert(hidden, LocalNode::named("under")).unwrap();
        scene.set_visible(hidden, false);
        scene.set_flags(b, NodeFlags::VISIBLE);

        let order = scene.pick_order(root).unwrap();
        // Paint order: root, a, c, b, c. Topmost first, `b` not pickable, `c` once.
        assert_eq!(order, vec![c, a, root]);
        assert!(!order.contains(&under_hidden));
    }
}
