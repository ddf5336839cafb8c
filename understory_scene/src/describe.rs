// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text dump of the graph for debugging and tests.

use alloc::string::String;
use core::fmt::Write as _;
use glam::DMat4;

use crate::scene::Scene;
use crate::transform::TransformKind;
use crate::types::NodeId;

impl Scene {
    /// Describe the whole scene from its root. See [`Scene::describe_subtree`].
    pub fn describe_tree(&self, with_transform: bool) -> String {
        self.describe_subtree(self.root(), with_transform)
    }

    /// Describe the graph below `root`, one line per reached node.
    ///
    /// Shared nodes are listed under every parent and marked with their parent
    /// count. With `with_transform`, each line also shows the kind of the local
    /// transform and the effective transform resolved along the printed path.
    /// A stale `root` yields an empty string.
    ///
    /// ```
    /// use understory_scene::{LocalNode, Scene};
    ///
    /// let mut scene = Scene::with_root(LocalNode::named("canvas"));
    /// let root = scene.root();
    /// let a = scene.insert(root, LocalNode::named("a")).unwrap();
    /// let b = scene.insert(root, LocalNode::named("b")).unwrap();
    /// let line = scene.insert(a, LocalNode::named("line")).unwrap();
    /// scene.add_parent(line, b).unwrap();
    ///
    /// assert_eq!(
    ///     scene.describe_tree(false),
    ///     "Node \"canvas\"\n  \
    ///        +--Node \"a\"\n  \
    ///        |  +--Node \"line\" (2 parents)\n  \
    ///        +--Node \"b\"\n     \
    ///           +--Node \"line\" (2 parents)\n"
    /// );
    /// ```
    pub fn describe_subtree(&self, root: NodeId, with_transform: bool) -> String {
        let mut out = String::new();
        if self.is_alive(root) {
            self.describe_node(root, "", DMat4::IDENTITY, with_transform, &mut out);
        }
        out
    }

    fn describe_node(
        &self,
        id: NodeId,
        prefix: &str,
        effective: DMat4,
        with_transform: bool,
        out: &mut String,
    ) {
        let Some(local) = self.local(id) else {
            return;
        };
        if !prefix.is_empty() {
            out.push_str(&prefix[..prefix.len() - 3]);
            out.push_str("  +--");
        }
        out.push_str(if local.geometry.is_some() {
            "Geometry"
        } else {
            "Node"
        });
        if let Some(name) = &local.name {
            let _ = write!(out, " \"{name}\"");
        }
        let parents = self.parent_count(id);
        if parents > 1 {
            let _ = write!(out, " ({parents} parents)");
        }
        if with_transform {
            let _ = write!(
                out,
                " [local: {}; effective: {}]",
                TransformKind::classify(&local.transform),
                TransformKind::classify(&effective)
            );
        }
        out.push('\n');

        let children = self.children_of(id);
        let count = children.len();
        for (i, child) in children.iter().enumerate() {
            let mut sub_prefix = String::from(prefix);
            sub_prefix.push_str(if i + 1 == count { "   " } else { "  |" });
            let child_effective = effective * self.node_transform(*child);
            self.describe_node(*child, &sub_prefix, child_effective, with_transform, out);
        }
    }

    fn node_transform(&self, id: NodeId) -> DMat4 {
        self.local(id).map(|l| l.transform).unwrap_or(DMat4::IDENTITY)
    }
}

#[cfg(test)]
mod tests {
    use crate::{GeometryHandle, LocalNode, Scene};
    use glam::{DMat4, DVec3};

    #[test]
    fn describe_with_transforms() {
        let mut scene = Scene::with_root(LocalNode::named("canvas"));
        let root = scene.root();
        let vb = scene
            .insert(
                root,
                LocalNode::named("vb").with_transform(DMat4::from_translation(DVec3::X)),
            )
            .unwrap();
        let _box = scene
            .insert(
                vb,
                LocalNode::named("nd box")
                    .with_geometry(GeometryHandle(7))
                    .with_transform(DMat4::from_scale(DVec3::new(2.0, 2.0, 1.0))),
            )
            .unwrap();

        let text = scene.describe_tree(true);
        assert_eq!(
            text,
            "Node \"canvas\" [local: identity; effective: identity]\n\
             \x20 +--Node \"vb\" [local: translate(1, 0, 0); effective: translate(1, 0, 0)]\n\
             \x20    +--Geometry \"nd box\" [local: scale(2, 2, 1); effective: scale(2, 2, 1) translate(1, 0, 0)]\n"
        );
    }

    #[test]
    fn stale_root_describes_nothing() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.insert(root, LocalNode::named("a")).unwrap();
        scene.remove(a).unwrap();
        assert!(scene.describe_subtree(a, true).is_empty());
    }
}
