// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transform composition along traversal paths.
//!
//! Composition is matrix multiplication in parent-to-child order. The effective
//! transform of a node under a traversal root is the product of the local
//! transforms strictly below the root down to and including the node, so the
//! root itself contributes the identity and paths split at any intermediate node:
//!
//! ```
//! use glam::{DMat4, DVec3};
//! use understory_scene::TransformStack;
//!
//! let mut stack = TransformStack::new();
//! stack.push(DMat4::from_translation(DVec3::X));
//! stack.push(DMat4::from_scale(DVec3::splat(2.0)));
//! assert_eq!(stack.top().transform_point3(DVec3::ONE), DVec3::new(3.0, 2.0, 2.0));
//! stack.unwind_to(0);
//! assert_eq!(stack.top(), DMat4::IDENTITY);
//! ```

use alloc::vec;
use alloc::vec::Vec;
use glam::{DMat4, DVec3, DVec4};

/// A stack of composed transforms mirroring a root→node path.
///
/// Entry `d` holds the effective transform of the node at depth `d` of the path
/// currently being walked. Entry `0` is the traversal root's frame.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformStack {
    stack: Vec<DMat4>,
}

impl Default for TransformStack {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformStack {
    /// Create a stack whose root frame is the identity.
    pub fn new() -> Self {
        Self::with_base(DMat4::IDENTITY)
    }

    /// Create a stack whose root frame is `base`.
    pub fn with_base(base: DMat4) -> Self {
        Self { stack: vec![base] }
    }

    /// Descend one level, composing `local` onto the current top.
    pub fn push(&mut self, local: DMat4) {
        let top = self.top();
        self.stack.push(top * local);
    }

    /// Ascend one level. The root frame is never popped.
    pub fn pop(&mut self) -> Option<DMat4> {
        if self.stack.len() > 1 {
            self.stack.pop()
        } else {
            None
        }
    }

    /// Drop every entry deeper than `depth`.
    pub fn unwind_to(&mut self, depth: usize) {
        self.stack.truncate(depth + 1);
    }

    /// The transform of the deepest entry.
    pub fn top(&self) -> DMat4 {
        self.stack.last().copied().unwrap_or(DMat4::IDENTITY)
    }

    /// Depth of the current top (the root frame is depth `0`).
    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }
}

/// Compose transforms in parent-to-child order.
pub fn compose<'a>(locals: impl IntoIterator<Item = &'a DMat4>) -> DMat4 {
    locals
        .into_iter()
        .fold(DMat4::IDENTITY, |acc, local| acc * *local)
}

const KIND_EPSILON: f64 = 1e-12;

/// Coarse classification of a transform, used by diagnostics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransformKind {
    /// No-op.
    Identity,
    /// Pure translation.
    Translate(DVec3),
    /// Pure axis-aligned scale.
    Scale(DVec3),
    /// Axis-aligned scale followed by translation.
    ScaleTranslate {
        /// Scale factors.
        scale: DVec3,
        /// Translation applied after scaling.
        translate: DVec3,
    },
    /// Any other affine transform (rotation, shear).
    Affine,
    /// Transform with a non-trivial projective row.
    Projective,
}

impl TransformKind {
    /// Classify `m`.
    pub fn classify(m: &DMat4) -> Self {
        let near = |a: f64, b: f64| (-KIND_EPSILON..=KIND_EPSILON).contains(&(a - b));
        let row3 = m.row(3);
        if !row3.abs_diff_eq(DVec4::W, KIND_EPSILON) {
            return Self::Projective;
        }
        let off_diagonal = [
            m.x_axis.y, m.x_axis.z, m.y_axis.x, m.y_axis.z, m.z_axis.x, m.z_axis.y,
        ];
        if off_diagonal.iter().any(|v| !near(*v, 0.0)) {
            return Self::Affine;
        }
        let scale = DVec3::new(m.x_axis.x, m.y_axis.y, m.z_axis.z);
        let translate = m.w_axis.truncate();
        let unit_scale = scale.abs_diff_eq(DVec3::ONE, KIND_EPSILON);
        let no_translate = translate.abs_diff_eq(DVec3::ZERO, KIND_EPSILON);
        match (unit_scale, no_translate) {
            (true, true) => Self::Identity,
            (true, false) => Self::Translate(translate),
            (false, true) => Self::Scale(scale),
            (false, false) => Self::ScaleTranslate { scale, translate },
        }
    }
}

struct Triple(DVec3);

impl core::fmt::Display for Triple {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}, {}, {}", self.0.x, self.0.y, self.0.z)
    }
}

impl core::fmt::Display for TransformKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Identity => f.write_str("identity"),
            Self::Translate(t) => write!(f, "translate({})", Triple(*t)),
            Self::Scale(s) => write!(f, "scale({})", Triple(*s)),
            Self::ScaleTranslate { scale, translate } => {
                write!(f, "scale({}) translate({})", Triple(*scale), Triple(*translate))
            }
            Self::Affine => f.write_str("affine"),
            Self::Projective => f.write_str("projective"),
        }
    }
}
