// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! View boxes: clipped, independently projected regions of a canvas.

use core::fmt;

use kurbo::{Rect, Size};
use understory_scene::NodeId;

use crate::backend::Color;
use crate::camera::Camera;
use crate::clip::ClipStrategy;

/// Handle of a view box registered with a [`Canvas`](crate::Canvas).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewBoxId(pub(crate) u32);

impl fmt::Display for ViewBoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "viewbox#{}", self.0)
    }
}

/// Where a view box sits inside its layout area.
///
/// The layout area is the canvas, or the rectangle of the enclosing view box
/// when the view box was created under another one.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum Placement {
    /// Cover the whole layout area.
    #[default]
    Fill,
    /// A rectangle in unit coordinates of the layout area, `(0, 0)` top-left.
    Fraction(Rect),
    /// An explicit rectangle in canvas pixels. Not updated on resize.
    Manual(Rect),
}

impl Placement {
    /// True for placements recomputed when the layout area changes.
    pub fn is_auto(&self) -> bool {
        !matches!(self, Self::Manual(_))
    }

    /// The rectangle this placement yields inside `area`.
    pub fn resolve(&self, area: Rect) -> Rect {
        match *self {
            Self::Fill => area,
            Self::Fraction(f) => Rect::new(
                area.x0 + f.x0 * area.width(),
                area.y0 + f.y0 * area.height(),
                area.x0 + f.x1 * area.width(),
                area.y0 + f.y1 * area.height(),
            ),
            Self::Manual(rect) => rect,
        }
    }
}

/// Visual decoration of a view box.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ViewBoxStyle {
    /// Border drawn after the content, inside the rectangle. `None` draws no border.
    pub border_color: Option<Color>,
    /// Border width in pixels.
    pub border_width: u32,
}

impl Default for ViewBoxStyle {
    fn default() -> Self {
        Self {
            border_color: None,
            border_width: 1,
        }
    }
}

/// A rectangular region of the canvas showing one subtree through one camera.
///
/// The view box owns two scene nodes. Its `node` sits in the parent graph and
/// carries the layout; `scene` is the subtree root that client content is added
/// under. The camera supplies the frame of `scene`.
#[derive(Clone, Debug)]
pub struct ViewBox {
    pub(crate) id: ViewBoxId,
    pub(crate) name: String,
    pub(crate) node: NodeId,
    pub(crate) scene: NodeId,
    pub(crate) camera: Camera,
    pub(crate) clip: ClipStrategy,
    pub(crate) style: ViewBoxStyle,
    pub(crate) placement: Placement,
    pub(crate) rect: Rect,
    pub(crate) layout_parent: Option<ViewBoxId>,
}

impl ViewBox {
    /// Handle of this view box.
    pub fn id(&self) -> ViewBoxId {
        self.id
    }

    /// Diagnostic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The node representing this view box in its parent's graph.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The root of the subtree shown by this view box. Add content here.
    pub fn scene(&self) -> NodeId {
        self.scene
    }

    /// Current camera.
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable access to the camera parameters.
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Replace the camera.
    pub fn set_camera(&mut self, camera: impl Into<Camera>) {
        self.camera = camera.into();
    }

    /// Requested clip strategy. The renderer may degrade it, see [`ClipStrategy::resolve`].
    pub fn clip(&self) -> ClipStrategy {
        self.clip
    }

    /// Replace the clip strategy. Applies from the next frame.
    pub fn set_clip(&mut self, clip: ClipStrategy) {
        self.clip = clip;
    }

    /// Style.
    pub fn style(&self) -> ViewBoxStyle {
        self.style
    }

    /// Set the border color; `None` removes the border.
    pub fn set_border_color(&mut self, color: Option<Color>) {
        self.style.border_color = color;
    }

    /// Set the border width in pixels.
    pub fn set_border_width(&mut self, width: u32) {
        self.style.border_width = width;
    }

    /// Placement.
    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Current rectangle in canvas pixels.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Current size in canvas pixels.
    pub fn size(&self) -> Size {
        self.rect.size()
    }

    /// The enclosing view box, if this one was created under another.
    pub fn layout_parent(&self) -> Option<ViewBoxId> {
        self.layout_parent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_resolution() {
        let area = Rect::new(100.0, 0.0, 500.0, 200.0);
        assert_eq!(Placement::Fill.resolve(area), area);
        assert_eq!(
            Placement::Fraction(Rect::new(0.0, 0.0, 0.5, 1.0)).resolve(area),
            Rect::new(100.0, 0.0, 300.0, 200.0)
        );
        let manual = Rect::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(Placement::Manual(manual).resolve(area), manual);
        assert!(Placement::Fill.is_auto());
        assert!(!Placement::Manual(manual).is_auto());
    }
}
