// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_viewbox --heading-base-level=0

//! Understory ViewBox: clipped, independently projected views of a shared scene graph.
//!
//! A [`Canvas`] owns an [`understory_scene::Scene`] and a list of [`ViewBox`]es. Each view box shows
//! one subtree through one [`Camera`] and confines it to its rectangle with one [`ClipStrategy`].
//! Content can be shared between view boxes by giving a node several parents; every view box then
//! draws it with its own effective transform.
//!
//! ## Frame model
//!
//! [`SceneGraphRenderer::render`] runs one pass for content outside any view box and one pass per
//! view box in registration order. A pass binds the clip, traverses the subtree depth-first in child
//! order and emits one [`DrawCall`] per geometry node per path, then releases the clip through the
//! [`ClipScope`] guard. Drawing goes through the [`Backend`] trait; [`SoftwareBackend`] is a CPU
//! reference implementation.
//!
//! ## Clip strategies
//!
//! - [`ClipStrategy::Fragment`]: per-draw discard rectangle, no shared state.
//! - [`ClipStrategy::Viewport`]: hardware viewport, restored exactly on release.
//! - [`ClipStrategy::Fbo`]: pooled offscreen target composited on release.
//!
//! All three produce the same pixels for axis-aligned content. A strategy the hardware cannot
//! serve degrades to fragment clipping with a warning.
//!
//! ## Events
//!
//! Resize, frame ticks, input and teardown are posted with [`Canvas::post`] and applied in order by
//! [`Canvas::process_events`]. Pointer drags are captured by the view box they started in.
//!
//! # Example
//!
//! ```rust
//! use glam::DVec3;
//! use kurbo::Rect;
//! use understory_scene::LocalNode;
//! use understory_viewbox::{
//!     Canvas, ClipStrategy, Color, Placement, Primitive, SceneGraphRenderer, SoftwareBackend,
//!     TurntableCamera, UpAxis,
//! };
//!
//! let mut backend = SoftwareBackend::new();
//! let line = backend.add_geometry(
//!     vec![DVec3::new(-1.0, 0.0, 0.0), DVec3::new(1.0, 0.0, 0.0)],
//!     Color::WHITE,
//!     Primitive::LineStrip,
//! );
//!
//! let mut canvas = Canvas::new((800.0, 600.0));
//! let root = canvas.root();
//! let vb1 = canvas.create_view_box(root, ClipStrategy::Fragment, "vb1", Some(Color::YELLOW)).unwrap();
//! let vb2 = canvas.create_view_box(root, ClipStrategy::Viewport, "vb2", Some(Color::BLUE)).unwrap();
//! canvas.set_placement(vb1, Placement::Manual(Rect::new(0.0, 0.0, 400.0, 600.0))).unwrap();
//! canvas.set_placement(vb2, Placement::Manual(Rect::new(400.0, 0.0, 800.0, 600.0))).unwrap();
//! canvas.view_box_mut(vb2).unwrap().set_camera(
//!     TurntableCamera::new().with_elevation(30.0).with_azimuth(30.0).with_up(UpAxis::PosY),
//! );
//!
//! // One line, shown in both views.
//! let s1 = canvas.view_box(vb1).unwrap().scene();
//! let s2 = canvas.view_box(vb2).unwrap().scene();
//! let node = canvas.scene_mut().insert(s1, LocalNode::named("line1").with_geometry(line)).unwrap();
//! canvas.scene_mut().add_parent(node, s2).unwrap();
//!
//! let mut renderer = SceneGraphRenderer::default();
//! let stats = renderer.render(&canvas, &mut backend).unwrap();
//! assert_eq!(stats.draw_calls, 2);
//! ```

mod backend;
pub mod camera;
mod canvas;
mod clip;
mod error;
mod pool;
mod renderer;
mod software;
mod viewbox;

pub use backend::{
    Backend, ClipParams, Color, DrawCall, GpuCapabilities, ParseColorError, PixelRect,
    TargetDesc, TargetFormat, TargetId,
};
pub use camera::{
    Camera, CameraInput, PanZoomCamera, ParseNameError, TurntableCamera, UpAxis,
    spherical_to_cartesian,
};
pub use canvas::{Canvas, CanvasEvent, EventSummary, InputEvent, ROOT_NAME, SUBSCENE_NAME};
pub use clip::{ClipHandle, ClipRegion, ClipScope, ClipState, ClipStrategy};
pub use error::{BackendError, DrawCallError, RenderError};
pub use renderer::{DEFAULT_FBO_POOL_CAPACITY, FrameStats, RendererConfig, SceneGraphRenderer};
pub use software::{Primitive, SoftwareBackend};
pub use viewbox::{Placement, ViewBox, ViewBoxId, ViewBoxStyle};
