// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame traversal: one clipped, projected pass per view box.

use glam::DMat4;
use understory_scene::{NodeFlags, NodeId, VisitControl};

use crate::backend::{Backend, ClipParams, DrawCall, PixelRect};
use crate::canvas::Canvas;
use crate::clip::{ClipRegion, ClipState, ClipStrategy};
use crate::error::RenderError;

/// Idle offscreen targets kept by default.
pub const DEFAULT_FBO_POOL_CAPACITY: usize = 4;

/// Renderer settings.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RendererConfig {
    /// Idle offscreen targets kept for reuse across frames.
    pub fbo_pool_capacity: usize,
    /// Stroke view box borders after their content.
    pub draw_borders: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            fbo_pool_capacity: DEFAULT_FBO_POOL_CAPACITY,
            draw_borders: true,
        }
    }
}

/// Counters for one rendered frame.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Clip passes run, the root content pass included.
    pub passes: usize,
    /// Draw calls the backend accepted.
    pub draw_calls: usize,
    /// Draw calls the backend rejected; their nodes were skipped.
    pub failed_draws: usize,
    /// View boxes drawn with a cheaper clip strategy than requested.
    pub fallbacks: usize,
    /// View boxes skipped because they are hidden or lie outside the canvas.
    pub culled: usize,
}

/// Draws a [`Canvas`] through a [`Backend`].
///
/// Each frame first draws content attached to the canvas outside any view box
/// with an identity projection. Then every view box, in registration order,
/// gets its own pass: its visible rectangle is bound with its clip strategy,
/// its subtree is traversed depth-first with the camera supplying the subtree
/// root frame, and one draw call is issued per geometry node per path. Nested
/// view boxes are skipped during their parent's pass and drawn in their own.
#[derive(Debug, Default)]
pub struct SceneGraphRenderer {
    config: RendererConfig,
    clip: ClipState,
    last_frame: Option<FrameStats>,
}

impl SceneGraphRenderer {
    /// Create a renderer.
    pub fn new(config: RendererConfig) -> Self {
        Self {
            config,
            clip: ClipState::new(config.fbo_pool_capacity),
            last_frame: None,
        }
    }

    /// Settings.
    pub fn config(&self) -> RendererConfig {
        self.config
    }

    /// Replace the settings.
    pub fn set_config(&mut self, config: RendererConfig) {
        self.config = config;
        self.clip.set_pool_capacity(config.fbo_pool_capacity);
    }

    /// Clip state shared by all passes.
    pub fn clip_state(&self) -> &ClipState {
        &self.clip
    }

    /// Mutable clip state, for recovering from a leak with [`ClipState::reset`].
    pub fn clip_state_mut(&mut self) -> &mut ClipState {
        &mut self.clip
    }

    /// Statistics of the last completed frame.
    pub fn last_frame(&self) -> Option<FrameStats> {
        self.last_frame
    }

    /// Render one frame.
    ///
    /// Draw failures skip the failing node. A clip state leak aborts the frame
    /// and is returned.
    pub fn render<B: Backend + ?Sized>(
        &mut self,
        canvas: &Canvas,
        backend: &mut B,
    ) -> Result<FrameStats, RenderError> {
        let (width, height) = canvas.pixel_size();
        backend.begin_frame(width, height);
        let capabilities = backend.capabilities();
        let view_box_nodes: Vec<NodeId> = canvas.view_boxes().iter().map(|vb| vb.node()).collect();
        let mut stats = FrameStats::default();

        let full = ClipRegion::new(PixelRect::from_size(width, height), width, height);
        self.pass(
            canvas,
            backend,
            canvas.root(),
            DMat4::IDENTITY,
            ClipStrategy::Fragment,
            full,
            &view_box_nodes,
            &mut stats,
        )
        .inspect_err(|err| log::error!("frame aborted: {err}"))?;

        for vb in canvas.view_boxes() {
            if !canvas.scene().is_alive(vb.scene()) {
                continue;
            }
            if !canvas.is_shown(vb) {
                log::trace!("{} \"{}\" is hidden", vb.id(), vb.name());
                stats.culled += 1;
                continue;
            }
            let Some(rect) = canvas.clip_rect(vb.id()) else {
                continue;
            };
            if rect.is_empty() {
                log::trace!("{} \"{}\" is not visible", vb.id(), vb.name());
                stats.culled += 1;
                continue;
            }
            let region = ClipRegion::new(rect, width, height);
            let strategy = vb.clip().resolve(&capabilities, &region);
            if strategy != vb.clip() {
                stats.fallbacks += 1;
            }
            let projection = vb.camera().project(rect.aspect());
            self.pass(
                canvas,
                backend,
                vb.scene(),
                projection,
                strategy,
                region,
                &view_box_nodes,
                &mut stats,
            )
            .inspect_err(|err| log::error!("frame aborted in \"{}\": {err}", vb.name()))?;

            let style = vb.style();
            if let (true, Some(color)) = (self.config.draw_borders, style.border_color) {
                if let Err(err) = backend.stroke_rect(rect, color, style.border_width) {
                    log::warn!("border of \"{}\" skipped: {err}", vb.name());
                }
            }
        }

        backend.end_frame();
        log::debug!(
            "frame {width}x{height}: {} passes, {} draws, {} failed, {} fallbacks",
            stats.passes,
            stats.draw_calls,
            stats.failed_draws,
            stats.fallbacks
        );
        self.last_frame = Some(stats);
        Ok(stats)
    }

    /// Free pooled offscreen targets.
    pub fn release_resources<B: Backend + ?Sized>(&mut self, backend: &mut B) {
        self.clip.release_resources(backend);
    }

    fn pass<B: Backend + ?Sized>(
        &mut self,
        canvas: &Canvas,
        backend: &mut B,
        root: NodeId,
        projection: DMat4,
        strategy: ClipStrategy,
        region: ClipRegion,
        view_box_nodes: &[NodeId],
        stats: &mut FrameStats,
    ) -> Result<(), RenderError> {
        let mut scope = self.clip.scope(backend, strategy, region)?;
        stats.passes += 1;
        canvas.scene().visit(root, |v| {
            if v.depth > 0 && view_box_nodes.contains(&v.node) {
                return VisitControl::SkipChildren;
            }
            if !v.local.flags.contains(NodeFlags::VISIBLE) {
                return VisitControl::SkipChildren;
            }
            if let Some(geometry) = v.local.geometry {
                let call = DrawCall {
                    node: v.node,
                    geometry,
                    transform: projection * v.transform,
                    clip: ClipParams::default(),
                };
                match scope.draw(call) {
                    Ok(()) => stats.draw_calls += 1,
                    Err(err) => {
                        log::warn!("skipping node {}: {err}", v.node);
                        stats.failed_draws += 1;
                    }
                }
            }
            VisitControl::Continue
        })?;
        scope.release()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Color, GpuCapabilities};
    use crate::camera::{PanZoomCamera, TurntableCamera};
    use crate::software::{Primitive, SoftwareBackend};
    use crate::viewbox::{Placement, ViewBoxId};
    use glam::{DVec2, DVec3};
    use kurbo::Rect;
    use understory_scene::LocalNode;

    fn unit_box() -> Vec<DVec3> {
        vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(0.0, 0.5, 0.0),
            DVec3::new(0.5, 0.5, 0.0),
            DVec3::new(0.5, 0.0, 0.0),
            DVec3::new(0.0, 0.0, 0.0),
        ]
    }

    /// Two side-by-side manual view boxes sharing one line.
    fn shared_scene(backend: &mut SoftwareBackend) -> (Canvas, ViewBoxId, ViewBoxId, NodeId) {
        let mut canvas = Canvas::new((64.0, 32.0));
        let root = canvas.root();
        let vb1 = canvas
            .create_view_box(root, ClipStrategy::Fragment, "vb1", Some(Color::YELLOW))
            .unwrap();
        let vb2 = canvas
            .create_view_box(root, ClipStrategy::Viewport, "vb2", Some(Color::BLUE))
            .unwrap();
        canvas
            .set_placement(vb1, Placement::Manual(Rect::new(0.0, 0.0, 32.0, 32.0)))
            .unwrap();
        canvas
            .set_placement(vb2, Placement::Manual(Rect::new(32.0, 0.0, 64.0, 32.0)))
            .unwrap();
        let g = backend.add_geometry(
            vec![DVec3::new(-1.0, 0.0, 0.0), DVec3::new(1.0, 0.0, 0.0)],
            Color::WHITE,
            Primitive::LineStrip,
        );
        let s1 = canvas.view_box(vb1).unwrap().scene();
        let s2 = canvas.view_box(vb2).unwrap().scene();
        let line = canvas
            .scene_mut()
            .insert(s1, LocalNode::named("line1").with_geometry(g))
            .unwrap();
        canvas.scene_mut().add_parent(line, s2).unwrap();
        (canvas, vb1, vb2, line)
    }

    #[test]
    fn shared_geometry_is_drawn_once_per_view_box() {
        let mut backend = SoftwareBackend::new();
        let (mut canvas, _, vb2, line) = shared_scene(&mut backend);
        canvas
            .view_box_mut(vb2)
            .unwrap()
            .set_camera(PanZoomCamera::new().with_zoom(0.5));
        let mut renderer = SceneGraphRenderer::default();
        let stats = renderer.render(&canvas, &mut backend).unwrap();

        assert_eq!(stats.passes, 3);
        assert_eq!(stats.draw_calls, 2);
        let calls = backend.draw_calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c.node == line));
        assert_ne!(calls[0].transform, calls[1].transform);
        assert_eq!(calls[0].clip.fragment_rect, Some(PixelRect::new(0, 0, 32, 32)));
        assert_eq!(calls[1].clip.fragment_rect, None);
    }

    fn locals(canvas: &Canvas, ids: &[NodeId]) -> Vec<DMat4> {
        ids.iter()
            .map(|id| canvas.scene().local(*id).unwrap().transform)
            .collect()
    }

    #[test]
    fn rendering_leaves_local_transforms_untouched() {
        let mut backend = SoftwareBackend::new();
        let (mut canvas, vb1, vb2, line) = shared_scene(&mut backend);
        let local = DMat4::from_scale(DVec3::new(0.5, 0.5, 1.0));
        canvas.scene_mut().set_local_transform(line, local);
        canvas
            .view_box_mut(vb2)
            .unwrap()
            .set_camera(TurntableCamera::new());
        let mut ids = vec![canvas.root(), line];
        for id in [vb1, vb2] {
            let vb = canvas.view_box(id).unwrap();
            ids.extend([vb.node(), vb.scene()]);
        }
        let before = locals(&canvas, &ids);

        let mut renderer = SceneGraphRenderer::default();
        renderer.render(&canvas, &mut backend).unwrap();
        renderer.render(&canvas, &mut backend).unwrap();

        assert_eq!(canvas.scene().local(line).unwrap().transform, local);
        assert_eq!(locals(&canvas, &ids), before);
    }

    fn render_with(strategy: ClipStrategy) -> (Vec<Color>, FrameStats) {
        let mut backend = SoftwareBackend::new();
        let boxes = backend.add_geometry(unit_box(), Color::RED, Primitive::LineStrip);
        let wide = backend.add_geometry(
            vec![DVec3::new(-4.0, -0.25, 0.0), DVec3::new(4.0, 0.75, 0.0)],
            Color::GREEN,
            Primitive::LineStrip,
        );
        let dots = backend.add_geometry(
            vec![
                DVec3::new(-0.25, 0.75, 0.0),
                DVec3::new(0.5, 0.0, 0.0),
                DVec3::new(0.75, 0.25, 0.0),
            ],
            Color::WHITE,
            Primitive::Points,
        );

        let mut canvas = Canvas::new((64.0, 64.0));
        let root = canvas.root();
        let vb = canvas
            .create_view_box(root, strategy, "vb", Some(Color::YELLOW))
            .unwrap();
        canvas
            .set_placement(vb, Placement::Manual(Rect::new(16.0, 16.0, 48.0, 48.0)))
            .unwrap();
        canvas.view_box_mut(vb).unwrap().set_camera(
            PanZoomCamera::new()
                .with_zoom(2.0)
                .with_center(DVec2::new(0.25, 0.25)),
        );
        let scene = canvas.view_box(vb).unwrap().scene();
        let s = canvas.scene_mut();
        let shifted = s
            .insert(
                scene,
                LocalNode::named("shifted")
                    .with_transform(DMat4::from_translation(DVec3::new(-0.25, 0.0, 0.0))),
            )
            .unwrap();
        s.insert(shifted, LocalNode::named("unit box").with_geometry(boxes))
            .unwrap();
        s.insert(scene, LocalNode::named("wide").with_geometry(wide))
            .unwrap();
        s.insert(scene, LocalNode::named("dots").with_geometry(dots))
            .unwrap();

        let mut renderer = SceneGraphRenderer::default();
        let stats = renderer.render(&canvas, &mut backend).unwrap();
        (backend.pixels().to_vec(), stats)
    }

    #[test]
    fn clip_strategies_produce_identical_pixels() {
        let (fragment, fs) = render_with(ClipStrategy::Fragment);
        let (viewport, vs) = render_with(ClipStrategy::Viewport);
        let (fbo, bs) = render_with(ClipStrategy::FBO);
        assert_eq!(fs.draw_calls, 3);
        assert_eq!(vs.draw_calls, 3);
        assert_eq!(bs.draw_calls, 3);
        for color in [Color::RED, Color::GREEN, Color::WHITE] {
            assert!(fragment.contains(&color), "{color:?} drawn");
        }
        assert!(fragment == viewport, "fragment and viewport differ");
        assert!(fragment == fbo, "fragment and fbo differ");

        // Nothing leaks outside the view box rectangle.
        for (i, c) in fragment.iter().enumerate() {
            let (x, y) = (i % 64, i / 64);
            if !(16..48).contains(&x) || !(16..48).contains(&y) {
                assert_eq!(*c, Color::BLACK, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn viewport_leak_aborts_the_frame() {
        let mut backend = SoftwareBackend::new();
        let (canvas, ..) = shared_scene(&mut backend);
        let mut renderer = SceneGraphRenderer::default();
        backend.begin_frame(64, 32);
        let leaked = renderer
            .clip_state_mut()
            .scope(
                &mut backend,
                ClipStrategy::Viewport,
                ClipRegion::new(PixelRect::new(0, 0, 8, 8), 64, 32),
            )
            .unwrap();
        core::mem::forget(leaked);

        assert_eq!(
            renderer.render(&canvas, &mut backend),
            Err(RenderError::ClipStateLeak {
                strategy: ClipStrategy::Viewport
            })
        );
        assert_eq!(renderer.last_frame(), None);

        renderer.clip_state_mut().reset();
        assert!(renderer.render(&canvas, &mut backend).is_ok());
    }

    #[test]
    fn failed_draw_skips_only_that_node() {
        let mut backend = SoftwareBackend::new();
        let (mut canvas, vb1, _, _) = shared_scene(&mut backend);
        let bad = backend.add_geometry(vec![DVec3::ZERO], Color::RED, Primitive::Points);
        backend.fail_geometry(bad);
        let s1 = canvas.view_box(vb1).unwrap().scene();
        canvas
            .scene_mut()
            .insert(s1, LocalNode::named("bad").with_geometry(bad))
            .unwrap();
        let mut renderer = SceneGraphRenderer::default();
        let stats = renderer.render(&canvas, &mut backend).unwrap();
        assert_eq!(stats.failed_draws, 1);
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(backend.count(Color::RED), 0);
        assert!(backend.count(Color::WHITE) > 0);
    }

    #[test]
    fn unsupported_fbo_falls_back_to_fragment() {
        let caps = GpuCapabilities {
            fbo_supported: false,
            ..GpuCapabilities::default()
        };
        let mut backend = SoftwareBackend::with_capabilities(caps);
        let (mut canvas, vb1, vb2, _) = shared_scene(&mut backend);
        canvas.view_box_mut(vb1).unwrap().set_clip(ClipStrategy::FBO);
        canvas.view_box_mut(vb2).unwrap().set_clip(ClipStrategy::FBO);
        let mut renderer = SceneGraphRenderer::default();
        let stats = renderer.render(&canvas, &mut backend).unwrap();
        assert_eq!(stats.fallbacks, 2);
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(backend.live_targets(), 0);
    }

    #[test]
    fn fbo_targets_are_reused_across_frames_and_released() {
        let mut backend = SoftwareBackend::new();
        let (mut canvas, vb1, _, _) = shared_scene(&mut backend);
        canvas.view_box_mut(vb1).unwrap().set_clip(ClipStrategy::FBO);
        let mut renderer = SceneGraphRenderer::default();
        for _ in 0..3 {
            renderer.render(&canvas, &mut backend).unwrap();
        }
        assert_eq!(backend.live_targets(), 1);
        assert_eq!(renderer.clip_state().pooled_targets(), 1);
        renderer.release_resources(&mut backend);
        assert_eq!(backend.live_targets(), 0);
    }

    #[test]
    fn root_content_and_nested_view_boxes_get_their_own_passes() {
        let mut backend = SoftwareBackend::new();
        let dot = backend.add_geometry(vec![DVec3::ZERO], Color::WHITE, Primitive::Points);
        let mut canvas = Canvas::new((32.0, 32.0));
        let root = canvas.root();
        canvas
            .scene_mut()
            .insert(root, LocalNode::named("overlay").with_geometry(dot))
            .unwrap();
        let outer = canvas
            .create_view_box(root, ClipStrategy::Viewport, "outer", None)
            .unwrap();
        let outer_scene = canvas.view_box(outer).unwrap().scene();
        let inner = canvas
            .create_view_box(outer_scene, ClipStrategy::Fragment, "inner", None)
            .unwrap();
        canvas
            .set_placement(inner, Placement::Fraction(Rect::new(0.0, 0.0, 0.5, 0.5)))
            .unwrap();
        let inner_scene = canvas.view_box(inner).unwrap().scene();
        canvas
            .scene_mut()
            .insert(inner_scene, LocalNode::named("inner dot").with_geometry(dot))
            .unwrap();

        let mut renderer = SceneGraphRenderer::default();
        let stats = renderer.render(&canvas, &mut backend).unwrap();
        assert_eq!(stats.passes, 3);
        assert_eq!(stats.draw_calls, 2);
        // The overlay at the canvas center and the inner dot at the center of the top-left quarter.
        assert_eq!(backend.pixel(16, 16), Some(Color::WHITE));
        assert_eq!(backend.pixel(8, 8), Some(Color::WHITE));
        assert_eq!(backend.count(Color::WHITE), 2);

        let inner_node = canvas.view_box(inner).unwrap().node();
        canvas.scene_mut().set_visible(inner_node, false);
        let stats = renderer.render(&canvas, &mut backend).unwrap();
        assert_eq!(stats.passes, 2);
        assert_eq!(backend.count(Color::WHITE), 1);
    }

    #[test]
    fn hidden_ancestors_hide_nested_view_boxes() {
        let mut backend = SoftwareBackend::new();
        let dot = backend.add_geometry(vec![DVec3::ZERO], Color::WHITE, Primitive::Points);
        let mut canvas = Canvas::new((32.0, 32.0));
        let root = canvas.root();
        let group = canvas
            .scene_mut()
            .insert(root, LocalNode::named("group"))
            .unwrap();
        let outer = canvas
            .create_view_box(group, ClipStrategy::Viewport, "outer", None)
            .unwrap();
        let outer_scene = canvas.view_box(outer).unwrap().scene();
        let inner = canvas
            .create_view_box(outer_scene, ClipStrategy::Fragment, "inner", None)
            .unwrap();
        let inner_scene = canvas.view_box(inner).unwrap().scene();
        canvas
            .scene_mut()
            .insert(inner_scene, LocalNode::named("dot").with_geometry(dot))
            .unwrap();

        let mut renderer = SceneGraphRenderer::default();
        let stats = renderer.render(&canvas, &mut backend).unwrap();
        assert_eq!(stats.draw_calls, 1);
        assert_eq!(stats.culled, 0);

        let outer_node = canvas.view_box(outer).unwrap().node();
        canvas.scene_mut().set_visible(outer_node, false);
        let stats = renderer.render(&canvas, &mut backend).unwrap();
        assert_eq!(stats.passes, 1, "root pass only");
        assert_eq!(stats.draw_calls, 0);
        assert_eq!(stats.culled, 2);
        assert_eq!(backend.count(Color::WHITE), 0);

        canvas.scene_mut().set_visible(outer_node, true);
        canvas.scene_mut().set_visible(group, false);
        let stats = renderer.render(&canvas, &mut backend).unwrap();
        assert_eq!(stats.draw_calls, 0);
        assert_eq!(stats.culled, 2);
    }

    #[test]
    fn borders_are_stroked_after_content() {
        let mut backend = SoftwareBackend::new();
        let (canvas, ..) = shared_scene(&mut backend);
        let mut renderer = SceneGraphRenderer::default();
        renderer.render(&canvas, &mut backend).unwrap();
        assert_eq!(backend.pixel(0, 0), Some(Color::YELLOW));
        assert_eq!(backend.pixel(0, 16), Some(Color::YELLOW));
        assert_eq!(backend.pixel(32, 0), Some(Color::BLUE));

        renderer.set_config(RendererConfig {
            draw_borders: false,
            ..RendererConfig::default()
        });
        renderer.render(&canvas, &mut backend).unwrap();
        assert_eq!(backend.count(Color::YELLOW), 0);
        assert_eq!(backend.pixel(0, 16), Some(Color::WHITE));
    }
}
