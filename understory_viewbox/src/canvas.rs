// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The canvas: scene graph owner, view box registry, layout and event queue.

use std::collections::VecDeque;

use kurbo::{Point, Rect, Size};
use understory_scene::{LocalNode, NodeId, Scene};

use crate::backend::{Backend, Color, PixelRect};
use crate::camera::{Camera, CameraInput};
use crate::clip::ClipStrategy;
use crate::error::RenderError;
use crate::renderer::{FrameStats, SceneGraphRenderer};
use crate::viewbox::{Placement, ViewBox, ViewBoxId, ViewBoxStyle};

/// Name of the canvas root node.
pub const ROOT_NAME: &str = "canvas";

/// Name given to the content root of every view box.
pub const SUBSCENE_NAME: &str = "subscene";

/// Pointer and wheel input in canvas pixels (y down).
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum InputEvent {
    /// A button went down. Captures the view box under the pointer.
    PointerDown {
        /// Pointer position.
        position: Point,
    },
    /// The pointer moved. Drags the captured view box's camera.
    PointerMove {
        /// Pointer position.
        position: Point,
    },
    /// The button was released. Ends the capture.
    PointerUp {
        /// Pointer position.
        position: Point,
    },
    /// Wheel input. Zooms the captured view box, or the one under the pointer.
    Scroll {
        /// Pointer position.
        position: Point,
        /// Notches; positive zooms in.
        delta: f64,
    },
}

/// Events consumed by [`Canvas::process_events`], applied in arrival order.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum CanvasEvent {
    /// The surface changed size.
    Resize {
        /// New width in pixels.
        width: f64,
        /// New height in pixels.
        height: f64,
    },
    /// Render one frame.
    FrameTick,
    /// User input.
    Input(InputEvent),
    /// Tear down. Later events are dropped.
    Destroy,
}

/// What one [`Canvas::process_events`] call did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventSummary {
    /// Events applied.
    pub processed: usize,
    /// Frames rendered.
    pub frames: usize,
    /// Statistics of the last rendered frame.
    pub last_frame: Option<FrameStats>,
    /// True if a destroy request was applied.
    pub destroyed: bool,
}

/// Owns the scene graph and the view boxes laid out on it.
///
/// View boxes are kept in registration order, which is also their paint order:
/// where rectangles overlap, the later view box draws on top and receives the
/// pointer.
#[derive(Debug)]
pub struct Canvas {
    scene: Scene,
    size: Size,
    view_boxes: Vec<ViewBox>,
    next_id: u32,
    queue: VecDeque<CanvasEvent>,
    // Captured view box and the last pointer position seen by it.
    capture: Option<(ViewBoxId, Point)>,
    destroyed: bool,
}

impl Canvas {
    /// A canvas of `size` pixels with an empty scene rooted at [`ROOT_NAME`].
    pub fn new(size: impl Into<Size>) -> Self {
        Self {
            scene: Scene::with_root(LocalNode::named(ROOT_NAME)),
            size: size.into(),
            view_boxes: Vec::new(),
            next_id: 0,
            queue: VecDeque::new(),
            capture: None,
            destroyed: false,
        }
    }

    /// The scene graph.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Mutable access to the scene graph, for adding and editing content.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// The canvas root node.
    pub fn root(&self) -> NodeId {
        self.scene.root()
    }

    /// Logical size.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Size snapped to whole pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        let r = PixelRect::from_rect(self.size.to_rect());
        (r.width, r.height)
    }

    /// See [`Scene::describe_tree`].
    pub fn describe_tree(&self, with_transform: bool) -> String {
        self.scene.describe_tree(with_transform)
    }

    /// Create a view box under `parent` and return its handle.
    ///
    /// When `parent` is the content root of another view box, the new one is
    /// laid out inside that view box and clipped to it. The new view box fills
    /// its layout area until [`Canvas::set_placement`] says otherwise.
    pub fn create_view_box(
        &mut self,
        parent: NodeId,
        clip: ClipStrategy,
        name: &str,
        border_color: Option<Color>,
    ) -> Result<ViewBoxId, RenderError> {
        let node = self.scene.insert(parent, LocalNode::named(name))?;
        let scene = self.scene.insert(node, LocalNode::named(SUBSCENE_NAME))?;
        let layout_parent = self
            .view_boxes
            .iter()
            .find(|vb| vb.scene == parent || vb.node == parent)
            .map(|vb| vb.id);
        let area = self.layout_area(layout_parent);
        let id = ViewBoxId(self.next_id);
        self.next_id += 1;
        self.view_boxes.push(ViewBox {
            id,
            name: name.to_string(),
            node,
            scene,
            camera: Camera::default(),
            clip,
            style: ViewBoxStyle {
                border_color,
                ..ViewBoxStyle::default()
            },
            placement: Placement::Fill,
            rect: area,
            layout_parent,
        });
        log::debug!("created {id} \"{name}\" ({clip} clip) at {area:?}");
        Ok(id)
    }

    /// Remove a view box and its nodes.
    ///
    /// Content shared with other view boxes stays alive through its other
    /// parents. View boxes nested inside the removed one are removed as well.
    pub fn remove_view_box(&mut self, id: ViewBoxId) -> Result<(), RenderError> {
        let vb = self.view_box(id).ok_or(RenderError::UnknownViewBox(id))?;
        let node = vb.node;
        self.scene.remove(node)?;
        let scene = &self.scene;
        self.view_boxes
            .retain(|vb| vb.id != id && scene.is_alive(vb.node));
        let live: Vec<ViewBoxId> = self.view_boxes.iter().map(|vb| vb.id).collect();
        for vb in &mut self.view_boxes {
            if vb.layout_parent.is_some_and(|p| !live.contains(&p)) {
                vb.layout_parent = None;
            }
        }
        if self.capture.is_some_and(|(c, _)| !live.contains(&c)) {
            self.capture = None;
        }
        self.layout();
        Ok(())
    }

    /// A registered view box.
    pub fn view_box(&self, id: ViewBoxId) -> Option<&ViewBox> {
        self.view_boxes.iter().find(|vb| vb.id == id)
    }

    /// Mutable access to a registered view box.
    pub fn view_box_mut(&mut self, id: ViewBoxId) -> Option<&mut ViewBox> {
        self.view_boxes.iter_mut().find(|vb| vb.id == id)
    }

    /// All view boxes in registration order.
    pub fn view_boxes(&self) -> &[ViewBox] {
        &self.view_boxes
    }

    /// The view box whose layout node is `node`.
    pub fn view_box_for_node(&self, node: NodeId) -> Option<&ViewBox> {
        self.view_boxes.iter().find(|vb| vb.node == node)
    }

    /// Change where a view box is placed and lay out again.
    pub fn set_placement(
        &mut self,
        id: ViewBoxId,
        placement: Placement,
    ) -> Result<(), RenderError> {
        let vb = self
            .view_box_mut(id)
            .ok_or(RenderError::UnknownViewBox(id))?;
        vb.placement = placement;
        self.layout();
        Ok(())
    }

    /// Change the canvas size. Auto-laid-out view boxes follow, manual ones stay.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.size = Size::new(width.max(0.0), height.max(0.0));
        self.layout();
        log::debug!("canvas resized to {}x{}", self.size.width, self.size.height);
    }

    /// Visible rectangle of a view box: its own rectangle clipped by the
    /// canvas and by every enclosing view box.
    pub fn clip_rect(&self, id: ViewBoxId) -> Option<PixelRect> {
        let (w, h) = self.pixel_size();
        let mut visible = PixelRect::from_size(w, h);
        let mut current = self.view_box(id)?;
        loop {
            visible = PixelRect::from_rect(current.rect).intersect(visible);
            match current.layout_parent.and_then(|p| self.view_box(p)) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Some(visible)
    }

    /// The topmost view box whose visible rectangle contains `point`.
    pub fn view_box_at(&self, point: Point) -> Option<ViewBoxId> {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Saturating casts; out of range points hit nothing."
        )]
        let (x, y) = (point.x.floor() as i64, point.y.floor() as i64);
        self.view_boxes
            .iter()
            .rev()
            .filter(|vb| self.is_shown(vb))
            .find(|vb| self.clip_rect(vb.id).is_some_and(|r| r.contains(x, y)))
            .map(|vb| vb.id)
    }

    /// Pickable nodes of the view box under `point`, topmost first.
    pub fn pick(&self, point: Point) -> Vec<NodeId> {
        self.view_box_at(point)
            .and_then(|id| self.view_box(id))
            .and_then(|vb| self.scene.pick_order(vb.scene).ok())
            .unwrap_or_default()
    }

    /// Queue an event for [`Canvas::process_events`].
    pub fn post(&mut self, event: CanvasEvent) {
        if self.destroyed {
            log::debug!("dropping {event:?} posted after destroy");
            return;
        }
        self.queue.push_back(event);
    }

    /// Number of queued events.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Apply queued events in order. A frame tick renders synchronously, so
    /// resizes and teardown are never applied during a traversal.
    ///
    /// A render error stops processing; the remaining events stay queued.
    pub fn process_events<B: Backend + ?Sized>(
        &mut self,
        renderer: &mut SceneGraphRenderer,
        backend: &mut B,
    ) -> Result<EventSummary, RenderError> {
        let mut summary = EventSummary::default();
        while let Some(event) = self.queue.pop_front() {
            summary.processed += 1;
            match event {
                CanvasEvent::Resize { width, height } => self.resize(width, height),
                CanvasEvent::FrameTick => {
                    let stats = renderer.render(self, backend)?;
                    summary.frames += 1;
                    summary.last_frame = Some(stats);
                }
                CanvasEvent::Input(input) => {
                    self.handle_input(&input);
                }
                CanvasEvent::Destroy => {
                    self.destroy(renderer, backend);
                    summary.destroyed = true;
                }
            }
        }
        Ok(summary)
    }

    /// Route input to a view box camera. Returns the view box that consumed it.
    pub fn handle_input(&mut self, input: &InputEvent) -> Option<ViewBoxId> {
        match *input {
            InputEvent::PointerDown { position } => {
                let target = self.view_box_at(position);
                self.capture = target.map(|id| (id, position));
                target
            }
            InputEvent::PointerMove { position } => {
                let (id, last) = self.capture?;
                self.capture = Some((id, position));
                let vb = self.view_box_mut(id)?;
                let viewport = vb.rect.size();
                vb.camera.handle_input(
                    &CameraInput::Drag {
                        delta: position - last,
                    },
                    viewport,
                );
                Some(id)
            }
            InputEvent::PointerUp { .. } => self.capture.take().map(|(id, _)| id),
            InputEvent::Scroll { position, delta } => {
                let id = self
                    .capture
                    .map(|(id, _)| id)
                    .or_else(|| self.view_box_at(position))?;
                let vb = self.view_box_mut(id)?;
                let anchor = (position - vb.rect.origin()).to_point();
                let viewport = vb.rect.size();
                vb.camera
                    .handle_input(&CameraInput::Zoom { delta, anchor }, viewport);
                Some(id)
            }
        }
    }

    /// The view box holding the pointer capture.
    pub fn captured(&self) -> Option<ViewBoxId> {
        self.capture.map(|(id, _)| id)
    }

    /// Release renderer resources and stop accepting events.
    pub fn destroy<B: Backend + ?Sized>(
        &mut self,
        renderer: &mut SceneGraphRenderer,
        backend: &mut B,
    ) {
        renderer.release_resources(backend);
        self.queue.clear();
        self.capture = None;
        self.destroyed = true;
        log::debug!("canvas destroyed");
    }

    /// True once [`Canvas::destroy`] ran.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// True if the view box's layout node is reached from the canvas root
    /// through visible nodes only.
    pub(crate) fn is_shown(&self, vb: &ViewBox) -> bool {
        self.scene.is_visible_from(self.scene.root(), vb.node)
    }

    fn layout_area(&self, parent: Option<ViewBoxId>) -> Rect {
        parent
            .and_then(|p| self.view_box(p))
            .map_or(self.size.to_rect(), |vb| vb.rect)
    }

    // Parents are registered before the view boxes nested in them, so one
    // pass in registration order sees every layout area already updated.
    fn layout(&mut self) {
        for i in 0..self.view_boxes.len() {
            let area = self.view_boxes[i]
                .layout_parent
                .and_then(|p| self.view_boxes[..i].iter().find(|vb| vb.id == p))
                .map_or(self.size.to_rect(), |vb| vb.rect);
            let vb = &mut self.view_boxes[i];
            vb.rect = vb.placement.resolve(area);
        }
    }
}
