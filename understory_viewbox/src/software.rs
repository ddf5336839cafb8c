// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A CPU reference [`Backend`].
//!
//! Rasterizes point lists and line strips into RGBA8 surfaces. There is no
//! blending: any non-transparent write replaces the pixel. Pixel centers are not
//! sampled; a vertex lands in the pixel that contains its window coordinate,
//! so content whose coordinates are exact in binary floating point renders
//! identically under every clip strategy.

use glam::{DVec2, DVec3, DVec4};
use understory_scene::GeometryHandle;

use crate::backend::{
    Backend, Color, DrawCall, GpuCapabilities, PixelRect, TargetDesc, TargetId,
};
use crate::error::{BackendError, DrawCallError};

/// Line segments are cut where clip-space `w` falls below this.
const NEAR_W: f64 = 1e-9;

/// How a geometry's vertices are assembled.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Primitive {
    /// Each vertex is one pixel.
    Points,
    /// Consecutive vertices are joined by one-pixel lines.
    #[default]
    LineStrip,
}

#[derive(Clone, Debug)]
struct Mesh {
    positions: Vec<DVec3>,
    color: Color,
    primitive: Primitive,
    fail: bool,
}

#[derive(Clone, Debug)]
struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}

impl Surface {
    fn new(width: u32, height: u32, fill: Color) -> Self {
        Self {
            width,
            height,
            pixels: vec![fill; width as usize * height as usize],
        }
    }

    fn bounds(&self) -> PixelRect {
        PixelRect::from_size(self.width, self.height)
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    fn get(&self, x: u32, y: u32) -> Option<Color> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    fn put(&mut self, x: u32, y: u32, color: Color) {
        if color.a == 0 {
            return;
        }
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    fn fill(&mut self, color: Color) {
        self.pixels.fill(color);
    }
}

/// CPU reference implementation of [`Backend`].
///
/// Geometry is registered up front with [`SoftwareBackend::add_geometry`]; the
/// returned handle goes into [`LocalNode::geometry`](understory_scene::LocalNode::geometry).
/// Successful draw calls of the current frame are recorded for inspection.
#[derive(Clone, Debug)]
pub struct SoftwareBackend {
    capabilities: GpuCapabilities,
    clear: Color,
    surface: Surface,
    viewport: PixelRect,
    bound: Option<TargetId>,
    targets: Vec<Option<Surface>>,
    meshes: Vec<Mesh>,
    calls: Vec<DrawCall>,
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareBackend {
    /// A backend with default capabilities and an empty surface.
    pub fn new() -> Self {
        Self::with_capabilities(GpuCapabilities::default())
    }

    /// A backend reporting `capabilities`.
    ///
    /// Target allocation fails when offscreen targets are reported unsupported.
    pub fn with_capabilities(capabilities: GpuCapabilities) -> Self {
        Self {
            capabilities,
            clear: Color::BLACK,
            surface: Surface::new(0, 0, Color::BLACK),
            viewport: PixelRect::default(),
            bound: None,
            targets: Vec::new(),
            meshes: Vec::new(),
            calls: Vec::new(),
        }
    }

    /// Color the surface is cleared to by [`Backend::begin_frame`].
    pub fn set_clear_color(&mut self, color: Color) {
        self.clear = color;
    }

    /// Register geometry and return its handle.
    pub fn add_geometry(
        &mut self,
        positions: Vec<DVec3>,
        color: Color,
        primitive: Primitive,
    ) -> GeometryHandle {
        self.meshes.push(Mesh {
            positions,
            color,
            primitive,
            fail: false,
        });
        GeometryHandle(self.meshes.len() as u64 - 1)
    }

    /// Make every draw of `geometry` fail, to exercise per-draw error handling.
    pub fn fail_geometry(&mut self, geometry: GeometryHandle) {
        if let Some(mesh) = self.mesh_mut(geometry) {
            mesh.fail = true;
        }
    }

    /// Draw calls accepted since the last [`Backend::begin_frame`].
    pub fn draw_calls(&self) -> &[DrawCall] {
        &self.calls
    }

    /// Surface width.
    pub fn width(&self) -> u32 {
        self.surface.width
    }

    /// Surface height.
    pub fn height(&self) -> u32 {
        self.surface.height
    }

    /// Surface pixels, row-major.
    pub fn pixels(&self) -> &[Color] {
        &self.surface.pixels
    }

    /// One surface pixel, or `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        self.surface.get(x, y)
    }

    /// Number of surface pixels with exactly `color`.
    pub fn count(&self, color: Color) -> usize {
        self.surface.pixels.iter().filter(|p| **p == color).count()
    }

    /// Number of allocated offscreen targets.
    pub fn live_targets(&self) -> usize {
        self.targets.iter().filter(|t| t.is_some()).count()
    }

    /// The currently bound offscreen target.
    pub fn bound_target(&self) -> Option<TargetId> {
        self.bound
    }

    fn mesh_mut(&mut self, geometry: GeometryHandle) -> Option<&mut Mesh> {
        usize::try_from(geometry.0)
            .ok()
            .and_then(|i| self.meshes.get_mut(i))
    }

    fn target_slot(&self, id: TargetId) -> Option<usize> {
        let slot = usize::try_from(id.0).ok()?;
        self.targets.get(slot)?.as_ref().map(|_| slot)
    }

    /// Map a clip-space position (`w > 0`) to window coordinates of the current viewport.
    fn window(&self, clip: DVec4) -> DVec2 {
        let ndc = clip.truncate() / clip.w;
        let vp = self.viewport;
        DVec2::new(
            f64::from(vp.x) + (ndc.x + 1.0) * 0.5 * f64::from(vp.width),
            f64::from(vp.y) + (1.0 - ndc.y) * 0.5 * f64::from(vp.height),
        )
    }
}

/// Cut the part of `a..b` behind the near plane `w = NEAR_W`.
fn clip_near(a: DVec4, b: DVec4) -> Option<(DVec4, DVec4)> {
    if !a.is_finite() || !b.is_finite() {
        return None;
    }
    match (a.w >= NEAR_W, b.w >= NEAR_W) {
        (true, true) => Some((a, b)),
        (false, false) => None,
        (true, false) => Some((a, a.lerp(b, (a.w - NEAR_W) / (a.w - b.w)))),
        (false, true) => Some((b.lerp(a, (b.w - NEAR_W) / (b.w - a.w)), b)),
    }
}

/// Liang-Barsky clip of `a..b` to the box `min..max`.
///
/// Ends already inside the box are returned unchanged.
fn clip_to_box(a: DVec2, b: DVec2, min: DVec2, max: DVec2) -> Option<(DVec2, DVec2)> {
    if !a.is_finite() || !b.is_finite() {
        return None;
    }
    let d = b - a;
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for (p, q) in [
        (-d.x, a.x - min.x),
        (d.x, max.x - a.x),
        (-d.y, a.y - min.y),
        (d.y, max.y - a.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return None;
                }
                t1 = t1.min(r);
            }
        }
    }
    let start = if t0 > 0.0 { a + d * t0 } else { a };
    let end = if t1 < 1.0 { a + d * t1 } else { b };
    Some((start, end))
}

/// The pixel holding window coordinate `p`. Callers keep `p` near a `u32` rect.
fn pixel_of(p: DVec2) -> (i64, i64) {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Callers clip to the scissor box first."
    )]
    (p.x.floor() as i64, p.y.floor() as i64)
}

/// Bresenham line from `a` to `b`, both ends included.
fn line(a: (i64, i64), b: (i64, i64), mut plot: impl FnMut(i64, i64)) {
    let (mut x, mut y) = a;
    let dx = (b.0 - x).abs();
    let dy = -(b.1 - y).abs();
    let sx = if x < b.0 { 1 } else { -1 };
    let sy = if y < b.1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        plot(x, y);
        if (x, y) == b {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

impl Backend for SoftwareBackend {
    fn capabilities(&self) -> GpuCapabilities {
        self.capabilities
    }

    fn begin_frame(&mut self, width: u32, height: u32) {
        if self.surface.width != width || self.surface.height != height {
            self.surface = Surface::new(width, height, self.clear);
        } else {
            self.surface.fill(self.clear);
        }
        self.viewport = PixelRect::from_size(width, height);
        self.bound = None;
        self.calls.clear();
    }

    fn viewport(&self) -> PixelRect {
        self.viewport
    }

    fn set_viewport(&mut self, rect: PixelRect) {
        self.viewport = rect;
    }

    fn draw(&mut self, call: &DrawCall) -> Result<(), DrawCallError> {
        let mesh = usize::try_from(call.geometry.0)
            .ok()
            .and_then(|i| self.meshes.get(i))
            .ok_or_else(|| DrawCallError::new(format!("unknown geometry {}", call.geometry.0)))?;
        if mesh.fail {
            return Err(DrawCallError::new(format!(
                "geometry {} rejected",
                call.geometry.0
            )));
        }
        let target_bounds = match self.bound {
            None => self.surface.bounds(),
            Some(id) => {
                let slot = self
                    .target_slot(id)
                    .ok_or_else(|| DrawCallError::new(format!("unknown target {id}")))?;
                self.targets[slot].as_ref().map(Surface::bounds).unwrap_or_default()
            }
        };
        let mut scissor = self.viewport.intersect(target_bounds);
        if let Some(rect) = call.clip.fragment_rect {
            scissor = scissor.intersect(rect);
        }

        let clip: Vec<DVec4> = mesh
            .positions
            .iter()
            .map(|p| call.transform * p.extend(1.0))
            .collect();
        // One pixel of slack keeps the floor of a cut end outside the scissor.
        let min = DVec2::new(f64::from(scissor.x) - 1.0, f64::from(scissor.y) - 1.0);
        let max = DVec2::new(
            f64::from(scissor.right()) + 1.0,
            f64::from(scissor.bottom()) + 1.0,
        );
        let mut covered = Vec::new();
        let mut plot = |x: i64, y: i64| {
            if scissor.contains(x, y) {
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    reason = "Inside the scissor rect, so within u32."
                )]
                covered.push((x as u32, y as u32));
            }
        };
        let point = |c: DVec4| {
            (c.is_finite() && c.w > 0.0)
                .then(|| self.window(c))
                .filter(|p| p.cmpge(min).all() && p.cmple(max).all())
                .map(pixel_of)
        };
        match (mesh.primitive, clip.as_slice()) {
            _ if scissor.is_empty() => {}
            (Primitive::Points, _) | (Primitive::LineStrip, [_]) => {
                for (x, y) in clip.iter().filter_map(|c| point(*c)) {
                    plot(x, y);
                }
            }
            (Primitive::LineStrip, _) => {
                for pair in clip.windows(2) {
                    let Some((a, b)) = clip_near(pair[0], pair[1]) else {
                        continue;
                    };
                    if let Some((a, b)) = clip_to_box(self.window(a), self.window(b), min, max) {
                        line(pixel_of(a), pixel_of(b), &mut plot);
                    }
                }
            }
        }

        let color = mesh.color;
        let surface = match self.bound {
            None => &mut self.surface,
            Some(id) => match self.target_slot(id).and_then(|s| self.targets[s].as_mut()) {
                Some(t) => t,
                None => return Err(DrawCallError::new(format!("unknown target {id}"))),
            },
        };
        for (x, y) in covered {
            surface.put(x, y, color);
        }
        self.calls.push(call.clone());
        Ok(())
    }

    fn allocate_target(&mut self, desc: TargetDesc) -> Result<TargetId, BackendError> {
        let max = self.capabilities.max_viewport_dims;
        if !self.capabilities.fbo_supported
            || desc.width == 0
            || desc.height == 0
            || desc.width > max.0
            || desc.height > max.1
        {
            return Err(BackendError::TargetAllocation {
                width: desc.width,
                height: desc.height,
            });
        }
        let surface = Surface::new(desc.width, desc.height, Color::TRANSPARENT);
        let slot = match self.targets.iter().position(Option::is_none) {
            Some(slot) => {
                self.targets[slot] = Some(surface);
                slot
            }
            None => {
                self.targets.push(Some(surface));
                self.targets.len() - 1
            }
        };
        Ok(TargetId(slot as u64))
    }

    fn release_target(&mut self, target: TargetId) {
        if let Some(slot) = self.target_slot(target) {
            self.targets[slot] = None;
        }
        if self.bound == Some(target) {
            self.bound = None;
        }
    }

    fn bind_target(&mut self, target: Option<TargetId>) {
        if let Some(surface) = target
            .and_then(|id| self.target_slot(id))
            .and_then(|slot| self.targets[slot].as_mut())
        {
            surface.fill(Color::TRANSPARENT);
        }
        self.bound = target;
    }

    fn composite(&mut self, target: TargetId, dest: PixelRect) -> Result<(), BackendError> {
        let slot = self
            .target_slot(target)
            .ok_or(BackendError::UnknownTarget(target))?;
        let Some(source) = self.targets[slot].as_ref() else {
            return Err(BackendError::UnknownTarget(target));
        };
        let w = dest.width.min(source.width);
        let h = dest.height.min(source.height);
        for y in 0..h {
            for x in 0..w {
                if let Some(c) = source.get(x, y) {
                    self.surface.put(dest.x + x, dest.y + y, c);
                }
            }
        }
        Ok(())
    }

    fn stroke_rect(
        &mut self,
        rect: PixelRect,
        color: Color,
        width: u32,
    ) -> Result<(), DrawCallError> {
        let surface = match self.bound {
            None => &mut self.surface,
            Some(id) => match self.target_slot(id).and_then(|s| self.targets[s].as_mut()) {
                Some(t) => t,
                None => return Err(DrawCallError::new(format!("unknown target {id}"))),
            },
        };
        if rect.is_empty() || width == 0 {
            return Ok(());
        }
        let w = width.min(rect.width).min(rect.height);
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                let edge = x < rect.x + w
                    || y < rect.y + w
                    || x >= rect.right() - w
                    || y >= rect.bottom() - w;
                if edge {
                    surface.put(x, y, color);
                }
            }
        }
        Ok(())
    }
}
