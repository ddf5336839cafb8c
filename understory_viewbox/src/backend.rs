// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The seam to the drawing backend: draw calls, rasterizer state, offscreen targets.
//!
//! The engine never talks to a GPU API directly. It issues [`DrawCall`]s and
//! manipulates the small amount of global rasterizer state the clip strategies
//! need through the [`Backend`] trait. [`SoftwareBackend`](crate::software::SoftwareBackend)
//! is a CPU reference implementation.

use core::fmt;
use core::str::FromStr;

use glam::DMat4;
use kurbo::Rect;
use understory_scene::{GeometryHandle, NodeId};

use crate::error::{BackendError, DrawCallError};

/// An integer rectangle in surface pixels, origin at the top-left.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelRect {
    /// Create a rect from origin and size.
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rect at the origin covering `width × height`.
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Snap a logical rectangle to pixels.
    ///
    /// Edges are rounded to the nearest pixel boundary and clamped at zero, so
    /// adjacent rectangles that share an edge stay adjacent after snapping.
    pub fn from_rect(rect: Rect) -> Self {
        let r = rect.abs().round();
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "Float to int casts saturate; negative edges clamp to zero."
        )]
        let (x0, y0, x1, y1) = (
            r.x0.max(0.0) as u32,
            r.y0.max(0.0) as u32,
            r.x1.max(0.0) as u32,
            r.y1.max(0.0) as u32,
        );
        Self::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }

    /// The same rectangle in logical coordinates.
    pub fn to_rect(self) -> Rect {
        Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.right()),
            f64::from(self.bottom()),
        )
    }

    /// Exclusive right edge.
    pub const fn right(self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge.
    pub const fn bottom(self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// True if the rect covers no pixels.
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True if pixel `(x, y)` lies inside.
    pub fn contains(self, x: i64, y: i64) -> bool {
        x >= i64::from(self.x)
            && y >= i64::from(self.y)
            && x < i64::from(self.right())
            && y < i64::from(self.bottom())
    }

    /// Overlap of two rects; empty rects keep the origin of `self`.
    pub fn intersect(self, other: Self) -> Self {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return Self::new(self.x, self.y, 0, 0);
        }
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Width over height; `1.0` for degenerate rects.
    pub fn aspect(self) -> f64 {
        if self.is_empty() {
            1.0
        } else {
            f64::from(self.width) / f64::from(self.height)
        }
    }
}

/// An 8-bit RGBA color. Alpha `0` is treated as "nothing drawn" by compositing.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::rgba8(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb8(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb8(255, 255, 255);
    /// Opaque red.
    pub const RED: Self = Self::rgb8(255, 0, 0);
    /// Opaque green.
    pub const GREEN: Self = Self::rgb8(0, 255, 0);
    /// Opaque blue.
    pub const BLUE: Self = Self::rgb8(0, 0, 255);
    /// Opaque yellow.
    pub const YELLOW: Self = Self::rgb8(255, 255, 0);

    /// Color from components.
    pub const fn rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from components.
    pub const fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgba8(r, g, b, 255)
    }

    /// Color from unit floats, clamped.
    pub fn from_unit(r: f32, g: f32, b: f32, a: f32) -> Self {
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "Clamped to 0..=255 before the cast."
        )]
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::rgba8(q(r), q(g), q(b), q(a))
    }
}

/// Error returned when a color name or hex string is not recognized.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown color `{0}`")]
pub struct ParseColorError(pub String);

impl FromStr for Color {
    type Err = ParseColorError;

    /// Parses a few CSS color names and `#rrggbb` / `#rrggbbaa` hex strings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let named = match s.to_ascii_lowercase().as_str() {
            "transparent" => Some(Self::TRANSPARENT),
            "black" => Some(Self::BLACK),
            "white" => Some(Self::WHITE),
            "red" => Some(Self::RED),
            "green" => Some(Self::GREEN),
            "blue" => Some(Self::BLUE),
            "yellow" => Some(Self::YELLOW),
            _ => None,
        };
        if let Some(c) = named {
            return Ok(c);
        }
        let err = || ParseColorError(s.to_string());
        let hex = s.strip_prefix('#').ok_or_else(err)?;
        if !hex.is_ascii() || !(hex.len() == 6 || hex.len() == 8) {
            return Err(err());
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        let a = if hex.len() == 8 { byte(6)? } else { 255 };
        Ok(Self::rgba8(byte(0)?, byte(2)?, byte(4)?, a))
    }
}

/// Per-draw clip parameters consumed by fragment shading.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ClipParams {
    /// Pixels outside this rect must be discarded. `None` means no fragment clip.
    pub fragment_rect: Option<PixelRect>,
}

/// One geometry draw: "render this geometry with this transform and this clip region".
#[derive(Clone, Debug, PartialEq)]
pub struct DrawCall {
    /// The scene node the draw originates from.
    pub node: NodeId,
    /// Backend-owned geometry.
    pub geometry: GeometryHandle,
    /// Geometry space to clip space of the currently bound viewport.
    pub transform: DMat4,
    /// Clip parameters.
    pub clip: ClipParams,
}

/// Pixel format of an offscreen target.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TargetFormat {
    /// 8-bit normalized RGBA.
    #[default]
    Rgba8,
    /// 16-bit float RGBA.
    Rgba16Float,
}

/// Size and format of an offscreen target.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TargetDesc {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel format.
    pub format: TargetFormat,
}

/// Backend handle of an offscreen target.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u64);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target#{}", self.0)
    }
}

/// Capabilities the clip strategies depend on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GpuCapabilities {
    /// Largest hardware viewport, in pixels.
    pub max_viewport_dims: (u32, u32),
    /// Whether offscreen render targets are available.
    pub fbo_supported: bool,
}

impl Default for GpuCapabilities {
    fn default() -> Self {
        Self {
            max_viewport_dims: (16384, 16384),
            fbo_supported: true,
        }
    }
}

/// The drawing backend.
///
/// All methods are called from the single render thread. The hardware viewport
/// set by [`Backend::set_viewport`] both maps clip space to pixels and acts as
/// the scissor rectangle.
pub trait Backend {
    /// Query capabilities.
    fn capabilities(&self) -> GpuCapabilities;

    /// Start a frame on a `width × height` surface. Resets the viewport to the
    /// full surface and binds the surface as the render target.
    fn begin_frame(&mut self, width: u32, height: u32);

    /// Finish a frame.
    fn end_frame(&mut self) {}

    /// Current hardware viewport.
    fn viewport(&self) -> PixelRect;

    /// Replace the hardware viewport.
    fn set_viewport(&mut self, rect: PixelRect);

    /// Issue one draw. Failure affects only this draw.
    fn draw(&mut self, call: &DrawCall) -> Result<(), DrawCallError>;

    /// Allocate an offscreen target.
    fn allocate_target(&mut self, desc: TargetDesc) -> Result<TargetId, BackendError>;

    /// Free an offscreen target.
    fn release_target(&mut self, target: TargetId);

    /// Redirect draws to `target`, or back to the surface with `None`.
    ///
    /// Binding an offscreen target clears it to [`Color::TRANSPARENT`].
    fn bind_target(&mut self, target: Option<TargetId>);

    /// Blend `target` onto the surface with its top-left corner at `dest`.
    fn composite(&mut self, target: TargetId, dest: PixelRect) -> Result<(), BackendError>;

    /// Stroke the inside edge of `rect` on the bound target.
    fn stroke_rect(&mut self, rect: PixelRect, color: Color, width: u32)
    -> Result<(), DrawCallError>;
}
