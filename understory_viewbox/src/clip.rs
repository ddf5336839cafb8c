// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clip strategies: ways to confine a view box's drawing to its rectangle.
//!
//! Every strategy follows the same protocol: bind a [`ClipRegion`], apply the
//! returned [`ClipHandle`] to each draw call, release the handle. The
//! [`ClipScope`] guard wraps the protocol so that release runs on every exit
//! path, including early returns and unwinding.
//!
//! - [`ClipStrategy::Fragment`] keeps the full-canvas viewport, remaps each draw
//!   call's clip-space output into the region, and attaches the region as a
//!   per-draw discard rectangle. It touches no shared state.
//! - [`ClipStrategy::Viewport`] sets the hardware viewport to the region and
//!   restores the exact previous viewport on release.
//! - [`ClipStrategy::Fbo`] renders into a pooled offscreen target of the region's
//!   size and composites it onto the canvas on release.
//!
//! The last two own global rasterizer state. [`ClipState`] tracks that state and
//! refuses to bind while a previous bind was never released, reporting
//! [`RenderError::ClipStateLeak`].

use core::fmt;
use core::str::FromStr;

use glam::{DMat4, DVec3};

use crate::backend::{
    Backend, DrawCall, GpuCapabilities, PixelRect, TargetDesc, TargetFormat, TargetId,
};
use crate::camera::ParseNameError;
use crate::error::{DrawCallError, RenderError};
use crate::pool::TargetPool;

/// How a view box confines its drawing to its rectangle.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ClipStrategy {
    /// Per-draw discard rectangle; no global state.
    #[default]
    Fragment,
    /// Hardware viewport (and scissor) set to the region.
    Viewport,
    /// Offscreen target composited onto the canvas.
    Fbo {
        /// Format of the offscreen target.
        format: TargetFormat,
    },
}

impl ClipStrategy {
    /// An FBO strategy with the default target format.
    pub const FBO: Self = Self::Fbo {
        format: TargetFormat::Rgba8,
    };

    /// Short name of the strategy.
    pub fn name(self) -> &'static str {
        match self {
            Self::Fragment => "fragment",
            Self::Viewport => "viewport",
            Self::Fbo { .. } => "fbo",
        }
    }

    /// True if binding changes state shared by all draws.
    pub fn is_exclusive(self) -> bool {
        !matches!(self, Self::Fragment)
    }

    /// The strategy to actually use for `region` on hardware with `capabilities`.
    ///
    /// Regions larger than the maximum viewport, and FBOs on hardware without
    /// offscreen targets, degrade to [`ClipStrategy::Fragment`].
    pub fn resolve(self, capabilities: &GpuCapabilities, region: &ClipRegion) -> Self {
        let (max_w, max_h) = capabilities.max_viewport_dims;
        let too_large = region.rect.width > max_w || region.rect.height > max_h;
        match self {
            Self::Fragment => self,
            Self::Viewport | Self::Fbo { .. } if too_large => {
                log::warn!(
                    "{} clip for {}x{} exceeds the maximum viewport {max_w}x{max_h}, using fragment clipping",
                    self.name(),
                    region.rect.width,
                    region.rect.height
                );
                Self::Fragment
            }
            Self::Fbo { .. } if !capabilities.fbo_supported => {
                log::warn!("offscreen targets unsupported, using fragment clipping");
                Self::Fragment
            }
            _ => self,
        }
    }
}

impl fmt::Display for ClipStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ClipStrategy {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fragment" => Ok(Self::Fragment),
            "viewport" => Ok(Self::Viewport),
            "fbo" => Ok(Self::FBO),
            _ => Err(ParseNameError::new("clip method", s)),
        }
    }
}

/// The pixel rectangle a view box draws into, and the canvas it lies on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ClipRegion {
    /// Region in canvas pixels.
    pub rect: PixelRect,
    /// Canvas width.
    pub canvas_width: u32,
    /// Canvas height.
    pub canvas_height: u32,
}

impl ClipRegion {
    /// Create a region on a `canvas_width × canvas_height` canvas.
    pub fn new(rect: PixelRect, canvas_width: u32, canvas_height: u32) -> Self {
        Self {
            rect,
            canvas_width,
            canvas_height,
        }
    }

    /// Maps the region's own clip space (`[-1, 1]²` filling `rect`) to canvas clip space.
    pub fn ndc_to_canvas(&self) -> DMat4 {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return DMat4::IDENTITY;
        }
        let cw = f64::from(self.canvas_width);
        let ch = f64::from(self.canvas_height);
        let x = f64::from(self.rect.x);
        let y = f64::from(self.rect.y);
        let w = f64::from(self.rect.width);
        let h = f64::from(self.rect.height);
        DMat4::from_translation(DVec3::new(
            (2.0 * x + w) / cw - 1.0,
            1.0 - (2.0 * y + h) / ch,
            0.0,
        )) * DMat4::from_scale(DVec3::new(w / cw, h / ch, 1.0))
    }
}

#[derive(Debug)]
enum Binding {
    Fragment { ndc_to_canvas: DMat4 },
    Viewport { saved: PixelRect },
    Fbo {
        target: TargetId,
        desc: TargetDesc,
        saved: PixelRect,
    },
}

/// Proof of a successful bind. Must be passed back to [`ClipState::release`].
///
/// Not `Clone`: each bind is released exactly once.
#[derive(Debug)]
pub struct ClipHandle {
    strategy: ClipStrategy,
    region: ClipRegion,
    binding: Binding,
}

impl ClipHandle {
    /// The strategy that produced this handle.
    pub fn strategy(&self) -> ClipStrategy {
        self.strategy
    }

    /// The bound region.
    pub fn region(&self) -> ClipRegion {
        self.region
    }

    /// Adjust a draw call whose transform ends in the region's clip space.
    pub fn apply(&self, call: &mut DrawCall) {
        if let Binding::Fragment { ndc_to_canvas } = &self.binding {
            call.transform = *ndc_to_canvas * call.transform;
            call.clip.fragment_rect = Some(self.region.rect);
        }
    }
}

/// Tracks exclusive clip state and owns the offscreen target pool.
#[derive(Debug)]
pub struct ClipState {
    exclusive: Option<ClipStrategy>,
    pool: TargetPool,
}

impl Default for ClipState {
    fn default() -> Self {
        Self::new(crate::renderer::DEFAULT_FBO_POOL_CAPACITY)
    }
}

impl ClipState {
    /// Create a state whose pool keeps at most `pool_capacity` idle targets.
    pub fn new(pool_capacity: usize) -> Self {
        Self {
            exclusive: None,
            pool: TargetPool::new(pool_capacity),
        }
    }

    /// The exclusive strategy currently bound, if any.
    pub fn bound(&self) -> Option<ClipStrategy> {
        self.exclusive
    }

    /// Idle targets kept for reuse.
    pub fn pooled_targets(&self) -> usize {
        self.pool.len()
    }

    /// Change how many idle targets are kept. Takes effect on the next release.
    pub fn set_pool_capacity(&mut self, capacity: usize) {
        self.pool.set_capacity(capacity);
    }

    /// Bind `strategy` for `region`.
    pub fn bind<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        strategy: ClipStrategy,
        region: ClipRegion,
    ) -> Result<ClipHandle, RenderError> {
        if strategy.is_exclusive() {
            if let Some(held) = self.exclusive {
                log::error!("{strategy} bind while {held} clip state is still bound");
                return Err(RenderError::ClipStateLeak { strategy: held });
            }
        }
        let binding = match strategy {
            ClipStrategy::Fragment => Binding::Fragment {
                ndc_to_canvas: region.ndc_to_canvas(),
            },
            ClipStrategy::Viewport => {
                let saved = backend.viewport();
                backend.set_viewport(region.rect);
                Binding::Viewport { saved }
            }
            ClipStrategy::Fbo { format } => {
                let desc = TargetDesc {
                    width: region.rect.width,
                    height: region.rect.height,
                    format,
                };
                let target = self.pool.acquire(backend, desc)?;
                let saved = backend.viewport();
                backend.bind_target(Some(target));
                backend.set_viewport(PixelRect::from_size(desc.width, desc.height));
                Binding::Fbo {
                    target,
                    desc,
                    saved,
                }
            }
        };
        if strategy.is_exclusive() {
            self.exclusive = Some(strategy);
        }
        log::trace!("bound {strategy} clip at {:?}", region.rect);
        Ok(ClipHandle {
            strategy,
            region,
            binding,
        })
    }

    /// Undo a bind. For FBOs this composites the target onto the canvas.
    pub fn release<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        handle: ClipHandle,
    ) -> Result<(), RenderError> {
        let result = match handle.binding {
            Binding::Fragment { .. } => Ok(()),
            Binding::Viewport { saved } => {
                backend.set_viewport(saved);
                Ok(())
            }
            Binding::Fbo {
                target,
                desc,
                saved,
            } => {
                backend.bind_target(None);
                backend.set_viewport(saved);
                let composited = backend.composite(target, handle.region.rect);
                self.pool.release(backend, desc, target);
                composited.map_err(RenderError::from)
            }
        };
        if handle.strategy.is_exclusive() {
            self.exclusive = None;
        }
        result
    }

    /// Bind `strategy` and return a guard that releases it when dropped.
    pub fn scope<'a, B: Backend + ?Sized>(
        &'a mut self,
        backend: &'a mut B,
        strategy: ClipStrategy,
        region: ClipRegion,
    ) -> Result<ClipScope<'a, B>, RenderError> {
        let handle = self.bind(backend, strategy, region)?;
        Ok(ClipScope {
            state: self,
            backend,
            handle: Some(handle),
        })
    }

    /// Forget a leaked exclusive bind.
    ///
    /// The backend state the leaked bind changed is not restored; a new
    /// [`Backend::begin_frame`] resets it.
    pub fn reset(&mut self) {
        if let Some(held) = self.exclusive.take() {
            log::warn!("discarding leaked {held} clip state");
        }
    }

    /// Free every pooled offscreen target.
    pub fn release_resources<B: Backend + ?Sized>(&mut self, backend: &mut B) {
        self.pool.drain(backend);
    }
}

/// A bound clip that is released when the scope ends.
///
/// Draw through [`ClipScope::draw`] so each call gets the clip applied.
/// [`ClipScope::release`] reports release errors; dropping the scope logs them.
pub struct ClipScope<'a, B: Backend + ?Sized> {
    state: &'a mut ClipState,
    backend: &'a mut B,
    handle: Option<ClipHandle>,
}

impl<B: Backend + ?Sized> fmt::Debug for ClipScope<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClipScope")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl<B: Backend + ?Sized> ClipScope<'_, B> {
    /// The active handle.
    pub fn handle(&self) -> Option<&ClipHandle> {
        self.handle.as_ref()
    }

    /// Apply the clip to `call` and issue it.
    pub fn draw(&mut self, mut call: DrawCall) -> Result<(), DrawCallError> {
        if let Some(handle) = &self.handle {
            handle.apply(&mut call);
        }
        self.backend.draw(&call)
    }

    /// Release now and report the outcome.
    pub fn release(mut self) -> Result<(), RenderError> {
        match self.handle.take() {
            Some(handle) => self.state.release(&mut *self.backend, handle),
            None => Ok(()),
        }
    }
}

impl<B: Backend + ?Sized> Drop for ClipScope<'_, B> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let strategy = handle.strategy();
            if let Err(err) = self.state.release(&mut *self.backend, handle) {
                log::error!("releasing {strategy} clip failed: {err}");
            }
        }
    }
}
