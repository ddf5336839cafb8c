// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for rendering and backend interaction.

use understory_scene::SceneError;

use crate::clip::ClipStrategy;
use crate::viewbox::ViewBoxId;

/// A single draw call failed. The node is skipped for this frame.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("draw call failed: {message}")]
pub struct DrawCallError {
    /// Backend supplied reason.
    pub message: String,
}

impl DrawCallError {
    /// Create an error from a reason.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failures of backend resource operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// An offscreen target could not be allocated.
    #[error("cannot allocate a {width}x{height} offscreen target")]
    TargetAllocation {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// The target handle is not known to the backend.
    #[error("unknown offscreen target {0}")]
    UnknownTarget(crate::backend::TargetId),
}

/// Errors surfaced by the canvas and the renderer.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum RenderError {
    /// A clip strategy that owns global rasterizer state was bound while a
    /// previous bind was never released. The shared state can no longer be
    /// trusted, so the frame is aborted.
    #[error("{strategy} clip state leaked: bound again without a matching release")]
    ClipStateLeak {
        /// The strategy whose state is still bound.
        strategy: ClipStrategy,
    },
    /// A backend resource operation failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// A structural scene graph error.
    #[error(transparent)]
    Scene(#[from] SceneError),
    /// The view box handle is not registered with the canvas.
    #[error("unknown view box {0:?}")]
    UnknownViewBox(ViewBoxId),
}
