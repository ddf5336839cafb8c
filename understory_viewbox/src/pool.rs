// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reuse of offscreen targets across frames, keyed by size and format.

use crate::backend::{Backend, TargetDesc, TargetId};
use crate::error::BackendError;

/// A bounded free list of offscreen targets.
///
/// Targets are looked up by exact [`TargetDesc`]. Returning a target to a full
/// pool frees it in the backend instead.
#[derive(Debug)]
pub(crate) struct TargetPool {
    free: Vec<(TargetDesc, TargetId)>,
    capacity: usize,
}

impl TargetPool {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            free: Vec::new(),
            capacity,
        }
    }

    /// A pooled target matching `desc`, or a freshly allocated one.
    pub(crate) fn acquire<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        desc: TargetDesc,
    ) -> Result<TargetId, BackendError> {
        if let Some(pos) = self.free.iter().position(|(d, _)| *d == desc) {
            let (_, id) = self.free.swap_remove(pos);
            log::trace!("reusing pooled {id} ({}x{})", desc.width, desc.height);
            return Ok(id);
        }
        let id = backend.allocate_target(desc)?;
        log::debug!("allocated {id} ({}x{})", desc.width, desc.height);
        Ok(id)
    }

    /// Give a target back for reuse.
    pub(crate) fn release<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        desc: TargetDesc,
        id: TargetId,
    ) {
        if self.free.len() < self.capacity {
            self.free.push((desc, id));
        } else {
            backend.release_target(id);
        }
    }

    /// Free every pooled target.
    pub(crate) fn drain<B: Backend + ?Sized>(&mut self, backend: &mut B) {
        for (_, id) in self.free.drain(..) {
            backend.release_target(id);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.free.len()
    }

    pub(crate) fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }
}
