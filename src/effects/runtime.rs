//! Postprocess chain runtime
//!
//! `PingPong` owns the two intermediate targets of a layer's postprocess
//! chain. Stages alternate reading from one target and writing to the
//! other, so a chain of any length needs exactly two allocations.

use crate::error::ComposeResult;
use crate::render::{RenderBackend, RenderTarget, TargetDesc, TargetId};

/// Ping-pong pair of single-sampled targets.
///
/// After each stage the roles swap: the target that was just written
/// becomes `final_target` and the other becomes the next `process_target`.
#[derive(Debug)]
pub struct PingPong {
    /// Two targets for ping-pong rendering
    buffers: [RenderTarget; 2],
    /// Index of the buffer currently holding the chain result
    final_index: usize,
}

impl PingPong {
    /// Allocate both buffers at the given size
    pub fn new(backend: &mut dyn RenderBackend, width: u32, height: u32) -> ComposeResult<Self> {
        let buffers = [
            backend.create_target(&TargetDesc::new(width, height, "Postprocess Ping"))?,
            backend.create_target(&TargetDesc::new(width, height, "Postprocess Pong"))?,
        ];
        tracing::debug!(width, height, "Allocated postprocess buffers");
        Ok(Self {
            buffers,
            final_index: 0,
        })
    }

    /// Buffer holding the most recent chain output
    pub fn final_target(&self) -> TargetId {
        self.buffers[self.final_index].id()
    }

    /// Buffer the next stage writes into
    pub fn process_target(&self) -> TargetId {
        self.buffers[1 - self.final_index].id()
    }

    /// Exchange the roles of the two buffers
    pub fn swap(&mut self) {
        self.final_index = 1 - self.final_index;
    }

    /// Make the first buffer the seed target again
    pub fn reset(&mut self) {
        self.final_index = 0;
    }

    /// Get buffer dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        self.buffers[0].size()
    }
}
