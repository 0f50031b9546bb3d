//! Rendering backends
//!
//! The compositor never talks to a graphics API directly. Everything it
//! needs from the GPU goes through [`RenderBackend`]:
//!
//! - render targets, addressed by [`TargetId`] and owned through RAII
//!   [`RenderTarget`] handles
//! - clears, alpha-blended solid fills and textured blits
//! - compiled effect passes for postprocess stages
//! - readback for snapshots and tests
//!
//! [`CpuBackend`] is a software reference implementation; [`GpuBackend`]
//! runs the same commands through wgpu.

pub mod blend;
pub mod cpu;
pub mod gpu;

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::effects::{EffectParams, EffectSource};
use crate::error::{ComposeError, ComposeResult};
use crate::telemetry::RenderStats;

pub use blend::BlendMode;
pub use cpu::CpuBackend;
pub use gpu::GpuBackend;

/// Fully transparent black
pub const TRANSPARENT: [f32; 4] = [0.0, 0.0, 0.0, 0.0];

/// Sample counts a render target may request (0 and 1 both mean no MSAA)
pub const SUPPORTED_SAMPLE_COUNTS: [u32; 5] = [0, 1, 2, 4, 8];

/// Largest width or height any backend accepts for a render target
pub const MAX_TARGET_DIMENSION: u32 = 16384;

/// Backend-assigned identifier of a render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub(crate) u32);

/// Backend-assigned identifier of a compiled effect program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectId(pub(crate) u32);

/// Axis-aligned rectangle in target pixel coordinates (origin top-left)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle at the origin covering `width` x `height`
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f32, height as f32)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Whether the point lies inside (left/top inclusive, right/bottom exclusive)
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }
}

/// Parameters for allocating a render target
#[derive(Debug, Clone)]
pub struct TargetDesc {
    pub width: u32,
    pub height: u32,
    /// MSAA sample count (0 or 1 = single sampled)
    pub samples: u32,
    /// Debug label
    pub label: String,
}

impl TargetDesc {
    pub fn new(width: u32, height: u32, label: impl Into<String>) -> Self {
        Self {
            width,
            height,
            samples: 0,
            label: label.into(),
        }
    }

    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }

    /// Reject empty or oversized targets and unsupported sample counts
    pub fn validate(&self) -> ComposeResult<()> {
        self.validate_within(MAX_TARGET_DIMENSION)
    }

    /// Like [`TargetDesc::validate`], with an explicit dimension limit
    pub fn validate_within(&self, max_dimension: u32) -> ComposeResult<()> {
        let max_dimension = max_dimension.min(MAX_TARGET_DIMENSION);
        let empty = self.width == 0 || self.height == 0;
        let oversized = self.width > max_dimension || self.height > max_dimension;
        if empty || oversized {
            return Err(ComposeError::InvalidSize {
                width: self.width,
                height: self.height,
            });
        }
        if !SUPPORTED_SAMPLE_COUNTS.contains(&self.samples) {
            return Err(ComposeError::UnsupportedSamples(self.samples));
        }
        Ok(())
    }
}

/// Queue of target ids whose handles were dropped, drained by the backend
#[derive(Debug, Clone, Default)]
pub struct ReleaseQueue(Rc<RefCell<Vec<TargetId>>>);

impl ReleaseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, id: TargetId) {
        self.0.borrow_mut().push(id);
    }

    /// Take every pending id
    pub fn drain(&self) -> Vec<TargetId> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

/// Owning handle of a backend render target.
///
/// Dropping the handle queues the target for release; the backend frees it
/// on its next allocation or [`RenderBackend::maintain`].
#[derive(Debug)]
pub struct RenderTarget {
    id: TargetId,
    width: u32,
    height: u32,
    samples: u32,
    release: ReleaseQueue,
}

impl RenderTarget {
    /// Wrap a freshly allocated target. Only backends call this.
    pub fn new(id: TargetId, desc: &TargetDesc, release: ReleaseQueue) -> Self {
        Self {
            id,
            width: desc.width,
            height: desc.height,
            samples: desc.samples,
            release,
        }
    }

    pub fn id(&self) -> TargetId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Full-target rectangle
    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        self.release.push(self.id);
    }
}

/// Command interface implemented by every rendering backend.
///
/// Every call is synchronous: when it returns, the written target is ready
/// to be sampled by the next call. Backends keep no binding state between
/// calls.
pub trait RenderBackend {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Allocate a render target cleared to transparent black
    fn create_target(&mut self, desc: &TargetDesc) -> ComposeResult<RenderTarget>;

    /// Free targets whose handles were dropped
    fn maintain(&mut self);

    /// Size of a live target
    fn target_size(&self, target: TargetId) -> ComposeResult<(u32, u32)>;

    /// Overwrite the whole target with `color`
    fn clear(&mut self, target: TargetId, color: [f32; 4]) -> ComposeResult<()>;

    /// Alpha-blend a solid rectangle into the target
    fn fill_rect(&mut self, target: TargetId, rect: Rect, color: [f32; 4]) -> ComposeResult<()>;

    /// Draw `source`'s color image stretched into `bounds` of `target`,
    /// with its alpha multiplied by `opacity`
    fn draw_texture(
        &mut self,
        target: TargetId,
        source: TargetId,
        bounds: Rect,
        opacity: f32,
        blend: BlendMode,
    ) -> ComposeResult<()>;

    /// Build an effect program; fails with [`ComposeError::EffectCompile`]
    fn compile_effect(&mut self, source: &EffectSource) -> ComposeResult<EffectId>;

    /// Run a compiled effect over `input`, fully overwriting `output`
    fn run_effect(
        &mut self,
        effect: EffectId,
        params: &EffectParams,
        input: TargetId,
        output: TargetId,
    ) -> ComposeResult<()>;

    /// Read back the target as straight-alpha RGBA rows, top to bottom
    fn read_pixels(&mut self, target: TargetId) -> ComposeResult<Vec<[f32; 4]>>;

    /// Counters since creation or the last [`RenderBackend::reset_stats`]
    fn stats(&self) -> RenderStats;

    fn reset_stats(&mut self);
}

/// Available backend kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Software rasterizer, always available
    #[default]
    Cpu,
    /// wgpu on the default adapter, headless
    Gpu,
}

/// Create a backend of the given kind
pub fn create_backend(kind: BackendKind) -> ComposeResult<Box<dyn RenderBackend>> {
    match kind {
        BackendKind::Cpu => Ok(Box::new(CpuBackend::new())),
        BackendKind::Gpu => Ok(Box::new(GpuBackend::new_headless()?)),
    }
}

/// A render target bound for drawing, with its viewport.
///
/// Scenes receive a canvas for the duration of one `draw` call; the borrow
/// ends when the call returns, so no binding outlives it.
pub struct Canvas<'a> {
    backend: &'a mut dyn RenderBackend,
    target: TargetId,
    viewport: Rect,
}

impl<'a> Canvas<'a> {
    /// Bind `target` with a viewport covering all of it
    pub fn new(backend: &'a mut dyn RenderBackend, target: &RenderTarget) -> Self {
        Self {
            backend,
            target: target.id(),
            viewport: target.bounds(),
        }
    }

    pub fn target(&self) -> TargetId {
        self.target
    }

    /// Viewport of the bound target in pixels
    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn clear(&mut self, color: [f32; 4]) -> ComposeResult<()> {
        self.backend.clear(self.target, color)
    }

    pub fn fill_rect(&mut self, rect: Rect, color: [f32; 4]) -> ComposeResult<()> {
        self.backend.fill_rect(self.target, rect, color)
    }

    /// Alpha-blend `color` over the whole viewport
    pub fn fill(&mut self, color: [f32; 4]) -> ComposeResult<()> {
        self.backend.fill_rect(self.target, self.viewport, color)
    }

    /// Alpha-blend another target's image into `bounds`
    pub fn draw_texture(
        &mut self,
        source: TargetId,
        bounds: Rect,
        opacity: f32,
    ) -> ComposeResult<()> {
        self.backend
            .draw_texture(self.target, source, bounds, opacity, BlendMode::Alpha)
    }

    /// The underlying backend, for passes that render elsewhere first
    pub fn backend(&mut self) -> &mut dyn RenderBackend {
        &mut *self.backend
    }
}

impl std::fmt::Debug for Canvas<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("backend", &self.backend.name())
            .field("target", &self.target)
            .field("viewport", &self.viewport)
            .finish()
    }
}
