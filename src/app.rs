//! Composer: backend, timeline and root layer driven together
//!
//! Bundles the pieces an application needs for the usual frame loop:
//! advance time, update and render the tree, then present the root's final
//! image into an output target.

use std::path::Path;

use crate::animation::Timeline;
use crate::compositor::{layer_ref, Layer, LayerRef};
use crate::effects::PostprocessRef;
use crate::error::{ComposeError, ComposeResult};
use crate::render::{create_backend, Canvas, RenderBackend, RenderTarget, TargetDesc, TRANSPARENT};
use crate::settings::ComposerSettings;
use crate::telemetry::{save_png, FrameProfiler};

/// A root layer with the backend and timeline that drive it
pub struct Composer {
    backend: Box<dyn RenderBackend>,
    timeline: Timeline,
    root: LayerRef,
    profiler: FrameProfiler,
    frame_index: u64,
}

impl Composer {
    /// Create a composer whose root layer is `width` x `height`
    pub fn new(
        mut backend: Box<dyn RenderBackend>,
        width: u32,
        height: u32,
        samples: u32,
    ) -> ComposeResult<Self> {
        let root = layer_ref(Layer::new(backend.as_mut(), width, height, samples)?);
        tracing::info!(width, height, samples, backend = backend.name(), "Composer ready");
        Ok(Self {
            backend,
            timeline: Timeline::new(),
            root,
            profiler: FrameProfiler::new(),
            frame_index: 0,
        })
    }

    pub fn from_settings(settings: &ComposerSettings) -> ComposeResult<Self> {
        let backend = create_backend(settings.backend)?;
        Self::new(backend, settings.width, settings.height, settings.msaa_samples)
    }

    pub fn backend(&mut self) -> &mut dyn RenderBackend {
        self.backend.as_mut()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn timeline_mut(&mut self) -> &mut Timeline {
        &mut self.timeline
    }

    pub fn root(&self) -> &LayerRef {
        &self.root
    }

    pub fn profiler(&self) -> &FrameProfiler {
        &self.profiler
    }

    /// Frames rendered so far
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Create a layer on this composer's backend, ready to attach
    pub fn create_layer(
        &mut self,
        width: u32,
        height: u32,
        samples: u32,
    ) -> ComposeResult<LayerRef> {
        Ok(layer_ref(Layer::new(self.backend.as_mut(), width, height, samples)?))
    }

    /// Append a postprocess stage to the root layer
    pub fn add_postprocess(&mut self, stage: PostprocessRef) -> ComposeResult<()> {
        let mut root = self.root.try_borrow_mut().map_err(|_| ComposeError::LayerCycle)?;
        root.add_postprocess(self.backend.as_mut(), stage)
    }

    /// Target sized like the root layer, for presenting into
    pub fn create_output(&mut self) -> ComposeResult<RenderTarget> {
        let (width, height) = self.root.try_borrow().map_err(|_| ComposeError::LayerCycle)?.size();
        self.backend.create_target(&TargetDesc::new(width, height, "Composer Output"))
    }

    /// Advance time by `dt` seconds, then update and render the tree
    pub fn frame(&mut self, dt: f64) -> ComposeResult<()> {
        self.timeline.step(dt);
        self.render_frame()
    }

    /// Advance time by the wall clock, then update and render the tree
    pub fn frame_realtime(&mut self) -> ComposeResult<()> {
        self.timeline.update();
        self.render_frame()
    }

    fn render_frame(&mut self) -> ComposeResult<()> {
        self.profiler.begin_frame();
        self.root
            .try_borrow_mut()
            .map_err(|_| ComposeError::LayerCycle)?
            .update(&self.timeline, self.backend.as_mut())?;
        self.backend.maintain();
        self.frame_index += 1;
        tracing::trace!(frame = self.frame_index, now = self.timeline.now(), "Rendered frame");
        Ok(())
    }

    /// Clear `target` and draw the root's final image over all of it
    pub fn present(&mut self, target: &RenderTarget) -> ComposeResult<()> {
        let mut root = self.root.try_borrow_mut().map_err(|_| ComposeError::LayerCycle)?;
        let mut canvas = Canvas::new(self.backend.as_mut(), target);
        canvas.clear(TRANSPARENT)?;
        let bounds = canvas.viewport();
        root.draw_final_tex(&mut canvas, bounds)
    }

    /// Save `target` as a PNG
    pub fn snapshot(&mut self, target: &RenderTarget, path: impl AsRef<Path>) -> ComposeResult<()> {
        save_png(self.backend.as_mut(), target.id(), path)
    }
}

impl std::fmt::Debug for Composer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composer")
            .field("backend", &self.backend.name())
            .field("now", &self.timeline.now())
            .field("frame_index", &self.frame_index)
            .finish()
    }
}
