//! Layers: composite nodes of the render tree
//!
//! A Layer owns an offscreen primary buffer. Each frame it renders its
//! child layers into their own buffers, then composites them and its scenes
//! into the primary buffer over either a transparent clear or a partial
//! fade to black. On request the result is routed through the layer's
//! postprocess chain before being drawn into a caller-provided canvas.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use crate::animation::{AnimatedScalar, Ease, Timeline};
use crate::compositor::scene::SceneRef;
use crate::effects::{PingPong, PostprocessRef};
use crate::error::{ComposeError, ComposeResult};
use crate::render::{
    BlendMode, Canvas, Rect, RenderBackend, RenderTarget, TargetDesc, TargetId, TRANSPARENT,
};

/// Shared handle to a layer
pub type LayerRef = Rc<RefCell<Layer>>;

/// Wrap a layer for attachment to a parent
pub fn layer_ref(layer: Layer) -> LayerRef {
    Rc::new(RefCell::new(layer))
}

/// Mutably borrow a node of the tree, reporting re-entry as a cycle
fn borrow_node_mut<T: ?Sized>(node: &RefCell<T>) -> ComposeResult<RefMut<'_, T>> {
    node.try_borrow_mut().map_err(|_| ComposeError::LayerCycle)
}

fn borrow_node<T: ?Sized>(node: &RefCell<T>) -> ComposeResult<Ref<'_, T>> {
    node.try_borrow().map_err(|_| ComposeError::LayerCycle)
}

/// A compositing node with children, scenes and a postprocess chain.
///
/// Children, scenes and stages are append-only and are composited or
/// processed in insertion order. The ping/pong pair exists exactly when at
/// least one postprocess stage is attached.
pub struct Layer {
    /// Opacity used when this layer is drawn into a parent or canvas
    opacity: AnimatedScalar,
    /// Fraction of the previous frame kept in the primary buffer (0 = clear)
    fade: f32,
    children: Vec<LayerRef>,
    scenes: Vec<SceneRef>,
    postprocesses: Vec<PostprocessRef>,
    /// Offscreen buffer holding this layer's composited image
    primary: RenderTarget,
    process_buffers: Option<PingPong>,
}

impl Layer {
    /// Create a layer with a `width` x `height` primary buffer.
    ///
    /// `samples` is the MSAA sample count of the primary buffer; 0 or 1
    /// disables multisampling.
    pub fn new(
        backend: &mut dyn RenderBackend,
        width: u32,
        height: u32,
        samples: u32,
    ) -> ComposeResult<Self> {
        let desc = TargetDesc::new(width, height, "Layer Primary").with_samples(samples);
        let primary = backend.create_target(&desc)?;
        tracing::debug!(width, height, samples, backend = backend.name(), "Created layer");

        Ok(Self {
            opacity: AnimatedScalar::new(1.0),
            fade: 0.0,
            children: Vec::new(),
            scenes: Vec::new(),
            postprocesses: Vec::new(),
            primary,
            process_buffers: None,
        })
    }

    pub fn width(&self) -> u32 {
        self.primary.width()
    }

    pub fn height(&self) -> u32 {
        self.primary.height()
    }

    pub fn size(&self) -> (u32, u32) {
        self.primary.size()
    }

    pub fn samples(&self) -> u32 {
        self.primary.samples()
    }

    /// Full-size rectangle of the primary buffer
    pub fn bounds(&self) -> Rect {
        self.primary.bounds()
    }

    /// Target holding the composited (unprocessed) image
    pub fn primary_target(&self) -> TargetId {
        self.primary.id()
    }

    pub fn opacity(&self) -> &AnimatedScalar {
        &self.opacity
    }

    pub fn opacity_mut(&mut self) -> &mut AnimatedScalar {
        &mut self.opacity
    }

    pub fn fade(&self) -> f32 {
        self.fade
    }

    /// Set the fade amount, clamped to `[0, 1]`
    pub fn set_fade(&mut self, fade: f32) {
        self.fade = if fade.is_nan() { 0.0 } else { fade.clamp(0.0, 1.0) };
    }

    pub fn children(&self) -> &[LayerRef] {
        &self.children
    }

    pub fn scenes(&self) -> &[SceneRef] {
        &self.scenes
    }

    pub fn postprocesses(&self) -> &[PostprocessRef] {
        &self.postprocesses
    }

    /// Whether the ping/pong pair has been allocated
    pub fn has_process_buffers(&self) -> bool {
        self.process_buffers.is_some()
    }

    pub fn add_layer(&mut self, layer: LayerRef) {
        self.children.push(layer);
    }

    pub fn add_scene(&mut self, scene: SceneRef) {
        self.scenes.push(scene);
    }

    /// Append a postprocess stage, allocating the ping/pong pair on the
    /// first one. On allocation failure the chain is left unchanged.
    pub fn add_postprocess(
        &mut self,
        backend: &mut dyn RenderBackend,
        stage: PostprocessRef,
    ) -> ComposeResult<()> {
        if self.process_buffers.is_none() {
            let (width, height) = self.size();
            self.process_buffers = Some(PingPong::new(backend, width, height)?);
        }
        if let Ok(stage) = stage.try_borrow() {
            tracing::debug!(
                stage = stage.label(),
                index = self.postprocesses.len(),
                "Added postprocess stage"
            );
        }
        self.postprocesses.push(stage);
        Ok(())
    }

    /// Crossfade to the scene at `index`: it fades to 1 while every other
    /// scene fades to 0, all starting at `timeline.now()` and lasting
    /// `duration` seconds.
    ///
    /// A scene attached more than once is retargeted once per entry and
    /// the last entry wins.
    pub fn show_scene(
        &mut self,
        timeline: &Timeline,
        index: usize,
        duration: f64,
    ) -> ComposeResult<()> {
        self.show_scene_eased(timeline, index, duration, Ease::Linear)
    }

    pub fn show_scene_eased(
        &mut self,
        timeline: &Timeline,
        index: usize,
        duration: f64,
        ease: Ease,
    ) -> ComposeResult<()> {
        check_index("scene", index, self.scenes.len())?;
        check_unborrowed(&self.scenes)?;
        for (i, scene) in self.scenes.iter().enumerate() {
            let target = if i == index { 1.0 } else { 0.0 };
            borrow_node_mut(scene)?
                .opacity_mut()
                .retarget_eased(target, duration, ease, timeline.now());
        }
        tracing::debug!(index, duration, now = timeline.now(), "Showing scene");
        Ok(())
    }

    /// Crossfade to the child layer at `index`
    pub fn show_layer(
        &mut self,
        timeline: &Timeline,
        index: usize,
        duration: f64,
    ) -> ComposeResult<()> {
        self.show_layer_eased(timeline, index, duration, Ease::Linear)
    }

    pub fn show_layer_eased(
        &mut self,
        timeline: &Timeline,
        index: usize,
        duration: f64,
        ease: Ease,
    ) -> ComposeResult<()> {
        check_index("layer", index, self.children.len())?;
        check_unborrowed(&self.children)?;
        for (i, child) in self.children.iter().enumerate() {
            let target = if i == index { 1.0 } else { 0.0 };
            borrow_node_mut(child)?
                .opacity_mut()
                .retarget_eased(target, duration, ease, timeline.now());
        }
        tracing::debug!(index, duration, now = timeline.now(), "Showing layer");
        Ok(())
    }

    /// Advance the subtree to the timeline's current time, then render it
    pub fn update(
        &mut self,
        timeline: &Timeline,
        backend: &mut dyn RenderBackend,
    ) -> ComposeResult<()> {
        self.advance(timeline)?;
        self.render_internal(backend)
    }

    /// Tick this layer's opacity, update its scenes and advance every child
    /// layer. Nothing is rendered.
    pub fn advance(&mut self, timeline: &Timeline) -> ComposeResult<()> {
        self.opacity.tick(timeline.now());
        for scene in &self.scenes {
            borrow_node_mut(scene)?.update(timeline);
        }
        for child in &self.children {
            borrow_node_mut(child)?.advance(timeline)?;
        }
        Ok(())
    }

    /// Render children, then composite them and the scenes into the
    /// primary buffer. A layer at zero opacity renders nothing, including
    /// its children.
    pub fn render_internal(&mut self, backend: &mut dyn RenderBackend) -> ComposeResult<()> {
        if self.opacity.is_zero() {
            tracing::trace!("Layer hidden, skipping render");
            return Ok(());
        }

        for child in &self.children {
            borrow_node_mut(child)?.render_internal(backend)?;
        }

        let mut canvas = Canvas::new(backend, &self.primary);
        if self.fade == 0.0 {
            canvas.clear(TRANSPARENT)?;
        } else {
            // Keeps `fade` of the previous frame
            canvas.fill([0.0, 0.0, 0.0, 1.0 - self.fade])?;
        }

        let bounds = canvas.viewport();
        for child in &self.children {
            borrow_node(child)?.draw_tex(&mut canvas, bounds)?;
        }
        for scene in &self.scenes {
            borrow_node_mut(scene)?.draw_internal(&mut canvas)?;
        }
        Ok(())
    }

    /// Draw the primary buffer into `bounds` at this layer's opacity.
    /// Postprocessing is never applied here.
    pub fn draw_tex(&self, canvas: &mut Canvas<'_>, bounds: Rect) -> ComposeResult<()> {
        if self.opacity.is_zero() {
            return Ok(());
        }
        canvas.draw_texture(self.primary.id(), bounds, self.opacity.value())
    }

    /// Draw the postprocessed image into `bounds` at this layer's opacity.
    /// Without stages this is the same as [`Layer::draw_tex`].
    pub fn draw_final_tex(&mut self, canvas: &mut Canvas<'_>, bounds: Rect) -> ComposeResult<()> {
        if self.opacity.is_zero() {
            return Ok(());
        }
        if self.postprocesses.is_empty() {
            return self.draw_tex(canvas, bounds);
        }

        let processed = self.run_postprocess_chain(canvas.backend())?;
        canvas.draw_texture(processed, bounds, self.opacity.value())
    }

    /// Run the whole chain from the current primary buffer and return the
    /// target holding the result.
    ///
    /// The primary buffer is copied into the "final" buffer, then every
    /// stage reads "final", writes "process" and the two swap roles.
    pub fn run_postprocess_chain(
        &mut self,
        backend: &mut dyn RenderBackend,
    ) -> ComposeResult<TargetId> {
        let bounds = self.primary.bounds();
        let buffers = self
            .process_buffers
            .as_mut()
            .ok_or(ComposeError::MissingProcessBuffers)?;

        buffers.reset();
        backend.draw_texture(
            buffers.final_target(),
            self.primary.id(),
            bounds,
            1.0,
            BlendMode::Replace,
        )?;

        for stage in &self.postprocesses {
            let mut stage = borrow_node_mut(stage)?;
            stage.process(backend, buffers.final_target(), buffers.process_target())?;
            buffers.swap();
        }
        Ok(buffers.final_target())
    }
}

impl std::fmt::Debug for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layer")
            .field("size", &self.size())
            .field("opacity", &self.opacity)
            .field("fade", &self.fade)
            .field("children", &self.children.len())
            .field("scenes", &self.scenes.len())
            .field("postprocesses", &self.postprocesses.len())
            .finish()
    }
}

/// Fail with `LayerCycle` if any entry is already borrowed, so a crossfade
/// either retargets every entry or none
fn check_unborrowed<T: ?Sized>(nodes: &[Rc<RefCell<T>>]) -> ComposeResult<()> {
    for node in nodes {
        borrow_node_mut(node)?;
    }
    Ok(())
}

fn check_index(kind: &'static str, index: usize, len: usize) -> ComposeResult<()> {
    if index < len {
        Ok(())
    } else {
        tracing::warn!(kind, index, len, "Crossfade index out of range");
        Err(ComposeError::IndexOutOfRange { kind, index, len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::scene::{scene_ref, Scene, SolidColor};
    use crate::effects::builtin::invert;
    use crate::effects::{
        postprocess_ref, EffectParams, EffectSource, PixelKernel, Postprocess, Sampler,
        ShaderPostprocess,
    };
    use crate::render::CpuBackend;

    const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
    const BLUE: [f32; 4] = [0.0, 0.0, 1.0, 1.0];

    fn passthrough(sampler: &Sampler<'_>, uv: [f32; 2], _params: &EffectParams) -> [f32; 4] {
        sampler.sample(uv)
    }

    fn identity_stage(backend: &mut CpuBackend) -> PostprocessRef {
        let source = EffectSource::new("identity", "", Some(passthrough as PixelKernel));
        postprocess_ref(ShaderPostprocess::new(backend, &source).unwrap())
    }

    /// Records the targets every call receives, then copies input to output
    struct Recording {
        calls: Rc<RefCell<Vec<(TargetId, TargetId)>>>,
    }

    impl Postprocess for Recording {
        fn label(&self) -> &str {
            "recording"
        }

        fn process(
            &mut self,
            backend: &mut dyn RenderBackend,
            input: TargetId,
            output: TargetId,
        ) -> ComposeResult<()> {
            self.calls.borrow_mut().push((input, output));
            let (width, height) = backend.target_size(output)?;
            let bounds = Rect::from_size(width, height);
            backend.draw_texture(output, input, bounds, 1.0, BlendMode::Replace)
        }
    }

    fn solid_layer(backend: &mut CpuBackend, width: u32, height: u32, color: [f32; 4]) -> Layer {
        let mut layer = Layer::new(backend, width, height, 0).unwrap();
        layer.add_scene(scene_ref(Scene::new(SolidColor::new(color))));
        layer
    }

    /// Draw `layer` into a fresh target and read it back
    fn present(backend: &mut CpuBackend, layer: &mut Layer, processed: bool) -> Vec<[f32; 4]> {
        let desc = TargetDesc::new(layer.width(), layer.height(), "app");
        let target = backend.create_target(&desc).unwrap();
        {
            let mut canvas = Canvas::new(backend, &target);
            let bounds = canvas.viewport();
            if processed {
                layer.draw_final_tex(&mut canvas, bounds).unwrap();
            } else {
                layer.draw_tex(&mut canvas, bounds).unwrap();
            }
        }
        backend.read_pixels(target.id()).unwrap()
    }

    #[test]
    fn test_new_layer_defaults() {
        let mut backend = CpuBackend::new();
        let layer = Layer::new(&mut backend, 64, 32, 4).unwrap();
        assert_eq!(layer.size(), (64, 32));
        assert_eq!(layer.samples(), 4);
        assert_eq!(layer.opacity().value(), 1.0);
        assert_eq!(layer.fade(), 0.0);
        assert!(!layer.has_process_buffers());
        assert_eq!(backend.stats().targets_created, 1);
    }

    #[test]
    fn test_new_layer_rejects_zero_size() {
        let mut backend = CpuBackend::new();
        assert!(matches!(
            Layer::new(&mut backend, 0, 10, 0),
            Err(ComposeError::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_set_fade_clamps() {
        let mut backend = CpuBackend::new();
        let mut layer = Layer::new(&mut backend, 2, 2, 0).unwrap();
        layer.set_fade(1.5);
        assert_eq!(layer.fade(), 1.0);
        layer.set_fade(-0.5);
        assert_eq!(layer.fade(), 0.0);
        layer.set_fade(f32::NAN);
        assert_eq!(layer.fade(), 0.0);
    }

    #[test]
    fn test_zero_opacity_issues_no_draw_calls() {
        let mut backend = CpuBackend::new();
        let mut root = solid_layer(&mut backend, 8, 8, RED);
        root.add_layer(layer_ref(solid_layer(&mut backend, 8, 8, BLUE)));
        let stage = identity_stage(&mut backend);
        root.add_postprocess(&mut backend, stage).unwrap();
        root.opacity_mut().set(0.0);

        let timeline = Timeline::new();
        let app = backend.create_target(&TargetDesc::new(8, 8, "app")).unwrap();
        backend.reset_stats();

        root.update(&timeline, &mut backend).unwrap();
        {
            let mut canvas = Canvas::new(&mut backend, &app);
            root.draw_tex(&mut canvas, app.bounds()).unwrap();
            root.draw_final_tex(&mut canvas, app.bounds()).unwrap();
        }
        assert_eq!(backend.stats().target_writes(), 0);
    }

    #[test]
    fn test_hidden_child_is_not_rendered() {
        let mut backend = CpuBackend::new();
        let child = layer_ref(solid_layer(&mut backend, 4, 4, BLUE));
        child.borrow_mut().opacity_mut().set(0.0);
        let mut root = Layer::new(&mut backend, 4, 4, 0).unwrap();
        root.add_layer(child);

        backend.reset_stats();
        root.update(&Timeline::new(), &mut backend).unwrap();
        // Only the root's own clear
        assert_eq!(backend.stats().clears, 1);
        assert_eq!(backend.stats().draw_calls, 0);
    }

    #[test]
    fn test_children_composite_in_order() {
        let mut backend = CpuBackend::new();
        let mut root = Layer::new(&mut backend, 4, 4, 0).unwrap();
        root.add_layer(layer_ref(solid_layer(&mut backend, 4, 4, RED)));
        root.add_layer(layer_ref(solid_layer(&mut backend, 4, 4, BLUE)));
        root.update(&Timeline::new(), &mut backend).unwrap();

        let pixels = present(&mut backend, &mut root, false);
        assert!(pixels.iter().all(|p| *p == BLUE));
    }

    #[test]
    fn test_scenes_draw_over_children() {
        let mut backend = CpuBackend::new();
        let mut root = solid_layer(&mut backend, 4, 4, RED);
        root.add_layer(layer_ref(solid_layer(&mut backend, 4, 4, BLUE)));
        root.update(&Timeline::new(), &mut backend).unwrap();

        let pixels = present(&mut backend, &mut root, false);
        assert!(pixels.iter().all(|p| *p == RED));
    }

    #[test]
    fn test_draw_tex_applies_opacity() {
        let mut backend = CpuBackend::new();
        let mut layer = solid_layer(&mut backend, 2, 2, [1.0, 1.0, 1.0, 1.0]);
        layer.opacity_mut().set(0.25);
        layer.update(&Timeline::new(), &mut backend).unwrap();

        let px = present(&mut backend, &mut layer, false)[0];
        assert_eq!(px, [0.25, 0.25, 0.25, 0.25]);
    }

    #[test]
    fn test_show_scene_crossfade_is_simultaneous() {
        let mut backend = CpuBackend::new();
        let mut layer = Layer::new(&mut backend, 2, 2, 0).unwrap();
        layer.add_scene(scene_ref(Scene::new(SolidColor::new(RED))));
        layer.add_scene(scene_ref(Scene::with_opacity(SolidColor::new(BLUE), 0.0)));
        layer.add_scene(scene_ref(Scene::with_opacity(SolidColor::new(RED), 0.0)));
        let mut timeline = Timeline::new();
        layer.advance(&timeline).unwrap();
        layer.show_scene(&timeline, 1, 1.0).unwrap();

        let opacities = |layer: &Layer| -> Vec<f32> {
            layer.scenes().iter().map(|s| s.borrow().opacity().value()).collect()
        };
        let mut previous = opacities(&layer);
        for _ in 0..10 {
            timeline.step(0.1);
            layer.advance(&timeline).unwrap();
            let current = opacities(&layer);
            assert!(current[1] >= previous[1]);
            assert!(current[0] <= previous[0]);
            assert!(current[2] <= previous[2]);
            // Incoming and outgoing move by the same amount
            assert!(((current[1] - previous[1]) - (previous[0] - current[0])).abs() < 1e-4);
            previous = current;
        }
        timeline.step(0.1);
        layer.advance(&timeline).unwrap();
        assert_eq!(opacities(&layer), vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_show_layer_crossfade() {
        let mut backend = CpuBackend::new();
        let mut root = Layer::new(&mut backend, 2, 2, 0).unwrap();
        root.add_layer(layer_ref(solid_layer(&mut backend, 2, 2, RED)));
        root.add_layer(layer_ref(solid_layer(&mut backend, 2, 2, BLUE)));
        let mut timeline = Timeline::new();
        root.advance(&timeline).unwrap();

        root.show_layer(&timeline, 1, 2.0).unwrap();
        timeline.step(1.0);
        root.advance(&timeline).unwrap();
        let a = root.children()[0].borrow().opacity().value();
        let b = root.children()[1].borrow().opacity().value();
        assert!((a - 0.5).abs() < 1e-6);
        assert!((b - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_show_scene_out_of_range_touches_nothing() {
        let mut backend = CpuBackend::new();
        let mut layer = Layer::new(&mut backend, 2, 2, 0).unwrap();
        layer.add_scene(scene_ref(Scene::new(SolidColor::new(RED))));
        layer.add_scene(scene_ref(Scene::with_opacity(SolidColor::new(BLUE), 0.0)));

        let timeline = Timeline::new();
        let err = layer.show_scene(&timeline, 2, 1.0).unwrap_err();
        assert!(matches!(err, ComposeError::IndexOutOfRange { kind: "scene", index: 2, len: 2 }));
        assert!(layer.scenes().iter().all(|s| !s.borrow().opacity().is_animating()));

        assert!(matches!(
            layer.show_layer(&timeline, 0, 1.0),
            Err(ComposeError::IndexOutOfRange { kind: "layer", index: 0, len: 0 })
        ));
    }

    #[test]
    fn test_show_scene_starts_at_current_time() {
        let mut backend = CpuBackend::new();
        let mut layer = Layer::new(&mut backend, 2, 2, 0).unwrap();
        layer.add_scene(scene_ref(Scene::new(SolidColor::new(RED))));
        layer.add_scene(scene_ref(Scene::with_opacity(SolidColor::new(BLUE), 0.0)));
        let mut timeline = Timeline::new();
        layer.update(&timeline, &mut backend).unwrap();

        // Time moves on before the crossfade is requested
        timeline.step(5.0);
        layer.show_scene(&timeline, 1, 2.0).unwrap();

        let sample = |layer: &Layer| -> (f32, f32) {
            (
                layer.scenes()[0].borrow().opacity().value(),
                layer.scenes()[1].borrow().opacity().value(),
            )
        };
        layer.advance(&timeline).unwrap();
        assert_eq!(sample(&layer), (1.0, 0.0));

        timeline.step(1.0);
        layer.advance(&timeline).unwrap();
        let (a, b) = sample(&layer);
        assert!((a - 0.5).abs() < 1e-6 && (b - 0.5).abs() < 1e-6);

        timeline.step(1.0);
        layer.advance(&timeline).unwrap();
        assert_eq!(sample(&layer), (0.0, 1.0));
    }

    #[test]
    fn test_show_scene_with_repeated_scene() {
        let mut backend = CpuBackend::new();
        let mut layer = Layer::new(&mut backend, 2, 2, 0).unwrap();
        let shared = scene_ref(Scene::new(SolidColor::new(RED)));
        let other = scene_ref(Scene::with_opacity(SolidColor::new(BLUE), 0.0));
        layer.add_scene(shared.clone());
        layer.add_scene(shared.clone());
        layer.add_scene(other.clone());
        let timeline = Timeline::new();

        layer.show_scene(&timeline, 2, 1.0).unwrap();
        assert_eq!(shared.borrow().opacity().target(), 0.0);
        assert_eq!(other.borrow().opacity().target(), 1.0);

        // The later entry of a repeated scene wins
        layer.show_scene(&timeline, 1, 1.0).unwrap();
        assert_eq!(shared.borrow().opacity().target(), 1.0);
        layer.show_scene(&timeline, 0, 1.0).unwrap();
        assert_eq!(shared.borrow().opacity().target(), 0.0);
    }

    #[test]
    fn test_show_layer_with_repeated_child() {
        let mut backend = CpuBackend::new();
        let mut root = Layer::new(&mut backend, 2, 2, 0).unwrap();
        let shared = layer_ref(solid_layer(&mut backend, 2, 2, RED));
        let other = layer_ref(solid_layer(&mut backend, 2, 2, BLUE));
        root.add_layer(shared.clone());
        root.add_layer(other.clone());
        root.add_layer(shared.clone());
        let mut timeline = Timeline::new();
        root.advance(&timeline).unwrap();

        root.show_layer(&timeline, 2, 1.0).unwrap();
        timeline.step(1.0);
        root.update(&timeline, &mut backend).unwrap();
        assert_eq!(shared.borrow().opacity().value(), 1.0);
        assert_eq!(other.borrow().opacity().value(), 0.0);
    }

    #[test]
    fn test_show_scene_while_scene_borrowed_touches_nothing() {
        let mut backend = CpuBackend::new();
        let mut layer = Layer::new(&mut backend, 2, 2, 0).unwrap();
        let first = scene_ref(Scene::new(SolidColor::new(RED)));
        let second = scene_ref(Scene::with_opacity(SolidColor::new(BLUE), 0.0));
        layer.add_scene(first.clone());
        layer.add_scene(second.clone());

        let held = second.borrow_mut();
        let err = layer.show_scene(&Timeline::new(), 1, 1.0).unwrap_err();
        assert!(matches!(err, ComposeError::LayerCycle));
        drop(held);
        assert!(!first.borrow().opacity().is_animating());
        assert!(!second.borrow().opacity().is_animating());
    }

    #[test]
    fn test_identity_chain_matches_draw_tex() {
        for stages in 1..=4 {
            let mut backend = CpuBackend::new();
            let mut layer = Layer::new(&mut backend, 6, 4, 0).unwrap();
            layer.add_scene(scene_ref(Scene::new(SolidColor::new([0.2, 0.4, 0.6, 0.8]))));
            layer.add_layer(layer_ref(solid_layer(&mut backend, 3, 2, RED)));
            for _ in 0..stages {
                let stage = identity_stage(&mut backend);
                layer.add_postprocess(&mut backend, stage).unwrap();
            }
            layer.update(&Timeline::new(), &mut backend).unwrap();

            let direct = present(&mut backend, &mut layer, false);
            let processed = present(&mut backend, &mut layer, true);
            assert_eq!(direct, processed, "chain of {stages} identity stages");
        }
    }

    #[test]
    fn test_chain_uses_exactly_two_buffers_without_aliasing() {
        let mut backend = CpuBackend::new();
        let mut layer = solid_layer(&mut backend, 4, 4, RED);
        let calls = Rc::new(RefCell::new(Vec::new()));
        for _ in 0..5 {
            let stage = Recording { calls: calls.clone() };
            layer.add_postprocess(&mut backend, postprocess_ref(stage)).unwrap();
        }
        assert!(layer.has_process_buffers());
        assert_eq!(backend.stats().targets_created, 3);

        layer.update(&Timeline::new(), &mut backend).unwrap();
        let processed = layer.run_postprocess_chain(&mut backend).unwrap();
        assert_eq!(backend.stats().targets_created, 3);

        let calls = calls.borrow();
        assert_eq!(calls.len(), 5);
        for (i, (input, output)) in calls.iter().enumerate() {
            assert_ne!(input, output);
            assert_ne!(*input, layer.primary_target());
            assert_ne!(*output, layer.primary_target());
            if i > 0 {
                // Each stage reads what the previous one wrote
                assert_eq!(*input, calls[i - 1].1);
            }
        }
        assert_eq!(processed, calls[4].1);
        assert!(backend.read_pixels(processed).unwrap().iter().all(|p| *p == RED));
    }

    #[test]
    fn test_chain_without_buffers_is_an_error() {
        let mut backend = CpuBackend::new();
        let mut layer = Layer::new(&mut backend, 2, 2, 0).unwrap();
        assert!(matches!(
            layer.run_postprocess_chain(&mut backend),
            Err(ComposeError::MissingProcessBuffers)
        ));
    }

    #[test]
    fn test_invert_postprocess() {
        let mut backend = CpuBackend::new();
        let mut layer = solid_layer(&mut backend, 4, 4, [0.2, 0.2, 0.2, 1.0]);
        let stage = invert::create(&mut backend).unwrap();
        layer.add_postprocess(&mut backend, postprocess_ref(stage)).unwrap();
        layer.update(&Timeline::new(), &mut backend).unwrap();

        for px in present(&mut backend, &mut layer, true) {
            assert!((px[0] - 0.8).abs() < 1e-6);
            assert!((px[1] - 0.8).abs() < 1e-6);
            assert!((px[2] - 0.8).abs() < 1e-6);
            assert_eq!(px[3], 1.0);
        }
        // The unprocessed image is untouched
        assert!(present(&mut backend, &mut layer, false)
            .iter()
            .all(|p| (p[0] - 0.2).abs() < 1e-6));
    }

    #[test]
    fn test_fade_zero_frames_are_identical() {
        let mut backend = CpuBackend::new();
        let mut layer = solid_layer(&mut backend, 4, 4, [0.3, 0.5, 0.7, 0.5]);
        let timeline = Timeline::new();

        layer.update(&timeline, &mut backend).unwrap();
        let first = backend.read_pixels(layer.primary_target()).unwrap();
        layer.update(&timeline, &mut backend).unwrap();
        let second = backend.read_pixels(layer.primary_target()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_fade_decays_previous_frame() {
        let fade = 0.5;
        let mut backend = CpuBackend::new();
        let mut layer = solid_layer(&mut backend, 2, 2, [1.0, 1.0, 1.0, 1.0]);
        layer.set_fade(fade);
        let timeline = Timeline::new();

        // Frame 0 draws white, later frames draw nothing
        layer.update(&timeline, &mut backend).unwrap();
        layer.scenes()[0].borrow_mut().opacity_mut().set(0.0);

        for k in 1..=4 {
            layer.update(&timeline, &mut backend).unwrap();
            let px = backend.read_pixels(layer.primary_target()).unwrap()[0];
            let expected = fade.powi(k);
            assert!((px[0] - expected).abs() < 1e-5, "frame {k}: {} vs {expected}", px[0]);
            assert!((px[3] - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_crossfade_scenario_800x600() {
        let mut backend = CpuBackend::new();
        let mut root = Layer::new(&mut backend, 800, 600, 0).unwrap();
        root.add_scene(scene_ref(Scene::new(SolidColor::new(RED))));
        root.add_scene(scene_ref(Scene::with_opacity(SolidColor::new(BLUE), 0.0)));

        let mut timeline = Timeline::new();
        root.advance(&timeline).unwrap();
        root.show_scene(&timeline, 1, 2.0).unwrap();

        let sample = |root: &Layer| -> (f32, f32) {
            (
                root.scenes()[0].borrow().opacity().value(),
                root.scenes()[1].borrow().opacity().value(),
            )
        };

        root.advance(&timeline).unwrap();
        let (a, b) = sample(&root);
        assert!((a - 1.0).abs() < 1e-6 && b.abs() < 1e-6);

        timeline.step(1.0);
        root.advance(&timeline).unwrap();
        let (a, b) = sample(&root);
        assert!((a - 0.5).abs() < 1e-6 && (b - 0.5).abs() < 1e-6);

        timeline.step(1.0);
        root.update(&timeline, &mut backend).unwrap();
        let (a, b) = sample(&root);
        assert!(a.abs() < 1e-6 && (b - 1.0).abs() < 1e-6);

        let pixels = present(&mut backend, &mut root, true);
        assert_eq!(pixels.len(), 800 * 600);
        assert!(pixels.iter().all(|p| *p == BLUE));
    }

    #[test]
    fn test_cycle_is_reported() {
        let mut backend = CpuBackend::new();
        let root = layer_ref(Layer::new(&mut backend, 2, 2, 0).unwrap());
        root.borrow_mut().add_layer(root.clone());

        let result = root.borrow_mut().update(&Timeline::new(), &mut backend);
        assert!(matches!(result, Err(ComposeError::LayerCycle)));
    }

    #[test]
    fn test_shared_child_renders_under_two_parents() {
        let mut backend = CpuBackend::new();
        let shared = layer_ref(solid_layer(&mut backend, 2, 2, BLUE));
        let mut left = Layer::new(&mut backend, 2, 2, 0).unwrap();
        let mut right = Layer::new(&mut backend, 2, 2, 0).unwrap();
        left.add_layer(shared.clone());
        right.add_layer(shared);

        let timeline = Timeline::new();
        left.update(&timeline, &mut backend).unwrap();
        right.update(&timeline, &mut backend).unwrap();
        assert!(present(&mut backend, &mut left, false).iter().all(|p| *p == BLUE));
        assert!(present(&mut backend, &mut right, false).iter().all(|p| *p == BLUE));
    }

    #[test]
    fn test_dropping_layer_releases_targets() {
        let mut backend = CpuBackend::new();
        let mut layer = Layer::new(&mut backend, 2, 2, 0).unwrap();
        let stage = identity_stage(&mut backend);
        layer.add_postprocess(&mut backend, stage).unwrap();
        assert_eq!(backend.stats().live_targets, 3);

        drop(layer);
        backend.maintain();
        assert_eq!(backend.stats().live_targets, 0);
        assert_eq!(backend.stats().targets_released, 3);
    }
}
