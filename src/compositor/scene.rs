//! Scenes: leaf content units of the layer tree
//!
//! A `Scene` pairs an animatable opacity with a [`SceneContent`]
//! implementation. The layer that owns it updates it once per frame and
//! asks it to draw into the layer's buffer while it is visible.

use std::cell::RefCell;
use std::rc::Rc;

use crate::animation::{AnimatedScalar, Timeline};
use crate::error::ComposeResult;
use crate::render::Canvas;

/// Content hooks driven by the owning layer.
pub trait SceneContent {
    /// Advance internal state. Called once per frame, visible or not.
    fn update(&mut self, _timeline: &Timeline) {}

    /// Draw into the bound canvas. `opacity` is the scene's current opacity
    /// and is never zero here.
    fn draw(&mut self, canvas: &mut Canvas<'_>, opacity: f32) -> ComposeResult<()>;
}

/// A content unit with its own opacity
pub struct Scene {
    opacity: AnimatedScalar,
    content: Box<dyn SceneContent>,
}

/// Shared handle to a scene. Owners sharing a scene share its opacity.
pub type SceneRef = Rc<RefCell<Scene>>;

impl Scene {
    /// Create a fully visible scene
    pub fn new(content: impl SceneContent + 'static) -> Self {
        Self::with_opacity(content, 1.0)
    }

    pub fn with_opacity(content: impl SceneContent + 'static, opacity: f32) -> Self {
        Self {
            opacity: AnimatedScalar::new(opacity),
            content: Box::new(content),
        }
    }

    pub fn opacity(&self) -> &AnimatedScalar {
        &self.opacity
    }

    pub fn opacity_mut(&mut self) -> &mut AnimatedScalar {
        &mut self.opacity
    }

    /// Tick opacity and advance the content
    pub fn update(&mut self, timeline: &Timeline) {
        self.opacity.tick(timeline.now());
        self.content.update(timeline);
    }

    /// Draw the content unless opacity is exactly zero
    pub fn draw_internal(&mut self, canvas: &mut Canvas<'_>) -> ComposeResult<()> {
        if self.opacity.is_zero() {
            return Ok(());
        }
        self.content.draw(canvas, self.opacity.value())
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene").field("opacity", &self.opacity).finish_non_exhaustive()
    }
}

/// Wrap a scene for attachment to one or more layers
pub fn scene_ref(scene: Scene) -> SceneRef {
    Rc::new(RefCell::new(scene))
}

/// Fills the whole viewport with one color, faded by scene opacity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolidColor {
    pub color: [f32; 4],
}

impl SolidColor {
    pub fn new(color: [f32; 4]) -> Self {
        Self { color }
    }
}

impl SceneContent for SolidColor {
    fn draw(&mut self, canvas: &mut Canvas<'_>, opacity: f32) -> ComposeResult<()> {
        let [r, g, b, a] = self.color;
        canvas.fill([r, g, b, a * opacity])
    }
}
