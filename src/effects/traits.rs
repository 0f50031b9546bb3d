//! Postprocess traits and effect program descriptions
//!
//! This module defines the contract between a layer's postprocess chain
//! and the stages in it:
//! - `Postprocess` - a single-input, single-output image transform
//! - `EffectSource` - a compilable effect program (WGSL + software kernel)
//! - `EffectParams` - uniform block sampled by effect programs

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use crate::error::ComposeResult;
use crate::render::{RenderBackend, TargetId};

/// Number of float parameter slots available to an effect
pub const EFFECT_PARAM_SLOTS: usize = 16;

/// Uniform data passed to effect programs
///
/// Laid out for direct upload: 16 parameter floats (4 vec4s) followed by
/// the output resolution and padding, 80 bytes total.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct EffectParams {
    /// Effect-specific parameter values
    pub params: [f32; EFFECT_PARAM_SLOTS],
    /// Output size in pixels, filled in by the backend
    pub resolution: [f32; 2],
    pub _padding: [f32; 2],
}

impl Default for EffectParams {
    fn default() -> Self {
        Self {
            params: [0.0; EFFECT_PARAM_SLOTS],
            resolution: [0.0; 2],
            _padding: [0.0; 2],
        }
    }
}

impl EffectParams {
    /// Set a float parameter at the given index (ignored when out of range)
    pub fn set_float(&mut self, index: usize, value: f32) {
        if index < self.params.len() {
            self.params[index] = value;
        }
    }

    pub fn float(&self, index: usize) -> f32 {
        self.params.get(index).copied().unwrap_or(0.0)
    }
}

/// Read-only view of an input image for software kernels
#[derive(Debug, Clone, Copy)]
pub struct Sampler<'a> {
    pixels: &'a [[f32; 4]],
    width: u32,
    height: u32,
}

impl<'a> Sampler<'a> {
    pub fn new(pixels: &'a [[f32; 4]], width: u32, height: u32) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize, "pixel buffer size");
        Self { pixels, width, height }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Nearest-neighbour sample at normalized `uv`, clamped to the edge
    pub fn sample(&self, uv: [f32; 2]) -> [f32; 4] {
        let x = (uv[0] * self.width as f32).floor().clamp(0.0, (self.width - 1) as f32) as u32;
        let y = (uv[1] * self.height as f32).floor().clamp(0.0, (self.height - 1) as f32) as u32;
        self.pixels[y as usize * self.width as usize + x as usize]
    }
}

/// Software implementation of an effect: output color at `uv`
pub type PixelKernel = fn(&Sampler<'_>, [f32; 2], &EffectParams) -> [f32; 4];

/// A compilable effect program.
///
/// `fragment` is WGSL that defines `fn effect(uv: vec2<f32>) -> vec4<f32>`.
/// It may call `sample_input(uv)` and `param(i)` from the shared prelude.
/// `kernel` is the same transform for the software backend; backends that
/// cannot run the program reject it at compile time.
#[derive(Clone)]
pub struct EffectSource {
    pub label: Cow<'static, str>,
    pub fragment: Cow<'static, str>,
    pub kernel: Option<PixelKernel>,
}

impl EffectSource {
    pub fn new(
        label: impl Into<Cow<'static, str>>,
        fragment: impl Into<Cow<'static, str>>,
        kernel: Option<PixelKernel>,
    ) -> Self {
        Self {
            label: label.into(),
            fragment: fragment.into(),
            kernel,
        }
    }
}

impl std::fmt::Debug for EffectSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectSource")
            .field("label", &self.label)
            .field("fragment_len", &self.fragment.len())
            .field("has_kernel", &self.kernel.is_some())
            .finish()
    }
}

/// A postprocessing stage in a layer's chain.
///
/// `process` reads `input` and fully overwrites `output`. Both are live
/// targets of the same size and never the same target. Stages must not keep
/// target ids between calls.
pub trait Postprocess {
    /// Name used in logs
    fn label(&self) -> &str;

    fn process(
        &mut self,
        backend: &mut dyn RenderBackend,
        input: TargetId,
        output: TargetId,
    ) -> ComposeResult<()>;
}

/// Shared handle to a postprocess stage
pub type PostprocessRef = Rc<RefCell<dyn Postprocess>>;

/// Wrap a stage for attachment to a layer
pub fn postprocess_ref<P: Postprocess + 'static>(stage: P) -> PostprocessRef {
    Rc::new(RefCell::new(stage))
}
