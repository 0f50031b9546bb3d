//! Black Levels Effect
//!
//! Remaps the input range `[black, white]` to `[0, 1]`, then applies a
//! brightness curve and a contrast curve around mid grey.
//!
//! Parameter slots:
//! - 0: black level
//! - 1: white level
//! - 2: brightness exponent (1 = unchanged)
//! - 3: contrast (1 = unchanged)

use crate::effects::shader::ShaderPostprocess;
use crate::effects::traits::{EffectParams, EffectSource, PixelKernel, Postprocess, Sampler};
use crate::error::ComposeResult;
use crate::render::{RenderBackend, TargetId};

/// Smallest level range; keeps the remap finite when black == white
const MIN_RANGE: f32 = 1e-6;

const FRAGMENT: &str = r#"
fn effect(uv: vec2<f32>) -> vec4<f32> {
    let tex = sample_input(uv);
    let black = vec3<f32>(param(0u));
    let white = vec3<f32>(param(1u));
    let range = max(white - black, vec3<f32>(1e-6));

    // Levels
    var col = (min(max(tex.rgb, black), white) - black) / range;
    // Brightness curve
    col = vec3<f32>(1.0) - pow(max(vec3<f32>(1.0) - col, vec3<f32>(0.0)), vec3<f32>(param(2u)));
    // Contrast curve
    col = mix(vec3<f32>(0.5), col, vec3<f32>(param(3u)));

    return vec4<f32>(col, tex.a);
}
"#;

/// Per-channel transfer curve shared by the software kernel and tests
pub fn transfer(value: f32, black: f32, white: f32, brightness: f32, contrast: f32) -> f32 {
    let range = (white - black).max(MIN_RANGE);
    let levelled = (value.max(black).min(white) - black) / range;
    let bright = 1.0 - (1.0 - levelled).max(0.0).powf(brightness);
    0.5 + (bright - 0.5) * contrast
}

fn kernel(sampler: &Sampler<'_>, uv: [f32; 2], params: &EffectParams) -> [f32; 4] {
    let c = sampler.sample(uv);
    let curve = |v| transfer(v, params.float(0), params.float(1), params.float(2), params.float(3));
    [curve(c[0]), curve(c[1]), curve(c[2]), c[3]]
}

pub fn source() -> EffectSource {
    EffectSource::new("black_levels", FRAGMENT, Some(kernel as PixelKernel))
}

/// Levels, brightness and contrast adjustment stage
#[derive(Debug)]
pub struct BlackLevelsProcess {
    shader: ShaderPostprocess,
    black: f32,
    white: f32,
    brightness: f32,
    contrast: f32,
}

impl BlackLevelsProcess {
    /// Create with identity settings (levels 0..1, brightness 1, contrast 1)
    pub fn new(backend: &mut dyn RenderBackend) -> ComposeResult<Self> {
        Self::with_levels(backend, 0.0, 1.0)
    }

    pub fn with_levels(
        backend: &mut dyn RenderBackend,
        black: f32,
        white: f32,
    ) -> ComposeResult<Self> {
        Ok(Self {
            shader: ShaderPostprocess::new(backend, &source())?,
            black,
            white,
            brightness: 1.0,
            contrast: 1.0,
        })
    }

    pub fn set_levels(&mut self, black: f32, white: f32) {
        self.black = black;
        self.white = white;
    }

    pub fn set_brightness(&mut self, brightness: f32) {
        self.brightness = brightness;
    }

    pub fn set_contrast(&mut self, contrast: f32) {
        self.contrast = contrast;
    }

    /// Current `(black, white)` levels
    pub fn levels(&self) -> (f32, f32) {
        (self.black, self.white)
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    pub fn contrast(&self) -> f32 {
        self.contrast
    }

    fn update_uniforms(&mut self) {
        let params = self.shader.params_mut();
        params.set_float(0, self.black);
        params.set_float(1, self.white);
        params.set_float(2, self.brightness);
        params.set_float(3, self.contrast);
    }
}

impl Postprocess for BlackLevelsProcess {
    fn label(&self) -> &str {
        self.shader.label()
    }

    fn process(
        &mut self,
        backend: &mut dyn RenderBackend,
        input: TargetId,
        output: TargetId,
    ) -> ComposeResult<()> {
        self.update_uniforms();
        self.shader.process(backend, input, output)
    }
}
