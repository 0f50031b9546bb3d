//! Invert Effect
//!
//! Inverts the color channels of the input, keeping alpha.

use crate::effects::shader::ShaderPostprocess;
use crate::effects::traits::{EffectParams, EffectSource, PixelKernel, Sampler};
use crate::error::ComposeResult;
use crate::render::RenderBackend;

const FRAGMENT: &str = r#"
fn effect(uv: vec2<f32>) -> vec4<f32> {
    let col = sample_input(uv);
    return vec4<f32>(vec3<f32>(1.0) - col.rgb, col.a);
}
"#;

fn kernel(sampler: &Sampler<'_>, uv: [f32; 2], _params: &EffectParams) -> [f32; 4] {
    let c = sampler.sample(uv);
    [1.0 - c[0], 1.0 - c[1], 1.0 - c[2], c[3]]
}

pub fn source() -> EffectSource {
    EffectSource::new("invert", FRAGMENT, Some(kernel as PixelKernel))
}

/// Create an invert stage on `backend`
pub fn create(backend: &mut dyn RenderBackend) -> ComposeResult<ShaderPostprocess> {
    ShaderPostprocess::new(backend, &source())
}
