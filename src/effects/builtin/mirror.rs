//! Mirror Effect
//!
//! Reflects the left half of the image onto the right half.

use crate::effects::shader::ShaderPostprocess;
use crate::effects::traits::{EffectParams, EffectSource, PixelKernel, Sampler};
use crate::error::ComposeResult;
use crate::render::RenderBackend;

const FRAGMENT: &str = r#"
fn effect(uv: vec2<f32>) -> vec4<f32> {
    return sample_input(vec2<f32>(0.5 - abs(uv.x - 0.5), uv.y));
}
"#;

fn kernel(sampler: &Sampler<'_>, uv: [f32; 2], _params: &EffectParams) -> [f32; 4] {
    sampler.sample([0.5 - (uv[0] - 0.5).abs(), uv[1]])
}

pub fn source() -> EffectSource {
    EffectSource::new("mirror", FRAGMENT, Some(kernel as PixelKernel))
}

/// Create a mirror stage on `backend`
pub fn create(backend: &mut dyn RenderBackend) -> ComposeResult<ShaderPostprocess> {
    ShaderPostprocess::new(backend, &source())
}
