//! Greyscale Effect
//!
//! Replaces color with Rec. 601 luma. Alpha is kept.

use crate::effects::shader::ShaderPostprocess;
use crate::effects::traits::{EffectParams, EffectSource, PixelKernel, Sampler};
use crate::error::ComposeResult;
use crate::render::RenderBackend;

/// Rec. 601 luma weights
pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

const FRAGMENT: &str = r#"
fn effect(uv: vec2<f32>) -> vec4<f32> {
    let tex = sample_input(uv);
    let grey = dot(tex.rgb, vec3<f32>(0.299, 0.587, 0.114));
    return vec4<f32>(grey, grey, grey, tex.a);
}
"#;

fn kernel(sampler: &Sampler<'_>, uv: [f32; 2], _params: &EffectParams) -> [f32; 4] {
    let c = sampler.sample(uv);
    let grey = c[0] * LUMA_WEIGHTS[0] + c[1] * LUMA_WEIGHTS[1] + c[2] * LUMA_WEIGHTS[2];
    [grey, grey, grey, c[3]]
}

pub fn source() -> EffectSource {
    EffectSource::new("greyscale", FRAGMENT, Some(kernel as PixelKernel))
}

/// Create a greyscale stage on `backend`
pub fn create(backend: &mut dyn RenderBackend) -> ComposeResult<ShaderPostprocess> {
    ShaderPostprocess::new(backend, &source())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::Postprocess;
    use crate::render::{CpuBackend, TargetDesc};

    #[test]
    fn test_greyscale_weights() {
        let mut backend = CpuBackend::new();
        let mut stage = create(&mut backend).unwrap();
        let input = backend.create_target(&TargetDesc::new(2, 1, "in")).unwrap();
        let output = backend.create_target(&TargetDesc::new(2, 1, "out")).unwrap();
        backend.clear(input.id(), [1.0, 0.0, 0.0, 0.5]).unwrap();

        stage.process(&mut backend, input.id(), output.id()).unwrap();
        let px = backend.read_pixels(output.id()).unwrap()[0];
        assert!((px[0] - 0.299).abs() < 1e-6);
        assert_eq!(px[0], px[1]);
        assert_eq!(px[1], px[2]);
        assert_eq!(px[3], 0.5);
    }

    #[test]
    fn test_greyscale_white_stays_white() {
        let sum: f32 = LUMA_WEIGHTS.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }
}
