//! Vignette Effect
//!
//! Darkens the image towards its corners. The center is left untouched.

use crate::effects::shader::ShaderPostprocess;
use crate::effects::traits::{EffectParams, EffectSource, PixelKernel, Sampler};
use crate::error::ComposeResult;
use crate::render::RenderBackend;

const FRAGMENT: &str = r#"
fn effect(uv: vec2<f32>) -> vec4<f32> {
    let tex = sample_input(uv);
    let p = (uv - vec2<f32>(0.5)) * 2.0 * 0.8;
    let falloff = max(dot(p, p) - 0.1, 0.0);
    let darken = pow(falloff, 1.8) * 0.3;
    return vec4<f32>(max(tex.rgb - vec3<f32>(darken), vec3<f32>(0.0)), tex.a);
}
"#;

/// Amount subtracted from each color channel at `uv`
pub fn darkening(uv: [f32; 2]) -> f32 {
    let px = (uv[0] - 0.5) * 2.0 * 0.8;
    let py = (uv[1] - 0.5) * 2.0 * 0.8;
    let falloff = (px * px + py * py - 0.1).max(0.0);
    falloff.powf(1.8) * 0.3
}

fn kernel(sampler: &Sampler<'_>, uv: [f32; 2], _params: &EffectParams) -> [f32; 4] {
    let c = sampler.sample(uv);
    let d = darkening(uv);
    [(c[0] - d).max(0.0), (c[1] - d).max(0.0), (c[2] - d).max(0.0), c[3]]
}

pub fn source() -> EffectSource {
    EffectSource::new("vignette", FRAGMENT, Some(kernel as PixelKernel))
}

/// Create a vignette stage on `backend`
pub fn create(backend: &mut dyn RenderBackend) -> ComposeResult<ShaderPostprocess> {
    ShaderPostprocess::new(backend, &source())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::Postprocess;
    use crate::render::{CpuBackend, TargetDesc};

    #[test]
    fn test_vignette_darkening_curve() {
        assert_eq!(darkening([0.5, 0.5]), 0.0);
        assert!(darkening([0.0, 0.0]) > darkening([0.25, 0.25]));
        assert!(darkening([1.0, 0.5]) > 0.0);
    }

    #[test]
    fn test_vignette_center_and_corner() {
        let mut backend = CpuBackend::new();
        let mut stage = create(&mut backend).unwrap();
        let input = backend.create_target(&TargetDesc::new(5, 5, "in")).unwrap();
        let output = backend.create_target(&TargetDesc::new(5, 5, "out")).unwrap();
        backend.clear(input.id(), [0.5, 0.5, 0.5, 1.0]).unwrap();

        stage.process(&mut backend, input.id(), output.id()).unwrap();
        let pixels = backend.read_pixels(output.id()).unwrap();
        assert_eq!(pixels[12], [0.5, 0.5, 0.5, 1.0]);
        assert!(pixels[0][0] < 0.5);
        assert_eq!(pixels[0][3], 1.0);
    }
}
