//! Blend mode definitions and utilities
//!
//! Defines how a textured or solid pass combines with the target and
//! provides both the wgpu blend state and the equivalent software math,
//! so the two backends agree pixel for pixel (up to 8-bit quantization).

/// Blend modes for compositing passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Straight-alpha source-over
    /// Color = Source × SourceAlpha + Dest × (1 - SourceAlpha)
    /// Alpha = SourceAlpha + DestAlpha × (1 - SourceAlpha)
    #[default]
    Alpha,

    /// Overwrite the destination (used to seed a postprocess chain)
    Replace,
}

impl BlendMode {
    /// Convert to a wgpu blend state. `None` disables blending.
    pub fn to_blend_state(self) -> Option<wgpu::BlendState> {
        match self {
            BlendMode::Alpha => Some(wgpu::BlendState::ALPHA_BLENDING),
            BlendMode::Replace => None,
        }
    }

    /// Blend one straight-alpha source pixel over a destination pixel
    pub fn blend(self, src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
        match self {
            BlendMode::Alpha => {
                let a = src[3];
                let inv = 1.0 - a;
                [
                    src[0] * a + dst[0] * inv,
                    src[1] * a + dst[1] * inv,
                    src[2] * a + dst[2] * inv,
                    a + dst[3] * inv,
                ]
            }
            BlendMode::Replace => src,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlendMode::Alpha => "Alpha",
            BlendMode::Replace => "Replace",
        }
    }
}

impl std::fmt::Display for BlendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_mode_default() {
        assert_eq!(BlendMode::default(), BlendMode::Alpha);
    }

    #[test]
    fn test_blend_mode_display() {
        assert_eq!(format!("{}", BlendMode::Alpha), "Alpha");
        assert_eq!(format!("{}", BlendMode::Replace), "Replace");
    }

    #[test]
    fn test_alpha_blend_opaque_source_wins() {
        let out = BlendMode::Alpha.blend([0.2, 0.4, 0.6, 1.0], [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(out, [0.2, 0.4, 0.6, 1.0]);
    }

    #[test]
    fn test_alpha_blend_half() {
        let out = BlendMode::Alpha.blend([1.0, 0.0, 0.0, 0.5], [0.0, 0.0, 1.0, 1.0]);
        assert!((out[0] - 0.5).abs() < 1e-6);
        assert!((out[2] - 0.5).abs() < 1e-6);
        assert!((out[3] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_black_fill_scales_destination() {
        // Fade-to-black pass: black at alpha (1 - fade) keeps `fade` of the old color
        let fade = 0.75;
        let out = BlendMode::Alpha.blend([0.0, 0.0, 0.0, 1.0 - fade], [0.8, 0.4, 0.2, 1.0]);
        assert!((out[0] - 0.6).abs() < 1e-6);
        assert!((out[1] - 0.3).abs() < 1e-6);
        assert!((out[2] - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_replace_ignores_destination() {
        let src = [0.1, 0.2, 0.3, 0.4];
        assert_eq!(BlendMode::Replace.blend(src, [1.0; 4]), src);
    }

    #[test]
    fn test_to_blend_state() {
        assert!(BlendMode::Alpha.to_blend_state().is_some());
        assert!(BlendMode::Replace.to_blend_state().is_none());
    }
}
