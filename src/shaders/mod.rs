//! WGSL sources for the GPU backend
//!
//! Shaders are embedded at compile time. Effect programs are assembled by
//! appending an effect body to the shared prelude.

/// Fill and blit shader (`vs_main`, `fs_fill`, `fs_blit`)
pub const QUAD_SHADER: &str = include_str!("quad.wgsl");

/// Prelude every effect body is appended to (`vs_main`, `fs_main`)
pub const EFFECT_PRELUDE: &str = include_str!("effect_prelude.wgsl");

/// Build a complete effect shader from a fragment defining `effect(uv)`
pub fn compose_effect_shader(fragment: &str) -> String {
    let mut source = String::with_capacity(EFFECT_PRELUDE.len() + fragment.len() + 1);
    source.push_str(EFFECT_PRELUDE);
    source.push('\n');
    source.push_str(fragment);
    source
}
