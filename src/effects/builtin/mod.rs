//! Built-in effects
//!
//! Stock postprocess stages. Each provides a WGSL fragment for the GPU
//! backend and a software kernel with the same math.

pub mod black_levels;
pub mod greyscale;
pub mod invert;
pub mod mirror;
pub mod vignette;

pub use black_levels::BlackLevelsProcess;

use super::traits::{postprocess_ref, PostprocessRef};
use crate::error::ComposeResult;
use crate::render::RenderBackend;

/// Names accepted by [`create_by_name`]
pub const BUILTIN_EFFECTS: [&str; 5] =
    ["mirror", "invert", "greyscale", "black_levels", "vignette"];

/// Create a stock stage by name. Returns `Ok(None)` for unknown names.
pub fn create_by_name(
    name: &str,
    backend: &mut dyn RenderBackend,
) -> ComposeResult<Option<PostprocessRef>> {
    let stage = match name {
        "mirror" => postprocess_ref(mirror::create(backend)?),
        "invert" => postprocess_ref(invert::create(backend)?),
        "greyscale" | "grayscale" => postprocess_ref(greyscale::create(backend)?),
        "black_levels" => postprocess_ref(BlackLevelsProcess::new(backend)?),
        "vignette" => postprocess_ref(vignette::create(backend)?),
        _ => return Ok(None),
    };
    Ok(Some(stage))
}
