//! Frame snapshots
//!
//! Reads a render target back and writes it as an 8-bit RGBA PNG.

use std::path::Path;

use crate::error::{ComposeError, ComposeResult};
use crate::render::{RenderBackend, TargetId};

/// Convert straight-alpha float pixels to an RGBA8 image
pub fn to_rgba8(pixels: &[[f32; 4]], width: u32, height: u32) -> image::RgbaImage {
    image::RgbaImage::from_fn(width, height, |x, y| {
        let px = pixels
            .get(y as usize * width as usize + x as usize)
            .copied()
            .unwrap_or([0.0; 4]);
        image::Rgba(px.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
    })
}

/// Read `target` back from `backend` and save it to `path`
pub fn save_png(
    backend: &mut dyn RenderBackend,
    target: TargetId,
    path: impl AsRef<Path>,
) -> ComposeResult<()> {
    let path = path.as_ref();
    let (width, height) = backend.target_size(target)?;
    let pixels = backend.read_pixels(target)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ComposeError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    to_rgba8(&pixels, width, height).save_with_format(path, image::ImageFormat::Png)?;
    tracing::info!(path = %path.display(), width, height, "Saved snapshot");
    Ok(())
}
