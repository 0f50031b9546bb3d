//! Software render backend
//!
//! Targets are straight-alpha RGBA `f32` buffers. Coverage is decided at
//! pixel centers and textures are sampled nearest-neighbour at the same
//! centers, so a full-target blit is an exact copy. Multisampled targets are
//! accepted for API parity and rasterized at one sample per pixel.

use std::collections::HashMap;

use crate::effects::{EffectParams, EffectSource, PixelKernel, Sampler};
use crate::error::{ComposeError, ComposeResult};
use crate::render::{
    BlendMode, EffectId, Rect, ReleaseQueue, RenderBackend, RenderTarget, TargetDesc, TargetId,
    TRANSPARENT,
};
use crate::telemetry::RenderStats;

struct CpuTarget {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 4]>,
}

impl CpuTarget {
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Pixel index range covered by `rect`, clipped to the target
    fn covered(&self, rect: Rect) -> Option<(u32, u32, u32, u32)> {
        if rect.is_empty() {
            return None;
        }
        // Pixel (x, y) is covered when its center lies inside the rect
        let x0 = (rect.x - 0.5).ceil().max(0.0) as u32;
        let y0 = (rect.y - 0.5).ceil().max(0.0) as u32;
        let x1 = ((rect.right() - 0.5).ceil().max(0.0) as u32).min(self.width);
        let y1 = ((rect.bottom() - 0.5).ceil().max(0.0) as u32).min(self.height);
        (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
    }
}

struct CpuEffect {
    label: String,
    kernel: PixelKernel,
}

/// Software rasterizer implementing [`RenderBackend`]
pub struct CpuBackend {
    targets: HashMap<TargetId, CpuTarget>,
    effects: Vec<CpuEffect>,
    next_target: u32,
    release: ReleaseQueue,
    stats: RenderStats,
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuBackend {
    pub fn new() -> Self {
        Self {
            targets: HashMap::new(),
            effects: Vec::new(),
            next_target: 0,
            release: ReleaseQueue::new(),
            stats: RenderStats::default(),
        }
    }

    fn target(&self, id: TargetId) -> ComposeResult<&CpuTarget> {
        self.targets.get(&id).ok_or(ComposeError::MissingTarget(id))
    }

    fn target_mut(&mut self, id: TargetId) -> ComposeResult<&mut CpuTarget> {
        self.targets.get_mut(&id).ok_or(ComposeError::MissingTarget(id))
    }

    /// Temporarily take a target out of the map so it can be written while
    /// another target is read.
    fn take_target(&mut self, id: TargetId) -> ComposeResult<CpuTarget> {
        self.targets.remove(&id).ok_or(ComposeError::MissingTarget(id))
    }
}

impl RenderBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn create_target(&mut self, desc: &TargetDesc) -> ComposeResult<RenderTarget> {
        self.maintain();
        desc.validate()?;
        let pixel_count = (desc.width as usize)
            .checked_mul(desc.height as usize)
            .ok_or(ComposeError::InvalidSize {
                width: desc.width,
                height: desc.height,
            })?;

        let id = TargetId(self.next_target);
        self.next_target += 1;
        self.targets.insert(
            id,
            CpuTarget {
                width: desc.width,
                height: desc.height,
                pixels: vec![TRANSPARENT; pixel_count],
            },
        );
        self.stats.targets_created += 1;

        tracing::debug!(
            target_id = id.0,
            width = desc.width,
            height = desc.height,
            samples = desc.samples,
            label = %desc.label,
            "Created software render target"
        );
        Ok(RenderTarget::new(id, desc, self.release.clone()))
    }

    fn maintain(&mut self) {
        for id in self.release.drain() {
            if self.targets.remove(&id).is_some() {
                self.stats.targets_released += 1;
                tracing::trace!(target_id = id.0, "Released software render target");
            }
        }
    }

    fn target_size(&self, target: TargetId) -> ComposeResult<(u32, u32)> {
        self.target(target).map(|t| (t.width, t.height))
    }

    fn clear(&mut self, target: TargetId, color: [f32; 4]) -> ComposeResult<()> {
        self.target_mut(target)?.pixels.fill(color);
        self.stats.clears += 1;
        Ok(())
    }

    fn fill_rect(&mut self, target: TargetId, rect: Rect, color: [f32; 4]) -> ComposeResult<()> {
        let dst = self.target_mut(target)?;
        if let Some((x0, y0, x1, y1)) = dst.covered(rect) {
            for y in y0..y1 {
                for x in x0..x1 {
                    let index = dst.index(x, y);
                    let px = &mut dst.pixels[index];
                    *px = BlendMode::Alpha.blend(color, *px);
                }
            }
        }
        self.stats.draw_calls += 1;
        Ok(())
    }

    fn draw_texture(
        &mut self,
        target: TargetId,
        source: TargetId,
        bounds: Rect,
        opacity: f32,
        blend: BlendMode,
    ) -> ComposeResult<()> {
        if target == source {
            return Err(ComposeError::TargetAliasing(target));
        }
        self.target(source)?;
        let mut dst = self.take_target(target)?;
        let src = &self.targets[&source];
        let sampler = Sampler::new(&src.pixels, src.width, src.height);

        if let Some((x0, y0, x1, y1)) = dst.covered(bounds) {
            for y in y0..y1 {
                let v = (y as f32 + 0.5 - bounds.y) / bounds.height;
                for x in x0..x1 {
                    let u = (x as f32 + 0.5 - bounds.x) / bounds.width;
                    let mut color = sampler.sample([u, v]);
                    color[3] *= opacity;
                    let index = dst.index(x, y);
                    let px = &mut dst.pixels[index];
                    *px = blend.blend(color, *px);
                }
            }
        }
        self.targets.insert(target, dst);
        self.stats.draw_calls += 1;
        Ok(())
    }

    fn compile_effect(&mut self, source: &EffectSource) -> ComposeResult<EffectId> {
        let Some(kernel) = source.kernel else {
            tracing::error!(effect = %source.label, "Effect has no software kernel");
            return Err(ComposeError::EffectCompile {
                label: source.label.to_string(),
                message: "no software kernel provided".to_string(),
            });
        };

        let id = EffectId(self.effects.len() as u32);
        self.effects.push(CpuEffect {
            label: source.label.to_string(),
            kernel,
        });
        tracing::debug!(effect = %source.label, "Registered software effect");
        Ok(id)
    }

    fn run_effect(
        &mut self,
        effect: EffectId,
        params: &EffectParams,
        input: TargetId,
        output: TargetId,
    ) -> ComposeResult<()> {
        if input == output {
            return Err(ComposeError::TargetAliasing(input));
        }
        let kernel = self
            .effects
            .get(effect.0 as usize)
            .map(|program| program.kernel)
            .ok_or(ComposeError::MissingEffect(effect.0))?;
        let (input_width, input_height) = self.target_size(input)?;
        let mut dst = self.take_target(output)?;

        if (input_width, input_height) != (dst.width, dst.height) {
            let err = ComposeError::SizeMismatch {
                input_width,
                input_height,
                output_width: dst.width,
                output_height: dst.height,
            };
            self.targets.insert(output, dst);
            return Err(err);
        }

        let mut params = *params;
        params.resolution = [dst.width as f32, dst.height as f32];
        let src = &self.targets[&input];
        let sampler = Sampler::new(&src.pixels, src.width, src.height);
        for y in 0..dst.height {
            let v = (y as f32 + 0.5) / dst.height as f32;
            for x in 0..dst.width {
                let u = (x as f32 + 0.5) / dst.width as f32;
                let index = dst.index(x, y);
                dst.pixels[index] = kernel(&sampler, [u, v], &params);
            }
        }
        tracing::trace!(effect = %self.effects[effect.0 as usize].label, "Ran software effect");

        self.targets.insert(output, dst);
        self.stats.effect_passes += 1;
        Ok(())
    }

    fn read_pixels(&mut self, target: TargetId) -> ComposeResult<Vec<[f32; 4]>> {
        Ok(self.target(target)?.pixels.clone())
    }

    fn stats(&self) -> RenderStats {
        RenderStats {
            live_targets: self.targets.len().saturating_sub(self.release.len()),
            ..self.stats
        }
    }

    fn reset_stats(&mut self) {
        self.stats = RenderStats::default();
    }
}
