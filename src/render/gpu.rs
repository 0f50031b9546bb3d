//! wgpu render backend
//!
//! Every render target is an `Rgba8Unorm` texture that later passes sample.
//! Multisampled targets also own an MSAA color attachment that each pass
//! renders into and resolves back into the sampled texture.
//!
//! Each command records its own encoder and submits immediately, so a
//! command's output is visible to the next one without extra barriers.

use std::collections::HashMap;

use wgpu::util::DeviceExt;

use crate::effects::{EffectParams, EffectSource};
use crate::error::{ComposeError, ComposeResult};
use crate::gpu_context::{GpuContext, TARGET_FORMAT};
use crate::render::{
    BlendMode, EffectId, Rect, ReleaseQueue, RenderBackend, RenderTarget, TargetDesc, TargetId,
};
use crate::shaders;
use crate::telemetry::RenderStats;

/// Uniform block of the fill/blit shader
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct QuadUniforms {
    /// x, y, width, height in target pixels
    rect: [f32; 4],
    /// target width, target height, opacity, unused
    target_opacity: [f32; 4],
    color: [f32; 4],
}

struct GpuTarget {
    width: u32,
    height: u32,
    samples: u32,
    /// Single-sampled texture holding the resolved image
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    /// MSAA color attachment, resolved into `view` after every pass
    msaa_view: Option<wgpu::TextureView>,
}

impl GpuTarget {
    fn color_attachment(
        &self,
        load: wgpu::LoadOp<wgpu::Color>,
    ) -> wgpu::RenderPassColorAttachment<'_> {
        let (view, resolve_target) = match &self.msaa_view {
            Some(msaa) => (msaa, Some(&self.view)),
            None => (&self.view, None),
        };
        wgpu::RenderPassColorAttachment {
            view,
            resolve_target,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
        }
    }
}

struct GpuEffect {
    label: String,
    module: wgpu::ShaderModule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PipelineKind {
    Fill,
    Blit(BlendMode),
    Effect(EffectId),
}

/// wgpu implementation of [`RenderBackend`]
pub struct GpuBackend {
    ctx: GpuContext,
    quad_shader: wgpu::ShaderModule,
    quad_uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    effect_layout: wgpu::BindGroupLayout,
    fill_pipeline_layout: wgpu::PipelineLayout,
    blit_pipeline_layout: wgpu::PipelineLayout,
    effect_pipeline_layout: wgpu::PipelineLayout,
    sampler: wgpu::Sampler,
    pipelines: HashMap<(PipelineKind, u32), wgpu::RenderPipeline>,
    targets: HashMap<TargetId, GpuTarget>,
    effects: Vec<GpuEffect>,
    next_target: u32,
    release: ReleaseQueue,
    stats: RenderStats,
}

impl GpuBackend {
    /// Create a backend on the default adapter without a window
    pub fn new_headless() -> ComposeResult<Self> {
        Ok(Self::from_context(GpuContext::new_headless_blocking()?))
    }

    /// Create a backend on an existing context
    pub fn from_context(ctx: GpuContext) -> Self {
        let device = &ctx.device;

        let quad_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Quad Shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::QUAD_SHADER.into()),
        });

        let quad_uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Quad Uniform Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let sampler_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        };

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Blit Texture Bind Group Layout"),
            entries: &[texture_entry(0), sampler_entry(1)],
        });

        let effect_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Effect Bind Group Layout"),
            entries: &[
                // Input texture
                texture_entry(0),
                // Sampler
                sampler_entry(1),
                // Parameters uniform
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let fill_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Fill Pipeline Layout"),
            bind_group_layouts: &[&quad_uniform_layout],
            push_constant_ranges: &[],
        });
        let blit_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Blit Pipeline Layout"),
            bind_group_layouts: &[&quad_uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });
        let effect_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Effect Pipeline Layout"),
            bind_group_layouts: &[&effect_layout],
            push_constant_ranges: &[],
        });

        // Nearest sampling at pixel centers makes same-size blits exact copies
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Composer Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            ctx,
            quad_shader,
            quad_uniform_layout,
            texture_layout,
            effect_layout,
            fill_pipeline_layout,
            blit_pipeline_layout,
            effect_pipeline_layout,
            sampler,
            pipelines: HashMap::new(),
            targets: HashMap::new(),
            effects: Vec::new(),
            next_target: 0,
            release: ReleaseQueue::new(),
            stats: RenderStats::default(),
        }
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    fn target(&self, id: TargetId) -> ComposeResult<&GpuTarget> {
        self.targets.get(&id).ok_or(ComposeError::MissingTarget(id))
    }

    fn build_pipeline(
        &self,
        kind: PipelineKind,
        samples: u32,
    ) -> ComposeResult<wgpu::RenderPipeline> {
        let (label, module, layout, fs_entry, blend) = match kind {
            PipelineKind::Fill => (
                "Fill Pipeline".to_string(),
                &self.quad_shader,
                &self.fill_pipeline_layout,
                "fs_fill",
                BlendMode::Alpha.to_blend_state(),
            ),
            PipelineKind::Blit(mode) => (
                format!("Blit {mode} Pipeline"),
                &self.quad_shader,
                &self.blit_pipeline_layout,
                "fs_blit",
                mode.to_blend_state(),
            ),
            PipelineKind::Effect(id) => {
                let effect = self
                    .effects
                    .get(id.0 as usize)
                    .ok_or(ComposeError::MissingEffect(id.0))?;
                (
                    format!("{} Effect Pipeline", effect.label),
                    &effect.module,
                    &self.effect_pipeline_layout,
                    "fs_main",
                    None,
                )
            }
        };

        Ok(self.ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some(fs_entry),
                targets: &[Some(wgpu::ColorTargetState {
                    format: TARGET_FORMAT,
                    blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: samples,
                ..Default::default()
            },
            multiview: None,
            cache: None,
        }))
    }

    /// Build the pipeline for `kind` at `samples` if it is not cached yet
    fn ensure_pipeline(&mut self, kind: PipelineKind, samples: u32) -> ComposeResult<()> {
        if !self.pipelines.contains_key(&(kind, samples)) {
            let pipeline = self.build_pipeline(kind, samples)?;
            tracing::debug!(?kind, samples, "Created render pipeline");
            self.pipelines.insert((kind, samples), pipeline);
        }
        Ok(())
    }

    fn pipeline(&self, kind: PipelineKind, samples: u32) -> ComposeResult<&wgpu::RenderPipeline> {
        self.pipelines
            .get(&(kind, samples))
            .ok_or_else(|| ComposeError::Gpu(format!("pipeline {kind:?} x{samples} not built")))
    }

    fn quad_bind_group(&self, uniforms: &QuadUniforms) -> wgpu::BindGroup {
        let buffer = self.ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Uniform Buffer"),
            contents: bytemuck::bytes_of(uniforms),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Quad Uniform Bind Group"),
            layout: &self.quad_uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    }

    fn submit(&self, encoder: wgpu::CommandEncoder) {
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
    }

    fn encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }
}

impl RenderBackend for GpuBackend {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn create_target(&mut self, desc: &TargetDesc) -> ComposeResult<RenderTarget> {
        self.maintain();
        // wgpu reports oversized textures as uncaptured validation errors
        desc.validate_within(self.ctx.device.limits().max_texture_dimension_2d)?;
        let samples = desc.samples.max(1);
        if !self.ctx.supports_samples(samples) {
            return Err(ComposeError::UnsupportedSamples(desc.samples));
        }

        let size = wgpu::Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: 1,
        };
        let texture = self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&desc.label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let msaa_view = (samples > 1).then(|| {
            let msaa_label = format!("{} MSAA", desc.label);
            self.ctx
                .device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some(&msaa_label),
                    size,
                    mip_level_count: 1,
                    sample_count: samples,
                    dimension: wgpu::TextureDimension::D2,
                    format: TARGET_FORMAT,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });

        let id = TargetId(self.next_target);
        self.next_target += 1;
        self.targets.insert(
            id,
            GpuTarget {
                width: desc.width,
                height: desc.height,
                samples,
                texture,
                view,
                msaa_view,
            },
        );
        self.stats.targets_created += 1;

        // New textures are zero-initialized, which is transparent black
        tracing::debug!(
            target_id = id.0,
            width = desc.width,
            height = desc.height,
            samples,
            label = %desc.label,
            "Created GPU render target"
        );
        Ok(RenderTarget::new(id, desc, self.release.clone()))
    }

    fn maintain(&mut self) {
        for id in self.release.drain() {
            if self.targets.remove(&id).is_some() {
                self.stats.targets_released += 1;
                tracing::trace!(target_id = id.0, "Released GPU render target");
            }
        }
        self.ctx.device.poll(wgpu::Maintain::Poll);
    }

    fn target_size(&self, target: TargetId) -> ComposeResult<(u32, u32)> {
        self.target(target).map(|t| (t.width, t.height))
    }

    fn clear(&mut self, target: TargetId, color: [f32; 4]) -> ComposeResult<()> {
        let dst = self.target(target)?;
        let mut encoder = self.encoder("Clear Encoder");
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Pass"),
                color_attachments: &[Some(dst.color_attachment(wgpu::LoadOp::Clear(wgpu::Color {
                    r: color[0] as f64,
                    g: color[1] as f64,
                    b: color[2] as f64,
                    a: color[3] as f64,
                })))],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.submit(encoder);
        self.stats.clears += 1;
        Ok(())
    }

    fn fill_rect(&mut self, target: TargetId, rect: Rect, color: [f32; 4]) -> ComposeResult<()> {
        let samples = self.target(target)?.samples;
        self.stats.draw_calls += 1;
        if rect.is_empty() {
            return Ok(());
        }
        self.ensure_pipeline(PipelineKind::Fill, samples)?;

        let dst = self.target(target)?;
        let bind_group = self.quad_bind_group(&QuadUniforms {
            rect: [rect.x, rect.y, rect.width, rect.height],
            target_opacity: [dst.width as f32, dst.height as f32, 1.0, 0.0],
            color,
        });
        let pipeline = self.pipeline(PipelineKind::Fill, samples)?;

        let mut encoder = self.encoder("Fill Encoder");
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Fill Pass"),
                color_attachments: &[Some(dst.color_attachment(wgpu::LoadOp::Load))],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..6, 0..1);
        }
        self.submit(encoder);
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
        let samples = self.target(target)?.samples;
        self.stats.draw_calls += 1;
        if bounds.is_empty() {
            return Ok(());
        }
        let kind = PipelineKind::Blit(blend);
        self.ensure_pipeline(kind, samples)?;

        let src = self.target(source)?;
        let dst = self.target(target)?;
        let uniforms = self.quad_bind_group(&QuadUniforms {
            rect: [bounds.x, bounds.y, bounds.width, bounds.height],
            target_opacity: [dst.width as f32, dst.height as f32, opacity, 0.0],
            color: [0.0; 4],
        });
        let texture = self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Blit Texture Bind Group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&src.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        let pipeline = self.pipeline(kind, samples)?;

        let mut encoder = self.encoder("Blit Encoder");
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Blit Pass"),
                color_attachments: &[Some(dst.color_attachment(wgpu::LoadOp::Load))],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &uniforms, &[]);
            pass.set_bind_group(1, &texture, &[]);
            pass.draw(0..6, 0..1);
        }
        self.submit(encoder);
        Ok(())
    }

    fn compile_effect(&mut self, source: &EffectSource) -> ComposeResult<EffectId> {
        let code = shaders::compose_effect_shader(&source.fragment);
        let device = &self.ctx.device;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&source.label),
            source: wgpu::ShaderSource::Wgsl(code.into()),
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            tracing::error!(effect = %source.label, "Effect shader failed to compile: {err}");
            return Err(ComposeError::EffectCompile {
                label: source.label.to_string(),
                message: err.to_string(),
            });
        }

        let id = EffectId(self.effects.len() as u32);
        self.effects.push(GpuEffect {
            label: source.label.to_string(),
            module,
        });

        // Build the single-sampled pipeline now so entry point errors surface here
        self.ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let built = self.ensure_pipeline(PipelineKind::Effect(id), 1);
        let scope_error = pollster::block_on(self.ctx.device.pop_error_scope());
        if let Some(err) = scope_error {
            self.effects.pop();
            self.pipelines.remove(&(PipelineKind::Effect(id), 1));
            tracing::error!(effect = %source.label, "Effect pipeline failed to build: {err}");
            return Err(ComposeError::EffectCompile {
                label: source.label.to_string(),
                message: err.to_string(),
            });
        }
        built?;

        tracing::debug!(effect = %source.label, "Compiled GPU effect");
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
        let src = self.target(input)?;
        let dst = self.target(output)?;
        if (src.width, src.height) != (dst.width, dst.height) {
            return Err(ComposeError::SizeMismatch {
                input_width: src.width,
                input_height: src.height,
                output_width: dst.width,
                output_height: dst.height,
            });
        }
        let samples = dst.samples;
        let kind = PipelineKind::Effect(effect);
        self.ensure_pipeline(kind, samples)?;

        let src = self.target(input)?;
        let dst = self.target(output)?;
        let mut params = *params;
        params.resolution = [dst.width as f32, dst.height as f32];

        let buffer = self.ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Effect Params Buffer"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let bind_group = self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Effect Bind Group"),
            layout: &self.effect_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&src.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffer.as_entire_binding(),
                },
            ],
        });
        let pipeline = self.pipeline(kind, samples)?;

        let mut encoder = self.encoder("Effect Encoder");
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Effect Pass"),
                color_attachments: &[Some(
                    dst.color_attachment(wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT)),
                )],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
        self.submit(encoder);
        self.stats.effect_passes += 1;
        Ok(())
    }

    fn read_pixels(&mut self, target: TargetId) -> ComposeResult<Vec<[f32; 4]>> {
        let src = self.target(target)?;
        let (width, height) = (src.width, src.height);
        let bytes_per_row = width * 4;
        let padded_bytes_per_row = bytes_per_row.div_ceil(256) * 256;

        let staging = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: u64::from(padded_bytes_per_row) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.encoder("Readback Encoder");
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &src.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.submit(encoder);

        let buffer_slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.ctx.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| ComposeError::Gpu(format!("readback channel closed: {e}")))?
            .map_err(|e| ComposeError::Gpu(format!("failed to map readback buffer: {e}")))?;

        let data = buffer_slice.get_mapped_range();
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            let row_start = y as usize * padded_bytes_per_row as usize;
            let row = &data[row_start..row_start + bytes_per_row as usize];
            pixels.extend(row.chunks_exact(4).map(|px| {
                [
                    px[0] as f32 / 255.0,
                    px[1] as f32 / 255.0,
                    px[2] as f32 / 255.0,
                    px[3] as f32 / 255.0,
                ]
            }));
        }
        drop(data);
        staging.unmap();
        Ok(pixels)
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
