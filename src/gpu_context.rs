//! Headless GPU context
//!
//! Provides `GpuContext`, the device, queue and adapter the GPU backend
//! renders with. No surface is involved; layers render offscreen and the
//! application reads frames back or presents them itself.

// ═══════════════════════════════════════════════════════════════════════════════
// GPU CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

use crate::error::{ComposeError, ComposeResult};

/// Color format of every render target
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// GPU resources shared by all targets and pipelines of one backend.
pub struct GpuContext {
    /// The wgpu instance
    pub instance: wgpu::Instance,
    /// The selected GPU adapter
    pub adapter: wgpu::Adapter,
    /// The GPU device for creating resources
    pub device: wgpu::Device,
    /// The command queue for submitting GPU work
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Create a GpuContext from pre-initialized components.
    ///
    /// Useful when the application already owns a device (for example one
    /// created alongside a window surface) and wants layers to share it.
    pub fn from_parts(
        instance: wgpu::Instance,
        adapter: wgpu::Adapter,
        device: wgpu::Device,
        queue: wgpu::Queue,
    ) -> Self {
        Self {
            instance,
            adapter,
            device,
            queue,
        }
    }

    /// Create a context on the default adapter without any surface.
    pub async fn new_headless() -> ComposeResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| ComposeError::Gpu("no suitable GPU adapter found".to_string()))?;

        tracing::info!("Using GPU: {}", adapter.get_info().name);
        tracing::info!("Backend: {:?}", adapter.get_info().backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Layer Composer Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| ComposeError::Gpu(format!("failed to create device: {e}")))?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    /// Blocking variant of [`GpuContext::new_headless`]
    pub fn new_headless_blocking() -> ComposeResult<Self> {
        pollster::block_on(Self::new_headless())
    }

    /// Whether render targets may use `samples` MSAA samples
    pub fn supports_samples(&self, samples: u32) -> bool {
        if samples <= 1 {
            return true;
        }
        self.adapter
            .get_texture_format_features(TARGET_FORMAT)
            .flags
            .sample_count_supported(samples)
    }
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let info = self.adapter.get_info();
        f.debug_struct("GpuContext")
            .field("adapter", &info.name)
            .field("backend", &info.backend)
            .finish()
    }
}
