//! Layer Composer Library
//!
//! A hierarchical, offscreen-rendered scene compositor. A tree of layers,
//! each owning a render target, renders nested layers and content scenes
//! into itself, optionally passes the result through a chain of
//! postprocess effects, and composites upward with animatable opacity and
//! fade-to-black.
//!
//! Rendering goes through the [`render::RenderBackend`] trait, implemented
//! by a software rasterizer and by wgpu.

pub mod animation;
pub mod app;
pub mod compositor;
pub mod effects;
pub mod error;
pub mod gpu_context;
pub mod render;
pub mod settings;
pub mod shaders;
pub mod telemetry;

pub use animation::{AnimatedScalar, Ease, Timeline};
pub use app::Composer;
pub use compositor::{
    layer_ref, scene_ref, Layer, LayerRef, Scene, SceneContent, SceneRef, SolidColor,
};
pub use effects::{postprocess_ref, Postprocess, PostprocessRef, ShaderPostprocess};
pub use error::{ComposeError, ComposeResult};
pub use render::{
    create_backend, BackendKind, Canvas, CpuBackend, GpuBackend, Rect, RenderBackend, RenderTarget,
};
pub use settings::ComposerSettings;
