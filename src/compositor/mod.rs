//! Compositor: the layer tree
//!
//! Layers own offscreen buffers and composite child layers and scenes into
//! them every frame; scenes are the leaf content units.

pub mod layer;
pub mod scene;

pub use layer::{layer_ref, Layer, LayerRef};
pub use scene::{scene_ref, Scene, SceneContent, SceneRef, SolidColor};
