//! Postprocessing effects
//!
//! A layer may pass its composited image through a chain of postprocess
//! stages before it is drawn upward. This module provides:
//!
//! - **Traits** (`traits.rs`): the `Postprocess` stage contract, effect
//!   program descriptions and their uniform block
//! - **Shader stages** (`shader.rs`): `ShaderPostprocess`, a stage running
//!   one compiled effect program
//! - **Runtime** (`runtime.rs`): the ping-pong buffer pair driving a chain
//! - **Builtin** (`builtin/`): stock stages (mirror, invert, greyscale,
//!   black levels, vignette)
//!
//! # Usage
//!
//! ```ignore
//! let invert = builtin::invert::create(&mut backend)?;
//! layer.add_postprocess(&mut backend, postprocess_ref(invert))?;
//! ```

mod runtime;
mod shader;
mod traits;
pub mod builtin;

pub use runtime::*;
pub use shader::*;
pub use traits::*;
