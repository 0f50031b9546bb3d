//! Error types for the compositor
//!
//! Only configuration and resource problems are errors. Zero opacity and
//! empty postprocess chains are ordinary short-circuits and never produce one.

use std::path::PathBuf;

use crate::render::TargetId;

/// Errors reported by layers, backends and postprocess stages
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// A crossfade selected an index past the end of the list
    #[error("{kind} index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Which list was indexed ("scene" or "layer")
        kind: &'static str,
        index: usize,
        len: usize,
    },

    /// A target handle does not (or no longer) exist in the backend
    #[error("render target {0:?} does not exist")]
    MissingTarget(TargetId),

    /// The postprocess chain ran without its ping/pong buffers
    #[error("postprocess chain has no process buffers allocated")]
    MissingProcessBuffers,

    /// A pass would read and write the same target
    #[error("render target {0:?} used as both source and destination")]
    TargetAliasing(TargetId),

    /// Input and output of an effect pass differ in size
    #[error("size mismatch: {input_width}x{input_height} in, {output_width}x{output_height} out")]
    SizeMismatch {
        input_width: u32,
        input_height: u32,
        output_width: u32,
        output_height: u32,
    },

    /// Empty or oversized render targets are rejected
    #[error("invalid render target size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    /// Multisample count that the backend cannot allocate
    #[error("unsupported sample count {0}")]
    UnsupportedSamples(u32),

    /// A postprocess stage failed to build its effect program
    #[error("failed to compile effect '{label}': {message}")]
    EffectCompile { label: String, message: String },

    /// The effect handle is unknown to the backend
    #[error("unknown effect handle {0}")]
    MissingEffect(u32),

    /// A layer or scene was reached while already borrowed (cyclic tree)
    #[error("layer tree contains a cycle or re-entrant borrow")]
    LayerCycle,

    /// GPU device/adapter failure
    #[error("gpu error: {0}")]
    Gpu(String),

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("settings error: {0}")]
    Settings(#[from] serde_json::Error),
}

/// Result alias used throughout the crate
pub type ComposeResult<T> = Result<T, ComposeError>;
