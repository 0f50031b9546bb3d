//! Telemetry and logging infrastructure
//!
//! Provides structured logging with tracing, render counters, frame timing
//! and frame snapshots.

pub mod logging;
pub mod metrics;
pub mod snapshot;

pub use logging::{init_logging, LogConfig, LogGuard};
pub use metrics::{FrameProfiler, FrameStats, RenderStats};
pub use snapshot::save_png;
