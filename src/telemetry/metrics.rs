//! Render counters and frame timing
//!
//! `RenderStats` is kept by every backend and counts the commands it
//! executed. `FrameProfiler` collects CPU frame durations and reports
//! percentile statistics.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Command counters kept by a render backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Solid fills and textured blits
    pub draw_calls: u64,
    /// Full-target clears
    pub clears: u64,
    /// Effect program executions
    pub effect_passes: u64,
    /// Render targets allocated
    pub targets_created: u64,
    /// Render targets freed after their handle dropped
    pub targets_released: u64,
    /// Render targets currently allocated
    pub live_targets: usize,
}

impl RenderStats {
    /// Every command that wrote into some target
    pub fn target_writes(&self) -> u64 {
        self.draw_calls + self.clears + self.effect_passes
    }
}

/// Frame timing statistics
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    /// Average frame time in milliseconds
    pub avg_ms: f64,
    /// Minimum frame time in milliseconds
    pub min_ms: f64,
    /// Maximum frame time in milliseconds
    pub max_ms: f64,
    /// 50th percentile (median) frame time
    pub p50_ms: f64,
    /// 95th percentile frame time
    pub p95_ms: f64,
    /// Number of samples in the statistics
    pub sample_count: usize,
}

impl FrameStats {
    /// Frames per second implied by the average frame time
    pub fn fps(&self) -> f64 {
        if self.avg_ms > 0.0 {
            1000.0 / self.avg_ms
        } else {
            0.0
        }
    }
}

/// Frame profiler for CPU timing
pub struct FrameProfiler {
    /// Frame durations
    frame_times: VecDeque<Duration>,
    /// Maximum samples to keep
    max_samples: usize,
    /// Last frame start time
    last_frame_start: Option<Instant>,
}

impl Default for FrameProfiler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameProfiler {
    /// Create a profiler keeping the last 300 frames
    pub fn new() -> Self {
        Self::with_capacity(300)
    }

    pub fn with_capacity(max_samples: usize) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            frame_times: VecDeque::with_capacity(max_samples),
            max_samples,
            last_frame_start: None,
        }
    }

    /// Mark the beginning of a frame
    pub fn begin_frame(&mut self) {
        let now = Instant::now();
        if let Some(start) = self.last_frame_start {
            self.record(now.duration_since(start));
        }
        self.last_frame_start = Some(now);
    }

    /// Record one frame duration directly
    pub fn record(&mut self, duration: Duration) {
        self.frame_times.push_back(duration);
        if self.frame_times.len() > self.max_samples {
            self.frame_times.pop_front();
        }
    }

    /// Get frame timing statistics
    pub fn stats(&self) -> FrameStats {
        if self.frame_times.is_empty() {
            return FrameStats::default();
        }

        let mut times_ms: Vec<f64> = self
            .frame_times
            .iter()
            .map(|d| d.as_secs_f64() * 1000.0)
            .collect();
        times_ms.sort_by(|a, b| a.total_cmp(b));

        let count = times_ms.len();
        let sum: f64 = times_ms.iter().sum();
        let percentile = |p: f64| {
            let idx = ((count - 1) as f64 * p).round() as usize;
            times_ms[idx.min(count - 1)]
        };

        FrameStats {
            avg_ms: sum / count as f64,
            min_ms: times_ms[0],
            max_ms: times_ms[count - 1],
            p50_ms: percentile(0.50),
            p95_ms: percentile(0.95),
            sample_count: count,
        }
    }

    /// Clear all samples
    pub fn reset(&mut self) {
        self.frame_times.clear();
        self.last_frame_start = None;
    }
}
