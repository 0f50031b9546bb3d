//! Composer settings
//!
//! Canvas size, backend selection, headless runner pacing, the demo's
//! postprocess chain and logging, stored as JSON.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ComposeError, ComposeResult};
use crate::render::{BackendKind, MAX_TARGET_DIMENSION, SUPPORTED_SAMPLE_COUNTS};
use crate::telemetry::LogConfig;

/// Settings for a composer session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerSettings {
    /// Root layer width in pixels
    pub width: u32,
    /// Root layer height in pixels
    pub height: u32,
    /// MSAA samples of the root layer (0 = off)
    pub msaa_samples: u32,
    /// Rendering backend
    pub backend: BackendKind,
    /// Frames per second of the headless runner
    pub target_fps: u32,
    /// Number of frames the headless runner renders
    pub frame_count: u32,
    /// Crossfade duration in seconds
    pub crossfade_seconds: f64,
    /// Stock effects applied to the root layer, in order
    pub effects: Vec<String>,
    /// Directory snapshots are written to
    pub output_dir: PathBuf,
    pub logging: LogConfig,
}

impl Default for ComposerSettings {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            msaa_samples: 0,
            backend: BackendKind::Cpu,
            target_fps: 60,
            frame_count: 180,
            crossfade_seconds: 2.0,
            effects: vec!["vignette".to_string()],
            output_dir: PathBuf::from("frames"),
            logging: LogConfig::default(),
        }
    }
}

impl ComposerSettings {
    /// Clamp values to ranges the composer can run with
    pub fn sanitize(&mut self) {
        self.width = self.width.clamp(1, MAX_TARGET_DIMENSION);
        self.height = self.height.clamp(1, MAX_TARGET_DIMENSION);
        self.target_fps = self.target_fps.clamp(1, 240);
        if !SUPPORTED_SAMPLE_COUNTS.contains(&self.msaa_samples) {
            tracing::warn!(
                samples = self.msaa_samples,
                "Unsupported MSAA sample count, disabling MSAA"
            );
            self.msaa_samples = 0;
        }
        if !self.crossfade_seconds.is_finite() || self.crossfade_seconds < 0.0 {
            self.crossfade_seconds = 0.0;
        }
    }

    /// Seconds per frame of the headless runner
    pub fn frame_interval(&self) -> f64 {
        1.0 / self.target_fps.max(1) as f64
    }

    /// Default settings file in the user config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("layer-composer");
            p.push("settings.json");
            p
        })
    }

    /// Load settings from a JSON file
    pub fn load(path: &Path) -> ComposeResult<Self> {
        let contents = fs::read_to_string(path).map_err(|source| ComposeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings: Self = serde_json::from_str(&contents)?;
        settings.sanitize();
        Ok(settings)
    }

    /// Load from the default path. A missing file yields the defaults; a
    /// file that exists but cannot be read or parsed is an error.
    pub fn load_or_default() -> ComposeResult<Self> {
        match Self::default_path() {
            Some(path) => Self::load_or_default_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load `path` if it exists, otherwise return the defaults
    pub fn load_or_default_from(path: &Path) -> ComposeResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save settings as pretty-printed JSON, creating parent directories
    pub fn save(&self, path: &Path) -> ComposeResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ComposeError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| ComposeError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
