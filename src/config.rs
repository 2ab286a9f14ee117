use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming an optional JSON config file.
pub const CONFIG_ENV_VAR: &str = "FURNITURE_VIEWER_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    /// Clear color, packed 0xRRGGBB.
    pub background: u32,
    /// Used when the monitor does not report a refresh rate.
    pub fallback_refresh_hz: f32,
    /// Zoom factor per mouse wheel notch.
    pub wheel_zoom_step: f32,
    pub show_fps_in_title: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window_title: "Furniture Viewer".to_string(),
            window_width: 1280,
            window_height: 720,
            background: 0xF0F0F0,
            fallback_refresh_hz: 60.0,
            wheel_zoom_step: 1.1,
            show_fps_in_title: false,
        }
    }
}

impl ViewerConfig {
    /// Loads the file named by `FURNITURE_VIEWER_CONFIG`, or defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => Self::load(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded config from {}", path.display());
        Ok(config.sanitized())
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Replaces values the viewer cannot run with by their defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.window_width == 0 || self.window_height == 0 {
            log::warn!("Ignoring zero window size");
            self.window_width = defaults.window_width;
            self.window_height = defaults.window_height;
        }
        if !(self.fallback_refresh_hz.is_finite() && self.fallback_refresh_hz > 1.0) {
            log::warn!("Ignoring fallback refresh rate {}", self.fallback_refresh_hz);
            self.fallback_refresh_hz = defaults.fallback_refresh_hz;
        }
        if !(self.wheel_zoom_step.is_finite() && self.wheel_zoom_step > 1.0) {
            log::warn!("Ignoring wheel zoom step {}", self.wheel_zoom_step);
            self.wheel_zoom_step = defaults.wheel_zoom_step;
        }
        self.background &= 0xFFFFFF;
        self
    }
}
