//! Persisted chart settings, stored in the OS config directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GanttError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    /// Shortest duration a resize drag may leave an event with, in minutes.
    /// Values below one are read as one.
    pub min_event_duration_minutes: i64,
    /// Initial width of the title column in points.
    pub title_width: f32,
    /// Allowed zoom factor range relative to the base scale.
    pub zoom_scale_extent: [f64; 2],
    /// Zoom factor applied by the View menu zoom in / zoom out entries.
    pub zoom_step: f64,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            min_event_duration_minutes: 15,
            title_width: 100.0,
            zoom_scale_extent: [0.06, 6.0],
            zoom_step: 1.2,
        }
    }
}

impl ChartSettings {
    pub fn min_event_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.min_event_duration_minutes.max(1))
    }

    /// Load from the default location, falling back to defaults.
    pub fn load_or_default() -> Self {
        let path = settings_path();
        match Self::load(&path) {
            Ok(settings) => settings,
            Err(GanttError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to load settings, using defaults: {}", e);
                Self::default()
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| GanttError::io(path, e))?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| GanttError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| GanttError::io(path, e))
    }
}

/// Directory holding `settings.json`.
pub fn config_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "LaneGantt")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}
