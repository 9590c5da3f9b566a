use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use brotview_core::{ColorMapRegistry, EscapeParams, Rect, ViewState};

// ---------------------------------------------------------------------------
// Application preferences
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppPreferences {
    #[serde(default = "default_window_width")]
    pub window_width: f32,
    #[serde(default = "default_window_height")]
    pub window_height: f32,
    #[serde(default = "default_iteration_budget")]
    pub iteration_budget: u32,
    #[serde(default = "default_color_map")]
    pub color_map: String,
    /// Block size of the first pass of every render cycle.
    #[serde(default = "default_max_block_size")]
    pub max_block_size: u32,
    #[serde(default = "default_true")]
    pub restore_last_view: bool,
    #[serde(default)]
    pub last_view: Option<Rect>,
}

/// Smallest window edge accepted from disk.
const MIN_WINDOW_EDGE: f32 = 200.0;

fn default_window_width() -> f32 {
    1280.0
}
fn default_window_height() -> f32 {
    720.0
}
fn default_iteration_budget() -> u32 {
    EscapeParams::DEFAULT_ITERATION_BUDGET
}
fn default_color_map() -> String {
    ColorMapRegistry::builtin().default_name().to_string()
}
fn default_max_block_size() -> u32 {
    ViewState::DEFAULT_MAX_BLOCK_SIZE
}
fn default_true() -> bool {
    true
}

impl Default for AppPreferences {
    fn default() -> Self {
        Self {
            window_width: default_window_width(),
            window_height: default_window_height(),
            iteration_budget: default_iteration_budget(),
            color_map: default_color_map(),
            max_block_size: default_max_block_size(),
            restore_last_view: true,
            last_view: None,
        }
    }
}

impl AppPreferences {
    /// Load preferences from the OS config directory, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            debug!("No preferences file at {}", path.display());
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str::<AppPreferences>(&json) {
                Ok(prefs) => {
                    info!("Loaded preferences from {}", path.display());
                    return prefs;
                }
                Err(e) => error!("Failed to parse preferences: {e}"),
            },
            Err(e) => error!("Failed to read preferences file: {e}"),
        }
        Self::default()
    }

    /// Persist preferences to disk.
    pub fn save(&self) {
        self.save_to(&config_path());
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory: {e}");
                return;
            }
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = fs::write(path, &json) {
                    error!("Failed to write preferences: {e}");
                } else {
                    debug!("Saved preferences");
                }
            }
            Err(e) => error!("Failed to serialize preferences: {e}"),
        }
    }

    /// Replace out-of-range values with defaults.
    pub fn sanitize(&mut self, color_maps: &ColorMapRegistry) {
        if !(self.window_width.is_finite() && self.window_width >= MIN_WINDOW_EDGE) {
            warn!(value = self.window_width, "Ignoring stored window width");
            self.window_width = default_window_width();
        }
        if !(self.window_height.is_finite() && self.window_height >= MIN_WINDOW_EDGE) {
            warn!(value = self.window_height, "Ignoring stored window height");
            self.window_height = default_window_height();
        }
        if self.iteration_budget < 1 {
            warn!("Ignoring stored iteration budget of 0");
            self.iteration_budget = default_iteration_budget();
        }
        if self.max_block_size < 1 {
            warn!("Ignoring stored max block size of 0");
            self.max_block_size = default_max_block_size();
        }
        if !color_maps.contains(&self.color_map) {
            warn!(name = %self.color_map, "Ignoring unknown stored color map");
            self.color_map = color_maps.default_name().to_string();
        }
        if let Some(rect) = self.last_view {
            if !rect.is_valid() {
                warn!(?rect, "Ignoring invalid stored view");
                self.last_view = None;
            }
        }
    }

    /// Initial view for a new session.
    pub fn view_state(&self) -> ViewState {
        let rect = match self.last_view {
            Some(rect) if self.restore_last_view && rect.is_valid() => rect,
            _ => ViewState::FULL_SET,
        };
        ViewState::new(
            rect,
            self.iteration_budget,
            self.max_block_size,
            &self.color_map,
        )
    }
}

/// Per-user configuration directory, shared with the bookmark store.
pub(crate) fn config_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "BrotView")
        .map(|d| d.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn config_path() -> PathBuf {
    config_dir().join("preferences.json")
}
