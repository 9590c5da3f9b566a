use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use brotview_core::{CoreError, Rect, ViewState};

// ---------------------------------------------------------------------------
// Bookmark
// ---------------------------------------------------------------------------

/// A named view rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub name: String,
    pub rect: Rect,
}

impl Bookmark {
    /// Human-readable summary for list views.
    pub fn summary(&self) -> String {
        let zoom = ViewState::FULL_SET.w / self.rect.w;
        format!("{}  zoom {zoom:.2e}", self.rect.center())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum BookmarkError {
    #[error("bookmark name is empty")]
    EmptyName,

    #[error("\"{0}\" is a built-in bookmark")]
    Reserved(String),

    #[error(transparent)]
    InvalidRect(#[from] CoreError),
}

/// Views that ship with the app. Always listed first and never saved.
pub fn builtin_bookmarks() -> Vec<Bookmark> {
    vec![
        Bookmark {
            name: "Full set".into(),
            rect: ViewState::FULL_SET,
        },
        Bookmark {
            name: "Julia island".into(),
            rect: Rect {
                x: -1.768779295,
                y: -0.001739398,
                w: 1e-6,
                h: 1e-6,
            },
        },
    ]
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Built-in bookmarks plus the user's own, persisted as one JSON file.
#[derive(Debug)]
pub struct BookmarkStore {
    builtin: Vec<Bookmark>,
    user: Vec<Bookmark>,
    path: PathBuf,
}

impl BookmarkStore {
    /// Load user bookmarks from the OS config directory.
    pub fn load() -> Self {
        Self::load_from(crate::preferences::config_dir().join("bookmarks.json"))
    }

    pub fn load_from(path: PathBuf) -> Self {
        let user = if path.exists() {
            read_bookmarks(&path)
        } else {
            debug!("No bookmarks file at {}", path.display());
            Vec::new()
        };
        Self {
            builtin: builtin_bookmarks(),
            user,
            path,
        }
    }

    pub fn save(&self) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create bookmarks directory: {e}");
                return;
            }
        }
        match serde_json::to_string_pretty(&self.user) {
            Ok(json) => {
                if let Err(e) = fs::write(&self.path, json) {
                    error!("Failed to write bookmarks: {e}");
                } else {
                    debug!(count = self.user.len(), "Saved bookmarks");
                }
            }
            Err(e) => error!("Failed to serialize bookmarks: {e}"),
        }
    }

    /// Built-ins first, then user bookmarks in insertion order.
    pub fn all(&self) -> impl Iterator<Item = &Bookmark> {
        self.builtin.iter().chain(self.user.iter())
    }

    pub fn get(&self, name: &str) -> Option<&Bookmark> {
        self.all().find(|bm| bm.name == name)
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.builtin.iter().any(|bm| bm.name == name)
    }

    /// Add a user bookmark, replacing any user bookmark of the same name.
    pub fn add(&mut self, name: &str, rect: Rect) -> Result<(), BookmarkError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BookmarkError::EmptyName);
        }
        if self.is_builtin(name) {
            return Err(BookmarkError::Reserved(name.to_string()));
        }
        rect.validate()?;

        let bookmark = Bookmark {
            name: name.to_string(),
            rect,
        };
        match self.user.iter_mut().find(|bm| bm.name == name) {
            Some(existing) => *existing = bookmark,
            None => self.user.push(bookmark),
        }
        info!(name, "Saved bookmark");
        Ok(())
    }

    /// Remove a user bookmark. Returns `false` if there was none by that name.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.user.len();
        self.user.retain(|bm| bm.name != name);
        self.user.len() != before
    }
}

fn read_bookmarks(path: &Path) -> Vec<Bookmark> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to read bookmarks file: {e}");
            return Vec::new();
        }
    };
    let stored: Vec<Bookmark> = match serde_json::from_str(&json) {
        Ok(stored) => stored,
        Err(e) => {
            error!("Failed to parse bookmarks: {e}");
            return Vec::new();
        }
    };
    let total = stored.len();
    let valid: Vec<Bookmark> = stored
        .into_iter()
        .filter(|bm| {
            let ok = bm.rect.is_valid();
            if !ok {
                warn!(name = %bm.name, "Skipping bookmark with invalid view");
            }
            ok
        })
        .collect();
    info!(
        loaded = valid.len(),
        skipped = total - valid.len(),
        "Loaded bookmarks from {}",
        path.display()
    );
    valid
}
