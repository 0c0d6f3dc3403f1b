use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::store::views::{DisplayMode, ListSelection, View};

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("minder")
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MinderConfig {
    pub data_dir: PathBuf,
    /// Base URL of the hosted backend.
    pub backend_url: String,
    /// Publishable API key for the backend; the user token lives in the keyring.
    pub api_key: String,
    pub account_email: String,
}

impl Default for MinderConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend_url: String::new(),
            api_key: String::new(),
            account_email: String::new(),
        }
    }
}

impl MinderConfig {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("minder")
            .join("config.json")
    }

    /// Load the config, falling back to defaults on a missing or bad file.
    pub fn load() -> Self {
        let path = Self::config_path();
        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::error!("Failed to create config directory: {}", e);
                return;
            }
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    log::error!("Failed to save config: {}", e);
                }
            }
            Err(e) => log::error!("Failed to serialize config: {}", e),
        }
    }

    pub fn prefs_path(&self) -> PathBuf {
        self.data_dir.join("preferences.json")
    }

    /// Ensure the data directory exists.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }
}

/// Client-side UI preferences. Pure convenience state, never authoritative:
/// losing this file loses nothing but cursor positions.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Preferences {
    pub selected_list: ListSelection,
    pub selected_view: View,
    pub display_mode: DisplayMode,
    pub dashboard_seen: bool,
    pub dark_mode: bool,
    /// When the app last went to the background.
    pub backgrounded_at: Option<NaiveDateTime>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            selected_list: ListSelection::All,
            selected_view: View::Tasks,
            display_mode: DisplayMode::Columns,
            dashboard_seen: false,
            dark_mode: false,
            backgrounded_at: None,
        }
    }
}

pub fn load_preferences(path: &Path) -> Preferences {
    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
        Err(_) => Preferences::default(),
    }
}

pub fn save_preferences(path: &Path, prefs: &Preferences) {
    match serde_json::to_string_pretty(prefs) {
        Ok(json) => {
            if let Err(e) = std::fs::write(path, json) {
                log::error!("Failed to save preferences: {}", e);
            }
        }
        Err(e) => log::error!("Failed to serialize preferences: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferences_round_trip_through_json() {
        let mut prefs = Preferences::default();
        prefs.selected_view = View::Reminders;
        prefs.dark_mode = true;
        let json = serde_json::to_string(&prefs).unwrap();
        let back: Preferences = serde_json::from_str(&json).unwrap();
        assert_eq!(back, prefs);
    }

    #[test]
    fn missing_preferences_fall_back_to_defaults() {
        let prefs = load_preferences(Path::new("/nonexistent/prefs.json"));
        assert_eq!(prefs, Preferences::default());
    }
}
