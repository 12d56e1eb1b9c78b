//! Persisted records under the app data dir: the profile, the meal log, and
//! settings, each a pretty-printed JSON document.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::models::{Meal, Profile, Settings};

pub const PROFILE_FILE: &str = "profile.json";
pub const MEALS_FILE: &str = "meals.json";
const CONFIG_DIR: &str = "config";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir).with_context(|| {
            format!("failed to create data directory {}", self.data_dir.display())
        })
    }

    fn profile_path(&self) -> PathBuf {
        self.data_dir.join(PROFILE_FILE)
    }

    fn meals_path(&self) -> PathBuf {
        self.data_dir.join(MEALS_FILE)
    }

    fn settings_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_DIR).join(SETTINGS_FILE)
    }

    /// Missing record gives None. A record that fails to parse is logged,
    /// left on disk, and treated as absent.
    pub fn load_profile(&self) -> Option<Profile> {
        read_json(&self.profile_path(), "profile")
    }

    pub fn save_profile(&self, profile: &Profile) -> Result<()> {
        write_json(&self.profile_path(), profile)
    }

    pub fn load_meals(&self) -> Vec<Meal> {
        read_json(&self.meals_path(), "meals").unwrap_or_default()
    }

    /// Written unconditionally, including an empty list, so deletions down to
    /// zero meals survive a restart.
    pub fn save_meals(&self, meals: &[Meal]) -> Result<()> {
        write_json(&self.meals_path(), &meals)
    }

    pub fn load_settings(&self) -> Settings {
        read_json(&self.settings_path(), "settings").unwrap_or_default()
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        write_json(&self.settings_path(), settings)
    }

    /// Logout path: removes the two user records, keeps settings.
    pub fn clear(&self) -> Result<()> {
        remove_if_exists(&self.profile_path())?;
        remove_if_exists(&self.meals_path())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Option<T> {
    if !path.exists() {
        return None;
    }
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            log::warn!("failed to read {what} record at {}: {e}", path.display());
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            // Corrupted data stays on disk; the app just starts fresh.
            log::warn!("ignoring malformed {what} record at {}: {e}", path.display());
            None
        }
    }
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
    }
}
