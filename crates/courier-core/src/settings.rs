// SPDX-License-Identifier: AGPL-3.0
// Courier Core - Settings persistence
//
// Settings are stored in a local JSON file.
// Account data lives with the backend, never here.

use crate::types::{AppError, AppSettings};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// In-memory cache of settings, persisted to disk on changes
pub struct SettingsStore {
    settings: RwLock<AppSettings>,
    file_path: PathBuf,
}

impl SettingsStore {
    /// Create a new settings store in the platform config directory
    pub fn new() -> Result<Self, AppError> {
        let file_path = Self::get_settings_path()?;
        Self::with_path(file_path)
    }

    /// Create a settings store backed by an explicit file, loading it if present
    pub fn with_path(file_path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let file_path = file_path.into();
        tracing::info!("Settings file path: {:?}", file_path);

        let settings = if file_path.exists() {
            tracing::info!("Loading settings from disk");
            let content = fs::read_to_string(&file_path)
                .map_err(|e| AppError::FileIo(format!("Failed to read settings: {}", e)))?;

            serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse settings, using defaults: {}", e);
                AppSettings::default()
            })
        } else {
            tracing::info!("No settings file found, using defaults");
            AppSettings::default()
        };

        let store = Self {
            settings: RwLock::new(settings),
            file_path,
        };

        if !store.file_path.exists() {
            tracing::info!("Creating initial settings file");
            store.persist()?;
        }

        Ok(store)
    }

    /// Get the path to the settings file
    fn get_settings_path() -> Result<PathBuf, AppError> {
        let config_dir = directories::ProjectDirs::from("com", "courier", "app")
            .ok_or_else(|| AppError::FileIo("Could not determine config directory".to_string()))?
            .config_dir()
            .to_path_buf();

        fs::create_dir_all(&config_dir)
            .map_err(|e| AppError::FileIo(format!("Failed to create config dir: {}", e)))?;

        Ok(config_dir.join("settings.json"))
    }

    /// Persist settings to disk
    fn persist(&self) -> Result<(), AppError> {
        let content = {
            let settings = self.settings.read().unwrap_or_else(PoisonError::into_inner);
            serde_json::to_string_pretty(&*settings).map_err(|e| {
                AppError::Serialization(format!("Failed to serialize settings: {}", e))
            })?
        };

        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.file_path, content)
            .map_err(|e| AppError::FileIo(format!("Failed to write settings: {}", e)))?;

        Ok(())
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Get current settings
    pub fn get(&self) -> AppSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Update settings and persist to disk
    pub fn update(&self, new_settings: AppSettings) -> Result<(), AppError> {
        tracing::info!(
            "Updating settings, toast duration: {}ms",
            new_settings.toast_duration_ms
        );
        {
            let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
            *settings = new_settings;
        }

        let result = self.persist();
        if result.is_ok() {
            tracing::info!("Settings persisted successfully");
        } else {
            tracing::error!("Failed to persist settings: {:?}", result);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_file_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::with_path(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.get().toast_duration_ms, 3000);
    }

    #[test]
    fn test_update_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::with_path(&path).unwrap();
        let mut settings = store.get();
        settings.toast_duration_ms = 4500;
        settings.theme = "dark".to_string();
        store.update(settings).unwrap();

        let reopened = SettingsStore::with_path(&path).unwrap();
        assert_eq!(reopened.get().toast_duration_ms, 4500);
        assert_eq!(reopened.get().theme, "dark");
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::with_path(&path).unwrap();
        assert_eq!(store.get().theme, "system");
    }
}
