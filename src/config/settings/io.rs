// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::path::{Path, PathBuf};

use crate::error::Result;

use super::Settings;

impl Settings {
    /// Get the default settings file path.
    pub fn default_path() -> PathBuf {
        Self::bab_home().join("settings.json")
    }

    /// Load settings from the default path.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load settings from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the bab home directory (~/.cache/bab or $BAB_HOME).
    pub fn bab_home() -> PathBuf {
        if let Ok(home) = std::env::var("BAB_HOME") {
            return PathBuf::from(home);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".cache")
            .join("bab")
    }

    /// Model cache root: the configured directory or <bab_home>/models.
    pub fn cache_dir(&self) -> PathBuf {
        self.models
            .cache_dir
            .clone()
            .unwrap_or_else(|| Self::bab_home().join("models"))
    }

    /// Saved translations database.
    pub fn saved_db_path() -> PathBuf {
        Self::bab_home().join("saved_translations.db")
    }

    /// History and preferences database.
    pub fn history_db_path() -> PathBuf {
        Self::bab_home().join("history.db")
    }

    /// Ensure the home directory exists.
    pub fn ensure_directories() -> Result<()> {
        let home = Self::bab_home();
        if !home.exists() {
            std::fs::create_dir_all(&home)?;
        }
        Ok(())
    }
}
