//! Settings loader

use std::path::Path;

use featfs_utils::{config_file, FeatfsError, Result};

use super::Settings;

/// Settings loader
pub struct SettingsLoader;

impl SettingsLoader {
    /// Load settings from the default location
    pub fn load() -> Result<Settings> {
        let path = config_file();
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            Ok(Settings::default())
        }
    }

    /// Load settings from a specific path
    pub fn load_from_path(path: &Path) -> Result<Settings> {
        let content = std::fs::read_to_string(path).map_err(|e| FeatfsError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content, path)
    }

    /// Parse settings from string
    pub fn parse(content: &str, path: &Path) -> Result<Settings> {
        toml::from_str(content).map_err(|e| FeatfsError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Validate settings
    pub fn validate(settings: &Settings) -> Result<()> {
        if settings.namespace.chunk_size < 2 {
            return Err(FeatfsError::config("chunk_size must be at least 2"));
        }

        if settings.namespace.max_nodes == 0 {
            return Err(FeatfsError::config("max_nodes must be positive"));
        }

        if settings.boot.strict && settings.boot.features.is_empty() {
            tracing::warn!("boot.strict is set but no boot features are listed");
        }

        Ok(())
    }

    /// Load from `path` (or the default location) and validate
    pub fn load_and_validate(path: Option<&Path>) -> Result<Settings> {
        let settings = match path {
            Some(path) => Self::load_from_path(path)?,
            None => Self::load()?,
        };
        Self::validate(&settings)?;
        Ok(settings)
    }
}
