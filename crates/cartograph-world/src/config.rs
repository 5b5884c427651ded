//! Loader configuration.
//!
//! Names the directories and file extension of a world's containers, and
//! whether the split entity containers are read. Loaded from and saved to TOML.

use std::fs;
use std::io;
use std::path::Path;

use cartograph_common::{WorldLayout, DEFAULT_ENTITIES_DIR, DEFAULT_EXTENSION, DEFAULT_REGION_DIR};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "cartograph.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO failure
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Malformed TOML
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Serialization failure
    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Loader configuration parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Directory of primary containers, relative to the world root
    pub region_dir: String,
    /// Directory of entity-only containers, relative to the world root
    pub entities_dir: String,
    /// Container file extension, without the dot
    pub container_extension: String,
    /// Read the entity-only containers after the primary one
    pub separate_entities: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            region_dir: DEFAULT_REGION_DIR.to_owned(),
            entities_dir: DEFAULT_ENTITIES_DIR.to_owned(),
            container_extension: DEFAULT_EXTENSION.to_owned(),
            separate_entities: true,
        }
    }
}

impl LoaderConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match Self::try_load_from(path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to load config file: {e}");
                Self::default()
            },
        }
    }

    /// Load configuration, reporting any failure.
    pub fn try_load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&contents)?;
        config.validate();
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Normalize values: empty names fall back to defaults and a leading dot
    /// on the extension is dropped.
    pub fn validate(&mut self) {
        let defaults = Self::default();

        if self.region_dir.trim().is_empty() {
            self.region_dir = defaults.region_dir;
        }
        if self.entities_dir.trim().is_empty() {
            self.entities_dir = defaults.entities_dir;
        }

        let extension = self.container_extension.trim().trim_start_matches('.');
        self.container_extension = if extension.is_empty() {
            defaults.container_extension
        } else {
            extension.to_owned()
        };
    }

    /// Container layout of the world at `root`.
    #[must_use]
    pub fn layout<P: AsRef<Path>>(&self, root: P) -> WorldLayout {
        WorldLayout::with_names(
            root,
            &self.region_dir,
            &self.entities_dir,
            &self.container_extension,
        )
    }
}
