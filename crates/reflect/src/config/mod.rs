//! Configuration for the reflection core
//!
//! Settings live in a TOML file and are read once when a
//! [`ReflectionContext`](crate::ReflectionContext) is built:
//!
//! ```toml
//! version = 1
//! debug = false
//!
//! [archive]
//! indent_width = 2
//! cache_capacity = 16
//! strict_casts = false
//! verify_checksum = true
//! ```
//!
//! A missing file is created with the defaults on [`ReflectConfig::load`].

mod loader;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use loader::{config_path, CONFIG_ENV, CONFIG_FILE_NAME};

/// Configuration system errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write config file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML content
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config to TOML
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Archive behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Spaces per nesting level in XML output
    pub indent_width: usize,

    /// Pooled Data instances kept per class by each archive
    pub cache_capacity: usize,

    /// Fail a load when a field value cannot be cast to the declared type
    pub strict_casts: bool,

    /// Check the body checksum of binary archives on open
    pub verify_checksum: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            indent_width: 2,
            cache_capacity: 16,
            strict_casts: false,
            verify_checksum: true,
        }
    }
}

/// Reflection core configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflectConfig {
    /// Config version for future migration support
    pub version: u32,

    /// Enable debug logging
    pub debug: bool,

    pub archive: ArchiveConfig,
}

impl Default for ReflectConfig {
    fn default() -> Self {
        Self {
            version: 1,
            debug: false,
            archive: ArchiveConfig::default(),
        }
    }
}

impl ReflectConfig {
    /// Load config from the default path, creating it if missing.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&config_path()?)
    }

    /// Load config from `path`, creating a default file if missing.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            tracing::debug!("Loaded reflect config from {:?}", path);
            Ok(config)
        } else {
            let default = Self::default();
            default.save_to(path)?;
            tracing::info!("Created default reflect config at {:?}", path);
            Ok(default)
        }
    }

    /// Save config to the default path.
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&config_path()?)
    }

    /// Save config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::debug!("Saved reflect config to {:?}", path);
        Ok(())
    }

    /// Reload config from `path`.
    pub fn reload(&mut self, path: &Path) -> ConfigResult<()> {
        let content = std::fs::read_to_string(path)?;
        *self = toml::from_str(&content)?;
        tracing::debug!("Reloaded reflect config from {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect_config_default() {
        let config = ReflectConfig::default();
        assert_eq!(config.version, 1);
        assert!(!config.debug);
        assert_eq!(config.archive.indent_width, 2);
        assert!(config.archive.verify_checksum);
        assert!(!config.archive.strict_casts);
    }

    #[test]
    fn test_reflect_config_serialize() {
        let mut config = ReflectConfig::default();
        config.version = 2;
        config.archive.strict_casts = true;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("version = 2"));
        assert!(toml_str.contains("strict_casts = true"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: ReflectConfig = toml::from_str("[archive]\ncache_capacity = 4\n").unwrap();
        assert_eq!(config.archive.cache_capacity, 4);
        assert_eq!(config.archive.indent_width, 2);
        assert_eq!(config.version, 1);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("reflect.toml");

        let config = ReflectConfig::load_from(&path).unwrap();
        assert_eq!(config, ReflectConfig::default());
        assert!(path.exists());

        std::fs::write(&path, "debug = true\n").unwrap();
        let mut reloaded = config.clone();
        reloaded.reload(&path).unwrap();
        assert!(reloaded.debug);
    }
}
