//! Manager configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Parse(String),
}

/// Barclamp manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Root directory searched for `<name>/crowbar.yml` on import
    pub definitions_root: PathBuf,

    /// Capacity of the event broadcast channel
    pub event_capacity: usize,

    /// Localization settings
    pub locale: LocaleConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            definitions_root: PathBuf::from("barclamps"),
            event_capacity: 1024,
            locale: LocaleConfig::default(),
        }
    }
}

/// Localization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocaleConfig {
    pub language: String,

    /// Overrides for the built-in string table
    pub strings: HashMap<String, String>,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            strings: HashMap::new(),
        }
    }
}

impl ManagerConfig {
    /// Load configuration from a TOML file; a missing file yields defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ManagerConfig::default();
        assert_eq!(config.definitions_root, PathBuf::from("barclamps"));
        assert_eq!(config.event_capacity, 1024);
        assert_eq!(config.locale.language, "en");
    }

    #[test]
    fn test_load_missing_config() {
        let config = ManagerConfig::load("/nonexistent/path/crowbar.toml").unwrap();
        assert_eq!(config.event_capacity, 1024);
    }

    #[test]
    fn test_load_partial_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
definitions_root = "/opt/crowbar/barclamps"

[locale]
language = "de"

[locale.strings]
default = "standard"
"#
        )
        .unwrap();

        let config = ManagerConfig::load(file.path()).unwrap();
        assert_eq!(
            config.definitions_root,
            PathBuf::from("/opt/crowbar/barclamps")
        );
        assert_eq!(config.event_capacity, 1024);
        assert_eq!(config.locale.language, "de");
        assert_eq!(config.locale.strings["default"], "standard");
    }

    #[test]
    fn test_invalid_config() {
        let err = ManagerConfig::from_toml("event_capacity = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
