//! TOML configuration for the tag table and the value store.
//!
//! ```toml
//! [tags]
//! paths = ["Combat.Melee.Hit", "Status.Stunned"]
//!
//! [value_store]
//! default_repository_name = "DefaultSubsystemRepository"
//! default_repository_priority = 0
//! scoped_repository_priority = 100
//! asset_repository_priority = 200
//! ```
//!
//! Every section and key is optional.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, tag::Tag};

/// Top-level configuration file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnifyConfig {
    pub tags: TagsSection,
    pub value_store: ValueStoreSettings,
}

/// `[tags]` section: paths registered in [`TagNames`](crate::names::TagNames) on startup.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagsSection {
    pub paths: Vec<String>,
}

/// `[value_store]` section. Also inserted as a Bevy resource by the plugin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueStoreSettings {
    pub default_repository_name: String,
    pub default_repository_priority: i32,
    pub scoped_repository_priority: i32,
    pub asset_repository_priority: i32,
}

impl Default for ValueStoreSettings {
    fn default() -> Self {
        Self {
            default_repository_name: "DefaultSubsystemRepository".into(),
            default_repository_priority: 0,
            scoped_repository_priority: 100,
            asset_repository_priority: 200,
        }
    }
}

impl UnifyConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        content.parse()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.value_store.default_repository_name.is_empty() {
            return Err(ConfigError::Validation(
                "value_store.default_repository_name cannot be empty".into(),
            ));
        }
        for path in &self.tags.paths {
            Tag::parse(path)?;
        }
        Ok(())
    }
}

impl FromStr for UnifyConfig {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let config: UnifyConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TagError;

    #[test]
    fn empty_file_uses_defaults() {
        let config: UnifyConfig = "".parse().unwrap();
        assert_eq!(config, UnifyConfig::default());
        assert_eq!(
            config.value_store.default_repository_name,
            "DefaultSubsystemRepository"
        );
        assert_eq!(config.value_store.asset_repository_priority, 200);
    }

    #[test]
    fn parses_full_file() {
        let toml = r#"
[tags]
paths = ["Combat.Melee.Hit", "Status.Stunned"]

[value_store]
default_repository_name = "Fallback"
scoped_repository_priority = 50
"#;
        let config: UnifyConfig = toml.parse().unwrap();
        assert_eq!(config.tags.paths.len(), 2);
        assert_eq!(config.value_store.default_repository_name, "Fallback");
        assert_eq!(config.value_store.scoped_repository_priority, 50);
        assert_eq!(config.value_store.default_repository_priority, 0);
    }

    #[test]
    fn rejects_invalid_tag_paths() {
        let err = "[tags]\npaths = [\"A..B\"]".parse::<UnifyConfig>().unwrap_err();
        assert!(matches!(err, ConfigError::Tag(TagError::InvalidPath { .. })));
    }

    #[test]
    fn rejects_empty_default_name() {
        let err = "[value_store]\ndefault_repository_name = \"\""
            .parse::<UnifyConfig>()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = "[tags\npaths = 1".parse::<UnifyConfig>().unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = UnifyConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
