//! Configuration management for modgen

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf, MAIN_SEPARATOR_STR};

use crate::paths::Paths;

/// Generator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Template root, relative to the project root
    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,

    /// Build-settings file receiving include lines, relative to the project root
    #[serde(default = "default_settings_file")]
    pub settings_file: PathBuf,

    /// Namespace segments every package name is nested under
    #[serde(default = "default_namespace")]
    pub namespace: Vec<String>,

    /// Replace destination entries that already exist
    #[serde(default = "default_overwrite")]
    pub overwrite: bool,
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("module_templates")
}

fn default_settings_file() -> PathBuf {
    PathBuf::from("settings.gradle")
}

fn default_namespace() -> Vec<String> {
    vec!["sk".to_string(), "o2".to_string()]
}

fn default_overwrite() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            templates_dir: default_templates_dir(),
            settings_file: default_settings_file(),
            namespace: default_namespace(),
            overwrite: default_overwrite(),
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Load the project config if present, else the user config, else defaults
    pub fn discover(project_root: &Path) -> Result<Self> {
        let project_file = Paths::project_config_file(project_root);
        if project_file.exists() {
            return Self::load(&project_file);
        }
        Self::load(&Paths::new().config_file())
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Namespace rendered as a relative path, e.g. `sk/o2`
    pub fn namespace_path(&self) -> String {
        self.namespace.join(MAIN_SEPARATOR_STR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_returns_default() -> Result<()> {
        let tmp = TempDir::new()?;
        let config = Config::load(&tmp.path().join("nope.json"))?;
        assert_eq!(config, Config::default());
        assert_eq!(config.templates_dir, PathBuf::from("module_templates"));
        assert_eq!(config.settings_file, PathBuf::from("settings.gradle"));
        assert!(config.overwrite);
        Ok(())
    }

    #[test]
    fn test_partial_file_keeps_defaults() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"settings_file": "settings.gradle.kts", "overwrite": false}"#)?;

        let config = Config::load(&path)?;
        assert_eq!(config.settings_file, PathBuf::from("settings.gradle.kts"));
        assert!(!config.overwrite);
        assert_eq!(config.namespace, vec!["sk", "o2"]);
        Ok(())
    }

    #[test]
    fn test_save_then_discover_project_file() -> Result<()> {
        let tmp = TempDir::new()?;
        let config = Config {
            namespace: vec!["com".to_string(), "acme".to_string()],
            ..Default::default()
        };
        config.save(&Paths::project_config_file(tmp.path()))?;

        let found = Config::discover(tmp.path())?;
        assert_eq!(found, config);
        Ok(())
    }

    #[test]
    fn test_invalid_json_is_an_error() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "{ not json")?;
        assert!(Config::load(&path).is_err());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_namespace_path() {
        assert_eq!(Config::default().namespace_path(), "sk/o2");
    }
}
