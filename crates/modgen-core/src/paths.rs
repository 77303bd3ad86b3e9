//! Standard paths used by modgen

use std::path::{Path, PathBuf};

/// Name of the per-project configuration file
pub const PROJECT_CONFIG_FILE: &str = ".modgen.json";

/// Standard modgen paths
pub struct Paths {
    /// Config directory (~/.config/modgen)
    pub config: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let config = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("modgen");

        Self { config }
    }

    /// User-level configuration file
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.json")
    }

    /// Project-level configuration file under `project_root`
    pub fn project_config_file(project_root: &Path) -> PathBuf {
        project_root.join(PROJECT_CONFIG_FILE)
    }
}
