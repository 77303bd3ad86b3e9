//! Build-settings registration
//!
//! After a module is generated, every sub-module folder of the template gets
//! an `include "<path>"` line appended to the project's settings file. The
//! include path is the target directory relative to the project root written
//! in colon notation, then the module name, then the sub-module folder.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

/// Settings file used when none is configured
pub const DEFAULT_SETTINGS_FILE: &str = "settings.gradle";

/// Settings update errors
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Target {} is not inside project root {}", target.display(), root.display())]
    TargetOutsideRoot { target: PathBuf, root: PathBuf },

    #[error("Template root has no entries: {}", .0.display())]
    EmptyTemplate(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SettingsError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Module path of `target_dir` relative to `root_dir`, e.g. `:feature:checkout`
///
/// A target equal to the root yields an empty string.
pub fn module_path_prefix(root_dir: &Path, target_dir: &Path) -> Result<String, SettingsError> {
    let relative = target_dir
        .strip_prefix(root_dir)
        .map_err(|_| SettingsError::TargetOutsideRoot {
            target: target_dir.to_path_buf(),
            root: root_dir.to_path_buf(),
        })?;

    let segments: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    if segments.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!(":{}", segments.join(":")))
    }
}

/// Names of the sub-module folders inside the template's first top-level entry
///
/// Entries are taken in file-name order. Regular files are ignored, and a
/// first entry that is not a directory declares nothing.
pub fn template_submodules(template_root: &Path) -> Result<Vec<String>, SettingsError> {
    let first = sorted_entries(template_root)?
        .into_iter()
        .next()
        .ok_or_else(|| SettingsError::EmptyTemplate(template_root.to_path_buf()))?;

    if !first.is_dir() {
        debug!(path = %first.display(), "first template entry is not a directory");
        return Ok(Vec::new());
    }

    Ok(sorted_entries(&first)?
        .into_iter()
        .filter(|p| p.is_dir())
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect())
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, SettingsError> {
    let mut entries = fs::read_dir(dir)
        .map_err(SettingsError::io(dir))?
        .map(|e| e.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()
        .map_err(SettingsError::io(dir))?;
    entries.sort();
    Ok(entries)
}

/// One include line per sub-module
pub fn declarations(prefix: &str, module_name: &str, submodules: &[String]) -> Vec<String> {
    submodules
        .iter()
        .map(|child| format!("include \"{}:{}:{}\"", prefix, module_name, child))
        .collect()
}

/// Appends include lines to a settings file at a fixed place under the project root
#[derive(Debug, Clone)]
pub struct SettingsUpdater {
    settings_file: PathBuf,
}

impl Default for SettingsUpdater {
    fn default() -> Self {
        Self::new(DEFAULT_SETTINGS_FILE)
    }
}

impl SettingsUpdater {
    /// `settings_file` is relative to the project root
    pub fn new(settings_file: impl Into<PathBuf>) -> Self {
        Self {
            settings_file: settings_file.into(),
        }
    }

    pub fn settings_path(&self, root_dir: &Path) -> PathBuf {
        root_dir.join(&self.settings_file)
    }

    /// Include lines that would be appended, without touching the settings file
    pub fn pending_declarations(
        &self,
        root_dir: &Path,
        target_dir: &Path,
        template_root_dir: &Path,
        module_name: &str,
    ) -> Result<Vec<String>, SettingsError> {
        let prefix = module_path_prefix(root_dir, target_dir)?;
        let submodules = template_submodules(template_root_dir)?;
        Ok(declarations(&prefix, module_name, &submodules))
    }

    /// Append the include lines and return the settings file path
    ///
    /// Existing content is kept as is. Nothing is written when the template
    /// has no sub-module folders.
    pub fn append_module_declarations(
        &self,
        root_dir: &Path,
        target_dir: &Path,
        template_root_dir: &Path,
        module_name: &str,
    ) -> Result<PathBuf, SettingsError> {
        let settings_path = self.settings_path(root_dir);
        let lines =
            self.pending_declarations(root_dir, target_dir, template_root_dir, module_name)?;

        if lines.is_empty() {
            debug!(path = %settings_path.display(), "no sub-modules to declare");
            return Ok(settings_path);
        }

        let text: String = lines.iter().map(|line| format!("\n{}", line)).collect();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&settings_path)
            .map_err(SettingsError::io(&settings_path))?;
        file.write_all(text.as_bytes())
            .map_err(SettingsError::io(&settings_path))?;

        info!(
            path = %settings_path.display(),
            count = lines.len(),
            "declared sub-modules"
        );
        Ok(settings_path)
    }
}

/// Append include lines to `settings.gradle` under `root_dir`
pub fn append_module_declarations(
    root_dir: &Path,
    target_dir: &Path,
    template_root_dir: &Path,
    module_name: &str,
) -> Result<PathBuf, SettingsError> {
    SettingsUpdater::default().append_module_declarations(
        root_dir,
        target_dir,
        template_root_dir,
        module_name,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn template(root: &Path) -> PathBuf {
        let templates = root.join("module_templates");
        fs::create_dir_all(templates.join("MODULE/impl")).unwrap();
        fs::create_dir_all(templates.join("MODULE/api")).unwrap();
        fs::write(templates.join("MODULE/README.md"), "not a module").unwrap();
        templates
    }

    #[test]
    fn test_module_path_prefix() {
        let root = Path::new("/work/app");
        assert_eq!(module_path_prefix(root, root).unwrap(), "");
        assert_eq!(
            module_path_prefix(root, Path::new("/work/app/feature")).unwrap(),
            ":feature"
        );
        assert_eq!(
            module_path_prefix(root, Path::new("/work/app/feature/checkout")).unwrap(),
            ":feature:checkout"
        );
        assert!(matches!(
            module_path_prefix(root, Path::new("/elsewhere")),
            Err(SettingsError::TargetOutsideRoot { .. })
        ));
    }

    #[test]
    fn test_declarations_format() {
        let lines = declarations(":feature", "payments", &["api".to_string()]);
        assert_eq!(lines, vec!["include \":feature:payments:api\"".to_string()]);
    }

    #[test]
    fn test_appends_one_line_per_subfolder() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        let templates = template(root);
        let settings = root.join("settings.gradle");
        fs::write(&settings, "rootProject.name = \"app\"\ninclude \":app\"").unwrap();
        let target = root.join("feature");
        fs::create_dir_all(&target).unwrap();

        let path = append_module_declarations(root, &target, &templates, "payments").unwrap();

        assert_eq!(path, settings);
        assert_eq!(
            fs::read_to_string(&settings).unwrap(),
            "rootProject.name = \"app\"\ninclude \":app\"\n\
             include \":feature:payments:api\"\n\
             include \":feature:payments:impl\""
        );
    }

    #[test]
    fn test_root_level_target_has_empty_prefix() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        let templates = template(root);

        let path = append_module_declarations(root, root, &templates, "core").unwrap();

        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "\ninclude \":core:api\"\ninclude \":core:impl\""
        );
    }

    #[test]
    fn test_repeated_runs_do_not_deduplicate() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        let templates = template(root);
        let updater = SettingsUpdater::new("settings.gradle.kts");

        updater
            .append_module_declarations(root, root, &templates, "core")
            .unwrap();
        let path = updater
            .append_module_declarations(root, root, &templates, "core")
            .unwrap();

        assert!(path.ends_with("settings.gradle.kts"));
        let text = fs::read_to_string(path).unwrap();
        assert_eq!(text.matches("include \":core:api\"").count(), 2);
    }

    #[test]
    fn test_empty_template_root() {
        let tmp = TempDir::new().unwrap();
        let templates = tmp.path().join("module_templates");
        fs::create_dir_all(&templates).unwrap();

        let err = append_module_declarations(tmp.path(), tmp.path(), &templates, "core")
            .unwrap_err();
        assert!(matches!(err, SettingsError::EmptyTemplate(_)));
        assert!(!tmp.path().join("settings.gradle").exists());
    }

    #[test]
    fn test_first_entry_without_subfolders_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let templates = tmp.path().join("module_templates");
        fs::create_dir_all(templates.join("MODULE")).unwrap();

        let path = append_module_declarations(tmp.path(), tmp.path(), &templates, "core").unwrap();
        assert!(!path.exists());
    }
}
