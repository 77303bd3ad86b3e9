//! Module generation flow
//!
//! Resolves the template directory and the destination for a project,
//! materializes the template there, then registers the new sub-modules in
//! the settings file.

use anyhow::{bail, Context, Result};
use modgen_core::Config;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::copy::{CopyError, CopyReport, ErrorDecision, FileNode, TreeCopier};
use crate::names::ModuleDescriptor;
use crate::settings::SettingsUpdater;

/// Generation errors
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Templates directory not found: {}", .0.display())]
    TemplatesNotFound(PathBuf),

    #[error("Selected location does not exist: {}", .0.display())]
    SelectionNotFound(PathBuf),

    #[error("Copying templates into {} failed ({report})", destination.display())]
    CopyFailed {
        destination: PathBuf,
        report: CopyReport,
    },
}

/// Result of a successful generation
#[derive(Debug, Clone)]
pub struct Generated {
    /// Directory the template was copied into
    pub destination: PathBuf,
    /// Settings file that received the include lines
    pub settings_file: PathBuf,
    /// Copy counters
    pub report: CopyReport,
}

/// Generates modules inside one project
pub struct Generator {
    project_root: PathBuf,
    config: Config,
}

impl Generator {
    pub fn new(project_root: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            project_root: project_root.into(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Template root for this project
    pub fn templates_dir(&self) -> PathBuf {
        self.project_root.join(&self.config.templates_dir)
    }

    /// The selected directory, or the parent of a selected file
    pub fn destination_for(selection: &Path) -> Result<PathBuf> {
        let selection = fs::canonicalize(selection)
            .map_err(|_| GenerateError::SelectionNotFound(selection.to_path_buf()))?;

        if selection.is_dir() {
            return Ok(selection);
        }
        selection
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| GenerateError::SelectionNotFound(selection.clone()).into())
    }

    /// A relative selection is taken from the project root
    pub fn resolve_selection(&self, selection: &Path) -> PathBuf {
        if selection.is_absolute() {
            selection.to_path_buf()
        } else {
            self.project_root.join(selection)
        }
    }

    /// Descriptor from user-typed names, using the configured namespace
    pub fn descriptor(&self, module: &str, package: &str) -> Result<ModuleDescriptor> {
        Ok(ModuleDescriptor::from_input(module, package, &self.config.namespace)?)
    }

    fn existing_templates_dir(&self) -> Result<PathBuf> {
        let templates = self.templates_dir();
        if !templates.is_dir() {
            bail!(GenerateError::TemplatesNotFound(templates));
        }
        Ok(templates)
    }

    fn canonical_root(&self) -> Result<PathBuf> {
        fs::canonicalize(&self.project_root).with_context(|| {
            format!("Failed to resolve project root: {}", self.project_root.display())
        })
    }

    fn settings(&self) -> SettingsUpdater {
        SettingsUpdater::new(&self.config.settings_file)
    }

    /// Include lines a generation at `selection` would append
    pub fn preview(&self, selection: &Path, descriptor: &ModuleDescriptor) -> Result<Vec<String>> {
        let templates = self.existing_templates_dir()?;
        let destination = Self::destination_for(&self.resolve_selection(selection))?;
        let lines = self.settings().pending_declarations(
            &self.canonical_root()?,
            &destination,
            &templates,
            &descriptor.module_name,
        )?;
        Ok(lines)
    }

    /// Copy the templates next to `selection` and declare the new sub-modules
    ///
    /// The destination is checked against the project root before anything
    /// is written. The settings file is left alone when the copy does not
    /// complete.
    pub fn generate<P>(
        &self,
        selection: &Path,
        descriptor: &ModuleDescriptor,
        on_error: P,
    ) -> Result<Generated>
    where
        P: FnMut(&FileNode, &CopyError) -> ErrorDecision,
    {
        let templates = self.existing_templates_dir()?;
        let destination = Self::destination_for(&self.resolve_selection(selection))?;
        let root = self.canonical_root()?;
        let settings = self.settings();
        settings
            .pending_declarations(&root, &destination, &templates, &descriptor.module_name)
            .context("Cannot declare the new module")?;

        info!(
            module = %descriptor.module_name,
            package = %descriptor.package_name,
            destination = %destination.display(),
            "generating module"
        );

        let report = TreeCopier::new(descriptor.substitutions())
            .overwrite(self.config.overwrite)
            .on_error(on_error)
            .run(&templates, &destination);

        if !report.success() {
            bail!(GenerateError::CopyFailed {
                destination,
                report,
            });
        }

        let settings_file = settings
            .append_module_declarations(&root, &destination, &templates, &descriptor.module_name)
            .context("Failed to update settings file")?;

        Ok(Generated {
            destination,
            settings_file,
            report,
        })
    }
}
