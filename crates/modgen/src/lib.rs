//! modgen - generate modules from a template tree
//!
//! A project keeps a template tree (by default `module_templates/`) holding a
//! single top-level module folder whose sub-folders are the sub-modules to
//! create. Generating a module copies that tree next to the selected
//! location, renaming every `MODULE` and `PACKAGE` token in paths, and then
//! appends one `include` line per sub-module to the build settings file.
//!
//! The copy itself lives in [`copy`] and knows nothing about projects; the
//! settings side lives in [`settings`]; [`generate`] ties both together.

pub mod copy;
pub mod generate;
pub mod names;
pub mod settings;

pub use copy::{
    copy_tree, fail_fast, CopyError, CopyReport, ErrorDecision, ErrorKind, FileNode, NodeKind,
    Substitutions, TreeCopier,
};
pub use generate::{GenerateError, Generated, Generator};
pub use names::{ModuleDescriptor, NameError};
pub use settings::{append_module_declarations, SettingsError, SettingsUpdater};
