//! Recursive tree copy with path-token substitution
//!
//! Walks a template tree top-down and materializes it under a target
//! directory. Every relative path has the `MODULE` and `PACKAGE` tokens
//! replaced before it is joined onto the target, so a package such as
//! `sk/o2/payments` expands into nested directories.
//!
//! Nothing is ever raised out of the copier. Each problem is handed to an
//! error policy together with the node it concerns, and the policy answers
//! [`ErrorDecision::Continue`] (skip that entry) or
//! [`ErrorDecision::Terminate`] (stop now, report failure).
//!
//! Links are followed. A dangling link is reported as
//! [`ErrorKind::SourceMissing`]; a link loop as [`ErrorKind::WalkFailure`].

use std::fmt;
use std::fs;
use std::io;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Token replaced by the module name
pub const MODULE_TOKEN: &str = "MODULE";

/// Token replaced by the package path
pub const PACKAGE_TOKEN: &str = "PACKAGE";

/// Kind of filesystem entry seen during traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File,
    Missing,
}

/// A filesystem entry as observed at one traversal step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    /// Path of the entry
    pub path: PathBuf,
    /// What the entry is (links are followed)
    pub kind: NodeKind,
    /// Byte length, for regular files only
    pub len: Option<u64>,
}

impl FileNode {
    /// Look at `path` on disk right now
    pub fn stat(path: &Path) -> Self {
        let (kind, len) = match fs::metadata(path) {
            Ok(meta) if meta.is_dir() => (NodeKind::Directory, None),
            Ok(meta) => (NodeKind::File, Some(meta.len())),
            Err(_) => (NodeKind::Missing, None),
        };

        Self {
            path: path.to_path_buf(),
            kind,
            len,
        }
    }

    pub fn exists(&self) -> bool {
        self.kind != NodeKind::Missing
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }
}

/// Class of problem reported to the error policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An entry expected to exist is absent
    SourceMissing,
    /// The walk could not descend into or enumerate an entry
    WalkFailure,
    /// The destination is occupied and was not (or could not be) cleared
    DestinationExists,
    /// A file (or directory) could not be materialized completely
    IncompleteCopy,
}

/// A problem met while copying, handed to the error policy
#[derive(Error, Debug)]
pub enum CopyError {
    #[error("The source file doesn't exist: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("Cannot walk {}: {source}", path.display())]
    WalkFailure {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("The destination file already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    #[error(
        "Source file wasn't copied completely: {} has {actual} of {expected} bytes",
        path.display()
    )]
    IncompleteCopy {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CopyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CopyError::SourceMissing(_) => ErrorKind::SourceMissing,
            CopyError::WalkFailure { .. } => ErrorKind::WalkFailure,
            CopyError::DestinationExists(_) => ErrorKind::DestinationExists,
            CopyError::IncompleteCopy { .. } | CopyError::Io { .. } => ErrorKind::IncompleteCopy,
        }
    }
}

/// Answer of an error policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDecision {
    /// Skip the faulty entry and keep going
    Continue,
    /// Abort the whole copy
    Terminate,
}

/// Default policy: every error is fatal
pub fn fail_fast(_node: &FileNode, _err: &CopyError) -> ErrorDecision {
    ErrorDecision::Terminate
}

/// Policy that skips every faulty entry
pub fn skip_all(_node: &FileNode, _err: &CopyError) -> ErrorDecision {
    ErrorDecision::Continue
}

/// The two token replacements applied to relative paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitutions {
    module_name: String,
    package_name: String,
}

impl Substitutions {
    pub fn new(module_name: impl Into<String>, package_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            package_name: package_name.into(),
        }
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// Replace the module token, then the package token
    pub fn apply(&self, relative: &str) -> String {
        relative
            .replace(MODULE_TOKEN, &self.module_name)
            .replace(PACKAGE_TOKEN, &self.package_name)
    }

    /// Substitute on the whole relative path so a token may add directory levels
    pub fn apply_path(&self, relative: &Path) -> PathBuf {
        match relative.to_str() {
            Some(s) => PathBuf::from(self.apply(s)),
            None => self.apply_raw(relative),
        }
    }

    #[cfg(unix)]
    fn apply_raw(&self, relative: &Path) -> PathBuf {
        use std::ffi::OsString;
        use std::os::unix::ffi::{OsStrExt, OsStringExt};

        let bytes = replace_bytes(
            relative.as_os_str().as_bytes(),
            MODULE_TOKEN.as_bytes(),
            self.module_name.as_bytes(),
        );
        let bytes = replace_bytes(&bytes, PACKAGE_TOKEN.as_bytes(), self.package_name.as_bytes());
        PathBuf::from(OsString::from_vec(bytes))
    }

    #[cfg(not(unix))]
    fn apply_raw(&self, relative: &Path) -> PathBuf {
        warn!(path = %relative.display(), "path is not valid unicode, tokens left as is");
        relative.to_path_buf()
    }
}

#[cfg(unix)]
fn replace_bytes(haystack: &[u8], from: &[u8], to: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(haystack.len());
    let mut rest = haystack;
    while !rest.is_empty() {
        if rest.starts_with(from) {
            out.extend_from_slice(to);
            rest = &rest[from.len()..];
        } else {
            out.push(rest[0]);
            rest = &rest[1..];
        }
    }
    out
}

/// Byte-copy step, returning the number of bytes written
pub trait FileCopier {
    fn copy_file(&self, src: &Path, dst: &Path) -> io::Result<u64>;
}

/// [`FileCopier`] backed by `std::fs::copy`
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileCopier;

impl FileCopier for StdFileCopier {
    fn copy_file(&self, src: &Path, dst: &Path) -> io::Result<u64> {
        fs::copy(src, dst)
    }
}

/// Removal of an occupied destination before it is overwritten
pub trait EntryRemover {
    fn remove(&self, node: &FileNode) -> io::Result<()>;
}

/// [`EntryRemover`] backed by `std::fs`, recursive for directories
#[derive(Debug, Clone, Copy, Default)]
pub struct StdEntryRemover;

impl EntryRemover for StdEntryRemover {
    fn remove(&self, node: &FileNode) -> io::Result<()> {
        if node.is_dir() {
            fs::remove_dir_all(&node.path)
        } else {
            fs::remove_file(&node.path)
        }
    }
}

/// Counters for one copy run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CopyReport {
    /// Directories created or merged into
    pub directories: u64,
    /// Files copied
    pub files: u64,
    /// Entries skipped after a `Continue` decision, short copies included
    pub skipped: u64,
    /// Errors handed to the policy
    pub errors: u64,
    /// The policy answered `Terminate`
    pub terminated: bool,
}

impl CopyReport {
    pub fn success(&self) -> bool {
        !self.terminated
    }
}

impl fmt::Display for CopyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "directories={} files={} skipped={} errors={}{}",
            self.directories,
            self.files,
            self.skipped,
            self.errors,
            if self.terminated { " (terminated)" } else { "" }
        )
    }
}

/// What the walk should do after an entry was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Descend,
    SkipSubtree,
}

/// Signature of a plain-function error policy
pub type PolicyFn = fn(&FileNode, &CopyError) -> ErrorDecision;

/// Copies a template tree into a target directory
///
/// ```no_run
/// use modgen::copy::{ErrorDecision, Substitutions, TreeCopier};
/// use std::path::Path;
///
/// let report = TreeCopier::new(Substitutions::new("payments", "sk/o2/payments"))
///     .overwrite(true)
///     .on_error(|_node, _err| ErrorDecision::Continue)
///     .run(Path::new("module_templates"), Path::new("feature"));
/// assert!(report.success());
/// ```
pub struct TreeCopier<P = PolicyFn> {
    substitutions: Substitutions,
    overwrite: bool,
    on_error: P,
    file_copier: Box<dyn FileCopier>,
    remover: Box<dyn EntryRemover>,
}

impl TreeCopier {
    /// Copier with overwrite disabled and the fail-fast policy
    pub fn new(substitutions: Substitutions) -> Self {
        Self {
            substitutions,
            overwrite: false,
            on_error: fail_fast,
            file_copier: Box::new(StdFileCopier),
            remover: Box::new(StdEntryRemover),
        }
    }
}

impl<P> TreeCopier<P> {
    /// Replace destination entries that already exist
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set the error policy
    pub fn on_error<Q>(self, on_error: Q) -> TreeCopier<Q>
    where
        Q: FnMut(&FileNode, &CopyError) -> ErrorDecision,
    {
        TreeCopier {
            substitutions: self.substitutions,
            overwrite: self.overwrite,
            on_error,
            file_copier: self.file_copier,
            remover: self.remover,
        }
    }

    /// Set the byte-copy implementation
    pub fn file_copier(mut self, file_copier: impl FileCopier + 'static) -> Self {
        self.file_copier = Box::new(file_copier);
        self
    }

    /// Set how occupied destinations are cleared when overwriting
    pub fn remover(mut self, remover: impl EntryRemover + 'static) -> Self {
        self.remover = Box::new(remover);
        self
    }
}

impl<P> TreeCopier<P>
where
    P: FnMut(&FileNode, &CopyError) -> ErrorDecision,
{
    /// Copy `source` into `target`
    pub fn run(mut self, source: &Path, target: &Path) -> CopyReport {
        let mut report = CopyReport::default();

        let root = FileNode::stat(source);
        if root.exists() {
            let _ = self.walk(source, target, &mut report);
        } else {
            let err = CopyError::SourceMissing(source.to_path_buf());
            let _ = self.decide(&root, &err, &mut report);
        }

        info!(
            source = %source.display(),
            target = %target.display(),
            "copy finished: {}",
            report
        );
        report
    }

    fn walk(&mut self, source: &Path, target: &Path, report: &mut CopyReport) -> ControlFlow<()> {
        let mut walker = WalkDir::new(source)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            match entry {
                Ok(entry) => {
                    let visit = self.visit(source, target, entry.path(), report)?;
                    if visit == Visit::SkipSubtree && entry.file_type().is_dir() {
                        walker.skip_current_dir();
                    }
                }
                Err(err) => {
                    let path = err.path().unwrap_or(source).to_path_buf();
                    let node = FileNode::stat(&path);
                    let dangling = err
                        .io_error()
                        .is_some_and(|e| e.kind() == io::ErrorKind::NotFound);
                    let err = if dangling {
                        CopyError::SourceMissing(path)
                    } else {
                        CopyError::WalkFailure { path, source: err }
                    };
                    self.decide(&node, &err, report)?;
                    report.skipped += 1;
                }
            }
        }

        ControlFlow::Continue(())
    }

    fn visit(
        &mut self,
        source: &Path,
        target: &Path,
        src: &Path,
        report: &mut CopyReport,
    ) -> ControlFlow<(), Visit> {
        let node = FileNode::stat(src);
        if !node.exists() {
            self.decide(&node, &CopyError::SourceMissing(src.to_path_buf()), report)?;
            report.skipped += 1;
            return ControlFlow::Continue(Visit::SkipSubtree);
        }

        let dst = self.destination(source, target, src);
        let existing = FileNode::stat(&dst);
        if existing.exists() && !(node.is_dir() && existing.is_dir()) {
            let still_exists = !self.overwrite || {
                if let Err(e) = self.remover.remove(&existing) {
                    debug!(path = %dst.display(), "remove failed: {}", e);
                }
                FileNode::stat(&dst).exists()
            };

            if still_exists {
                self.decide(&existing, &CopyError::DestinationExists(dst), report)?;
                report.skipped += 1;
                return ControlFlow::Continue(Visit::SkipSubtree);
            }
        }

        if node.is_dir() {
            if let Err(source) = fs::create_dir_all(&dst) {
                self.decide(&node, &CopyError::Io { path: dst, source }, report)?;
                report.skipped += 1;
                return ControlFlow::Continue(Visit::SkipSubtree);
            }
            debug!(dst = %dst.display(), "directory");
            report.directories += 1;
        } else {
            self.copy_file(&node, &dst, report)?;
        }

        ControlFlow::Continue(Visit::Descend)
    }

    fn copy_file(&mut self, node: &FileNode, dst: &Path, report: &mut CopyReport) -> ControlFlow<()> {
        let written = match dst.parent() {
            Some(parent) => fs::create_dir_all(parent),
            None => Ok(()),
        }
        .and_then(|()| self.file_copier.copy_file(&node.path, dst));

        if let Err(source) = written {
            let err = CopyError::Io {
                path: dst.to_path_buf(),
                source,
            };
            self.decide(node, &err, report)?;
            report.skipped += 1;
            return ControlFlow::Continue(());
        }

        let expected = node.len.unwrap_or(0);
        let actual = fs::metadata(dst).map(|m| m.len()).unwrap_or(0);
        if actual != expected {
            let err = CopyError::IncompleteCopy {
                path: node.path.clone(),
                expected,
                actual,
            };
            self.decide(node, &err, report)?;
            report.skipped += 1;
            return ControlFlow::Continue(());
        }

        debug!(src = %node.path.display(), dst = %dst.display(), bytes = actual, "file");
        report.files += 1;
        ControlFlow::Continue(())
    }

    fn destination(&self, source: &Path, target: &Path, src: &Path) -> PathBuf {
        let relative = src.strip_prefix(source).unwrap_or(src);
        if relative.as_os_str().is_empty() {
            return target.to_path_buf();
        }
        target.join(self.substitutions.apply_path(relative))
    }

    fn decide(&mut self, node: &FileNode, err: &CopyError, report: &mut CopyReport) -> ControlFlow<()> {
        report.errors += 1;
        match (self.on_error)(node, err) {
            ErrorDecision::Continue => {
                debug!(path = %node.path.display(), kind = ?err.kind(), "skipping: {}", err);
                ControlFlow::Continue(())
            }
            ErrorDecision::Terminate => {
                warn!(path = %node.path.display(), kind = ?err.kind(), "aborting: {}", err);
                report.terminated = true;
                ControlFlow::Break(())
            }
        }
    }
}

/// Copy `source` into `target`, returning whether the copy ran to completion
pub fn copy_tree<F>(
    source: &Path,
    target: &Path,
    overwrite: bool,
    on_error: F,
    substitutions: &Substitutions,
) -> bool
where
    F: FnMut(&FileNode, &CopyError) -> ErrorDecision,
{
    TreeCopier::new(substitutions.clone())
        .overwrite(overwrite)
        .on_error(on_error)
        .run(source, target)
        .success()
}
