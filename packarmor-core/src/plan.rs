//! Resolve command-line input into a fully absolute pack plan.
//!
//! ```text
//! packarmor app/main.py                    src = <cwd>/app, entry = main.py
//! packarmor --path app app/pkg/main.py     src = <cwd>/app, entry = pkg/main.py
//! ```
//!
//! The setup script defaults to `<src>/setup.py`; the packager runs in its
//! directory and writes its output relative to it.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::error::{plan_io, PlanError};
use crate::types::{BundleTarget, InterpreterInfo, PackerKind};

/// Raw user input, before any path is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackRequest {
    pub entry: PathBuf,
    pub kind: PackerKind,
    /// Source directory override (`--path`).
    pub path: Option<PathBuf>,
    /// Setup script override (`--setup`).
    pub setup: Option<PathBuf>,
}

impl PackRequest {
    pub fn new(entry: impl Into<PathBuf>, kind: PackerKind) -> Self {
        Self {
            entry: entry.into(),
            kind,
            path: None,
            setup: None,
        }
    }
}

/// Everything the pipeline needs to know about one pack run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackPlan {
    pub kind: PackerKind,
    /// Absolute source directory handed to the obfuscator.
    pub src: PathBuf,
    /// Entry script, relative to `src`.
    pub entry: PathBuf,
    /// Absolute path of the packager's setup script.
    pub setup: PathBuf,
    pub target: BundleTarget,
}

impl PackPlan {
    /// Resolve `request` against the current directory.
    ///
    /// `interpreter` is only consulted for freeze-style layouts; pass `None`
    /// for the others to skip probing.
    pub fn resolve(
        request: &PackRequest,
        interpreter: Option<&InterpreterInfo>,
    ) -> Result<Self, PlanError> {
        let entry_abs = absolute(&request.entry)?;

        let (src, entry) = match &request.path {
            None => {
                let name = entry_abs
                    .file_name()
                    .ok_or_else(|| PlanError::InvalidEntry(request.entry.clone()))?;
                let src = entry_abs
                    .parent()
                    .ok_or_else(|| PlanError::InvalidEntry(request.entry.clone()))?;
                (src.to_path_buf(), PathBuf::from(name))
            }
            Some(path) => {
                let src = absolute(path)?;
                let entry = entry_abs
                    .strip_prefix(&src)
                    .map_err(|_| PlanError::EntryOutsideSource {
                        entry: request.entry.clone(),
                        src: src.clone(),
                    })?
                    .to_path_buf();
                if entry.as_os_str().is_empty() {
                    return Err(PlanError::InvalidEntry(request.entry.clone()));
                }
                (src, entry)
            }
        };

        let setup = match &request.setup {
            None => src.join("setup.py"),
            Some(setup) => absolute(setup)?,
        };
        if setup.file_name().is_none() || setup.parent().is_none() {
            return Err(PlanError::InvalidSetup(setup));
        }

        let layout = request.kind.layout();
        let target = if layout.needs_interpreter() {
            let info = interpreter.ok_or(PlanError::InterpreterRequired { kind: request.kind })?;
            BundleTarget::freeze(info)
        } else {
            BundleTarget::py2exe()
        };

        Ok(Self {
            kind: request.kind,
            src,
            entry,
            setup,
            target,
        })
    }

    /// Directory the packager runs in.
    pub fn setup_dir(&self) -> &Path {
        self.setup.parent().unwrap_or(Path::new("."))
    }

    /// File name of the setup script, as passed to the interpreter.
    pub fn setup_script(&self) -> &OsStr {
        self.setup.file_name().unwrap_or(OsStr::new("setup.py"))
    }

    /// Absolute packager output directory.
    pub fn output_dir(&self) -> PathBuf {
        self.setup_dir().join(&self.target.output_dir)
    }

    /// Absolute path of the library archive the packager produces.
    pub fn library_path(&self) -> PathBuf {
        self.output_dir().join(&self.target.library_name)
    }

    pub fn pack_command(&self) -> &'static str {
        self.target.pack_command()
    }
}

fn absolute(path: &Path) -> Result<PathBuf, PlanError> {
    std::path::absolute(path).map_err(|e| plan_io(path, e))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
