//! Error types for packarmor-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::PackerKind;

/// All errors that can arise from configuration load / save / resolution.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (permission denied, unreadable cwd, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`: cannot locate `~/.packarmor/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// Errors raised while turning CLI input into a [`crate::PackPlan`].
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("cannot resolve path {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `--path` was given but the entry script does not live beneath it.
    #[error("entry script {entry} is not inside source path {src}")]
    EntryOutsideSource { entry: PathBuf, src: PathBuf },

    /// The entry argument has no file name component (e.g. `/` or `..`).
    #[error("entry script {0} has no file name")]
    InvalidEntry(PathBuf),

    /// The setup script path has no parent directory or file name.
    #[error("setup script {0} is not a file path")]
    InvalidSetup(PathBuf),

    /// Freeze-style layouts name their output after the interpreter.
    #[error("packager '{kind}' needs interpreter platform and version, none was probed")]
    InterpreterRequired { kind: PackerKind },
}

pub(crate) fn plan_io(path: impl Into<PathBuf>, source: std::io::Error) -> PlanError {
    PlanError::Io {
        path: path.into(),
        source,
    }
}
