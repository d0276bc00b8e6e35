//! Error types for packarmor-pipeline.

use std::path::PathBuf;

use thiserror::Error;

use packarmor_archive::ReconcileError;
use packarmor_core::{ConfigError, PlanError};

/// All errors that can arise from a pack run.
#[derive(Debug, Error)]
pub enum PackError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("plan error: {0}")]
    Plan(#[from] PlanError),

    #[error("library archive error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// An external program could not be started at all.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("obfuscator command `{command}` failed ({status})")]
    Obfuscator { command: String, status: String },

    #[error("packager command `{command}` failed ({status})")]
    Packager { command: String, status: String },

    /// The packager failed, then putting the plain entry script back failed.
    #[error("{packager}; restoring the plain entry script also failed: {restore}")]
    RestoreAfterPackager {
        #[source]
        packager: Box<PackError>,
        restore: Box<PackError>,
    },

    #[error("could not determine interpreter platform/version: {0}")]
    InterpreterProbe(String),

    #[error("interpreter probe returned malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("entry script not found at {0}")]
    MissingEntry(PathBuf),

    /// The obfuscator's `build` left no obfuscated copy of the entry script.
    #[error("obfuscated entry script missing at {0}")]
    MissingObfuscatedEntry(PathBuf),

    /// `pytransform.py` is expected next to the obfuscator's scratch projects.
    #[error("runtime module missing at {0}")]
    MissingRuntimeModule(PathBuf),
}

/// Convenience constructor for [`PackError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> PackError {
    PackError::Io {
        path: path.into(),
        source,
    }
}
