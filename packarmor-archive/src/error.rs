//! Error types for packarmor-archive.

use std::path::PathBuf;

use thiserror::Error;

use crate::compile::CompileError;

/// All errors that can arise while reconciling a library archive.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The archive could not be read or written as a zip container.
    #[error("zip error at {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// The staging directory has no file for a member the archive lists.
    #[error("archive member '{name}' not found in staging directory (expected {path})")]
    MissingMember { name: String, path: PathBuf },

    /// A member name is absolute or climbs out of the staging directory.
    #[error("archive member '{name}' escapes the staging directory")]
    UnsafeMemberName { name: String },

    #[error("staging directory {0} does not exist")]
    StagingMissing(PathBuf),

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("compiling sources under {path} failed: {source}")]
    Compile {
        path: PathBuf,
        #[source]
        source: CompileError,
    },
}

impl ReconcileError {
    /// True when a required file was absent, whichever layer noticed it.
    pub fn is_not_found(&self) -> bool {
        match self {
            ReconcileError::MissingMember { .. } | ReconcileError::StagingMissing(_) => true,
            ReconcileError::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Convenience constructor for [`ReconcileError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ReconcileError {
    ReconcileError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`ReconcileError::Zip`].
pub(crate) fn zip_err(path: impl Into<PathBuf>, source: zip::result::ZipError) -> ReconcileError {
    ReconcileError::Zip {
        path: path.into(),
        source,
    }
}
