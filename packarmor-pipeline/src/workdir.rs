//! Scoped change of the process working directory.

use std::path::{Path, PathBuf};

use crate::error::{io_err, PackError};

/// Changes the working directory on [`enter`](WorkdirGuard::enter) and
/// changes it back when dropped, on success, error and unwind alike.
///
/// The working directory is process-wide: only one guard should be live at a
/// time, and nothing else may change directory while it is.
#[derive(Debug)]
#[must_use = "the previous working directory is restored when the guard drops"]
pub struct WorkdirGuard {
    original: PathBuf,
}

impl WorkdirGuard {
    pub fn enter(dir: &Path) -> Result<Self, PackError> {
        let original = std::env::current_dir().map_err(|e| io_err(".", e))?;
        std::env::set_current_dir(dir).map_err(|e| io_err(dir, e))?;
        tracing::debug!(from = %original.display(), to = %dir.display(), "entered directory");
        Ok(Self { original })
    }

    /// Directory that will be restored on drop.
    pub fn original(&self) -> &Path {
        &self.original
    }
}

impl Drop for WorkdirGuard {
    fn drop(&mut self) {
        if let Err(err) = std::env::set_current_dir(&self.original) {
            tracing::error!(
                error = %err,
                dir = %self.original.display(),
                "failed to restore working directory"
            );
        }
    }
}
