//! Temporarily replace the plain entry script with its obfuscated copy.
//!
//! While the packager runs, the source tree must hold the obfuscated entry
//! script and the runtime module it imports:
//!
//! ```text
//! <armor-home>/pytransform.py      → <src>/pytransform.py   (copy)
//! <src>/<entry>                    → <project>/<entry>.bak  (move)
//! <project>/dist/<entry>           → <src>/<entry>          (move)
//! ```
//!
//! [`EntrySwap::restore`] undoes the first two steps.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{io_err, PackError};
use crate::obfuscator::RUNTIME_MODULE;

/// An installed swap. Must be [`restore`](EntrySwap::restore)d.
#[derive(Debug)]
#[must_use = "the plain entry script stays displaced until restore() is called"]
pub struct EntrySwap {
    entry: PathBuf,
    backup: PathBuf,
    runtime_module: PathBuf,
}

impl EntrySwap {
    /// Install the obfuscated entry script into `src`.
    ///
    /// On failure every step already taken is rolled back.
    pub fn install(
        armor_home: &Path,
        src: &Path,
        entry: &Path,
        project: &Path,
    ) -> Result<Self, PackError> {
        let runtime_source = armor_home.join(RUNTIME_MODULE);
        if !runtime_source.is_file() {
            return Err(PackError::MissingRuntimeModule(runtime_source));
        }
        let obfuscated = project.join("dist").join(entry);
        if !obfuscated.is_file() {
            return Err(PackError::MissingObfuscatedEntry(obfuscated));
        }

        let swap = Self {
            entry: src.join(entry),
            backup: backup_path(project, entry),
            runtime_module: src.join(RUNTIME_MODULE),
        };

        fs::copy(&runtime_source, &swap.runtime_module)
            .map_err(|e| io_err(&swap.runtime_module, e))?;

        if let Err(e) = move_file(&swap.entry, &swap.backup) {
            let _ = fs::remove_file(&swap.runtime_module);
            return Err(io_err(&swap.entry, e));
        }

        if let Err(e) = move_file(&obfuscated, &swap.entry) {
            let _ = move_file(&swap.backup, &swap.entry);
            let _ = fs::remove_file(&swap.runtime_module);
            return Err(io_err(&obfuscated, e));
        }

        tracing::debug!(entry = %swap.entry.display(), "obfuscated entry script installed");
        Ok(swap)
    }

    /// Put the plain entry script back and remove the runtime module.
    pub fn restore(self) -> Result<(), PackError> {
        move_file(&self.backup, &self.entry).map_err(|e| io_err(&self.backup, e))?;
        match fs::remove_file(&self.runtime_module) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(path = %self.runtime_module.display(), "runtime module already gone");
            }
            Err(e) => return Err(io_err(&self.runtime_module, e)),
        }
        tracing::debug!(entry = %self.entry.display(), "plain entry script restored");
        Ok(())
    }
}

/// `<project>/<entry>.bak`
fn backup_path(project: &Path, entry: &Path) -> PathBuf {
    let mut name = project.join(entry).into_os_string();
    name.push(".bak");
    PathBuf::from(name)
}

/// Rename, falling back to copy + delete across filesystems. Creates the
/// destination's parent and replaces an existing destination file.
pub(crate) fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(e),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}
