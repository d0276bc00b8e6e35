//! Archive reconciliation: 4-step protocol.
//!
//! 1. Enumerate the files already in the staging directory (fresh set).
//! 2. Open the archive, capture its manifest, extract its members into the
//!    staging directory; members shadowed by a fresh file are skipped.
//! 3. Compile every fresh file the compiler accepts, next to its source.
//! 4. Rebuild the archive from the manifest, reading members from staging.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::compile::{compiled_path, Compiler};
use crate::error::ReconcileError;
use crate::manifest::SourceArchive;

/// What [`reconcile`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Member names of the rebuilt archive, in archive order.
    pub members: Vec<String>,
    /// Members restored from the old archive.
    pub extracted: Vec<String>,
    /// Members whose fresh staged copy won over the archived one.
    pub kept_fresh: Vec<String>,
    /// Compiled units written, relative to the staging directory.
    pub compiled: Vec<PathBuf>,
}

/// Replace stale members of `archive_path` with compiled fresh files from
/// `staging`, keeping the archive's member names and order.
pub fn reconcile(
    archive_path: &Path,
    staging: &Path,
    compiler: &dyn Compiler,
) -> Result<ReconcileReport, ReconcileError> {
    if !staging.is_dir() {
        return Err(ReconcileError::StagingMissing(staging.to_path_buf()));
    }

    // Step 1: fresh files, before extraction adds anything.
    let fresh = staged_files(staging)?;
    tracing::debug!(count = fresh.len(), "staged files before extraction");

    // Step 2: manifest + extraction; the archive closes at end of scope.
    let (manifest, summary) = {
        let mut archive = SourceArchive::open(archive_path)?;
        let manifest = archive.manifest()?;
        let summary = archive.extract_into(staging, &fresh)?;
        (manifest, summary)
    };
    tracing::info!(
        members = manifest.len(),
        extracted = summary.extracted.len(),
        kept_fresh = summary.kept_fresh.len(),
        "read {}",
        archive_path.display()
    );

    // Step 3: compile the fresh set only.
    let jobs: Vec<(PathBuf, PathBuf)> = fresh
        .iter()
        .map(|rel| staging.join(rel))
        .filter(|source| compiler.accepts(source))
        .map(|source| {
            let target = compiled_path(&source);
            (source, target)
        })
        .collect();
    compiler
        .compile_all(&jobs)
        .map_err(|source| ReconcileError::Compile {
            path: staging.to_path_buf(),
            source,
        })?;
    let compiled = jobs
        .iter()
        .filter_map(|(_, target)| target.strip_prefix(staging).ok())
        .map(Path::to_path_buf)
        .collect();

    // Step 4: rebuild in manifest order.
    manifest.rebuild(archive_path, staging)?;

    Ok(ReconcileReport {
        members: manifest.names().into_iter().map(str::to_string).collect(),
        extracted: summary.extracted,
        kept_fresh: summary.kept_fresh,
        compiled,
    })
}

/// Every regular file under `dir`, relative to it.
pub fn staged_files(dir: &Path) -> Result<BTreeSet<PathBuf>, ReconcileError> {
    let mut files = BTreeSet::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| ReconcileError::Walk {
            path: dir.to_path_buf(),
            source: e,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(rel) = entry.path().strip_prefix(dir) {
            files.insert(rel.to_path_buf());
        }
    }
    Ok(files)
}
