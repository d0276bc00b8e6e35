//! Reading a library archive and rebuilding it from a staging directory.
//!
//! The archive is opened once, read-only, to capture its [`ArchiveManifest`]
//! and extract its members. It is then closed and rebuilt from scratch:
//! `<archive>.packarmor.tmp` is written member by member in manifest order and
//! renamed over the original, so a failed rebuild leaves the old archive
//! untouched.
//!
//! A member whose staged bytes still equal the archived ones is raw-copied
//! from the old archive: compressed data, CRC, timestamp and mode are kept
//! as they were. Only changed members are re-encoded.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use zip::write::FileOptions;
use zip::result::ZipResult;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::error::{io_err, zip_err, ReconcileError};

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// One archive member, with what is needed to write it back identically.
#[derive(Debug, Clone)]
pub struct MemberSpec {
    /// Name as stored in the archive (`/`-separated).
    pub name: String,
    /// `name` as a path relative to the staging directory.
    pub relative: PathBuf,
    pub is_dir: bool,
    pub compression: CompressionMethod,
    pub last_modified: DateTime,
    /// Unix mode from the external attributes, when the archive records one.
    pub unix_mode: Option<u32>,
}

impl MemberSpec {
    fn options(&self) -> FileOptions {
        let options = FileOptions::default()
            .compression_method(writable_compression(self.compression))
            .last_modified_time(self.last_modified);
        match self.unix_mode {
            Some(mode) => options.unix_permissions(mode),
            None => options,
        }
    }
}

/// Ordered member list of a library archive. The order and name set are
/// authoritative for the rebuilt archive.
#[derive(Debug, Clone, Default)]
pub struct ArchiveManifest {
    members: Vec<MemberSpec>,
}

impl ArchiveManifest {
    pub fn members(&self) -> &[MemberSpec] {
        &self.members
    }

    pub fn names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Rewrite `archive_path` with every member read from `staging`.
    ///
    /// Fails with [`ReconcileError::MissingMember`] if any file member has no
    /// counterpart in `staging`; the original archive is then left as it was.
    pub fn rebuild(&self, archive_path: &Path, staging: &Path) -> Result<(), ReconcileError> {
        let tmp = PathBuf::from(format!("{}.packarmor.tmp", archive_path.display()));

        let copied = match self.write_archive(archive_path, &tmp, staging) {
            Ok(copied) => copied,
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&tmp, archive_path) {
            let _ = fs::remove_file(&tmp);
            return Err(io_err(archive_path, e));
        }

        tracing::info!(
            members = self.members.len(),
            unchanged = copied,
            "rebuilt {}",
            archive_path.display()
        );
        Ok(())
    }

    /// Write the rebuilt archive to `out`; returns how many members were
    /// raw-copied from the archive at `archive_path`.
    fn write_archive(
        &self,
        archive_path: &Path,
        out: &Path,
        staging: &Path,
    ) -> Result<usize, ReconcileError> {
        let mut original = open_original(archive_path)?;
        let file = File::create(out).map_err(|e| io_err(out, e))?;
        let mut zip = ZipWriter::new(file);
        let mut copied = 0;

        for (index, member) in self.members.iter().enumerate() {
            if member.is_dir {
                zip.add_directory(member.name.clone(), member.options())
                    .map_err(|e| zip_err(out, e))?;
                continue;
            }

            let source = staging.join(&member.relative);
            let data = match fs::read(&source) {
                Ok(data) => data,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(ReconcileError::MissingMember {
                        name: member.name.clone(),
                        path: source,
                    });
                }
                Err(e) => return Err(io_err(&source, e)),
            };

            if let Some(archive) = original.as_mut() {
                let unchanged = matches_original(archive, index, member, &data)
                    .map_err(|e| zip_err(archive_path, e))?;
                if unchanged {
                    let entry = archive
                        .by_index(index)
                        .map_err(|e| zip_err(archive_path, e))?;
                    zip.raw_copy_file(entry).map_err(|e| zip_err(out, e))?;
                    copied += 1;
                    tracing::debug!(member = %member.name, "copied unchanged");
                    continue;
                }
            }

            zip.start_file(member.name.clone(), member.options())
                .map_err(|e| zip_err(out, e))?;
            zip.write_all(&data).map_err(|e| io_err(&source, e))?;
            tracing::debug!(member = %member.name, "packed");
        }

        let mut file = zip.finish().map_err(|e| zip_err(out, e))?;
        file.flush().map_err(|e| io_err(out, e))?;
        Ok(copied)
    }
}

/// The archive being replaced, if there is one to copy from.
fn open_original(path: &Path) -> Result<Option<ZipArchive<File>>, ReconcileError> {
    match File::open(path) {
        Ok(file) => ZipArchive::new(file)
            .map(Some)
            .map_err(|e| zip_err(path, e)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_err(path, e)),
    }
}

/// Whether entry `index` of `archive` is `member` and holds exactly `data`.
fn matches_original(
    archive: &mut ZipArchive<File>,
    index: usize,
    member: &MemberSpec,
    data: &[u8],
) -> ZipResult<bool> {
    if index >= archive.len() {
        return Ok(false);
    }
    let mut entry = archive.by_index(index)?;
    if entry.name() != member.name || entry.size() != data.len() as u64 {
        return Ok(false);
    }
    let mut archived = Vec::with_capacity(data.len());
    entry.read_to_end(&mut archived)?;
    Ok(archived == data)
}

// ---------------------------------------------------------------------------
// Source archive
// ---------------------------------------------------------------------------

/// Outcome of [`SourceArchive::extract_into`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Members written into the staging directory.
    pub extracted: Vec<String>,
    /// Members left alone because a fresh file already occupies their path.
    pub kept_fresh: Vec<String>,
}

/// An open, read-only library archive. Dropping it closes the file.
pub struct SourceArchive {
    path: PathBuf,
    zip: ZipArchive<File>,
}

impl SourceArchive {
    pub fn open(path: &Path) -> Result<Self, ReconcileError> {
        let file = File::open(path).map_err(|e| io_err(path, e))?;
        let zip = ZipArchive::new(file).map_err(|e| zip_err(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            zip,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Capture the ordered member list.
    pub fn manifest(&mut self) -> Result<ArchiveManifest, ReconcileError> {
        let mut members = Vec::with_capacity(self.zip.len());
        for index in 0..self.zip.len() {
            let entry = self.zip.by_index(index).map_err(|e| zip_err(&self.path, e))?;
            let relative = entry
                .enclosed_name()
                .map(Path::to_path_buf)
                .ok_or_else(|| ReconcileError::UnsafeMemberName {
                    name: entry.name().to_string(),
                })?;
            members.push(MemberSpec {
                name: entry.name().to_string(),
                relative,
                is_dir: entry.is_dir(),
                compression: entry.compression(),
                last_modified: entry.last_modified(),
                unix_mode: entry.unix_mode(),
            });
        }
        Ok(ArchiveManifest { members })
    }

    /// Extract every member into `staging`, overwriting stale files, except
    /// members whose relative path is listed in `fresh`.
    pub fn extract_into(
        &mut self,
        staging: &Path,
        fresh: &BTreeSet<PathBuf>,
    ) -> Result<ExtractSummary, ReconcileError> {
        let mut summary = ExtractSummary::default();

        for index in 0..self.zip.len() {
            let mut entry = self.zip.by_index(index).map_err(|e| zip_err(&self.path, e))?;
            let name = entry.name().to_string();
            let relative = entry
                .enclosed_name()
                .map(Path::to_path_buf)
                .ok_or_else(|| ReconcileError::UnsafeMemberName { name: name.clone() })?;
            let dest = staging.join(&relative);

            if entry.is_dir() {
                fs::create_dir_all(&dest).map_err(|e| io_err(&dest, e))?;
                continue;
            }

            if fresh.contains(&relative) {
                tracing::debug!(member = %name, "fresh file shadows archived copy");
                summary.kept_fresh.push(name);
                continue;
            }

            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
            }
            let mut out = File::create(&dest).map_err(|e| io_err(&dest, e))?;
            io::copy(&mut entry, &mut out).map_err(|e| io_err(&dest, e))?;
            summary.extracted.push(name);
        }

        Ok(summary)
    }
}

/// Compression methods the writer can reproduce; anything else is re-deflated.
fn writable_compression(method: CompressionMethod) -> CompressionMethod {
    match method {
        CompressionMethod::Stored => CompressionMethod::Stored,
        _ => CompressionMethod::Deflated,
    }
}
