//! # packarmor-archive
//!
//! Merge freshly obfuscated sources into a packager-produced library archive.
//!
//! Call [`reconcile`] with the library archive, the staging directory holding
//! the obfuscated scripts, and a [`Compiler`]. The stages are also exposed
//! individually through [`SourceArchive`] and [`ArchiveManifest`].

pub mod compile;
pub mod error;
pub mod manifest;
mod reconcile;

pub use compile::{compiled_path, CompileError, Compiler, PyCompiler};
pub use error::ReconcileError;
pub use manifest::{ArchiveManifest, ExtractSummary, MemberSpec, SourceArchive};
pub use reconcile::{reconcile, staged_files, ReconcileReport};
