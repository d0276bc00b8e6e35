//! # packarmor-pipeline
//!
//! Sequencing glue between the obfuscator, the packager and the library
//! archive.
//!
//! Call [`pipeline::plan`] to resolve user input, then [`pipeline::run`] with
//! a [`Toolchain`] of real ([`PyArmor`], [`PythonPackager`]) or fake tools.

pub mod error;
pub mod obfuscator;
pub mod packager;
pub mod pipeline;
pub mod swap;
pub mod workdir;

pub use error::PackError;
pub use obfuscator::{ArmorCommand, Obfuscator, PyArmor};
pub use packager::{Packager, PythonPackager};
pub use pipeline::{PackReport, Toolchain};
pub use workdir::WorkdirGuard;
