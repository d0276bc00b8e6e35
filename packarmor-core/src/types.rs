//! Domain types for packing obfuscated scripts.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Packager kinds
// ---------------------------------------------------------------------------

/// The third-party packaging tool selected with `--type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PackerKind {
    #[default]
    #[serde(rename = "py2exe")]
    Py2exe,
    #[serde(rename = "py2app")]
    Py2app,
    #[serde(rename = "cx_Freeze")]
    CxFreeze,
    #[serde(rename = "PyInstaller")]
    PyInstaller,
}

impl PackerKind {
    /// Every supported kind, in the order they are listed by `--help`.
    pub fn all() -> &'static [PackerKind] {
        &[
            PackerKind::Py2exe,
            PackerKind::Py2app,
            PackerKind::CxFreeze,
            PackerKind::PyInstaller,
        ]
    }

    /// Canonical spelling, as the packaging tool itself spells it.
    pub fn as_str(self) -> &'static str {
        match self {
            PackerKind::Py2exe => "py2exe",
            PackerKind::Py2app => "py2app",
            PackerKind::CxFreeze => "cx_Freeze",
            PackerKind::PyInstaller => "PyInstaller",
        }
    }

    /// Kinds whose name ends in `freeze` build with the freeze layout; all
    /// others share the py2exe layout.
    pub fn layout(self) -> BundleLayout {
        if self.as_str().to_ascii_lowercase().ends_with("freeze") {
            BundleLayout::Freeze
        } else {
            BundleLayout::Py2exe
        }
    }
}

impl fmt::Display for PackerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PackerKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!("unknown packager type '{s}'; expected: py2exe, py2app, cx_Freeze, PyInstaller")
            })
    }
}

// ---------------------------------------------------------------------------
// Bundle layout
// ---------------------------------------------------------------------------

/// Where a packager puts its output and what it calls its library archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleLayout {
    /// `setup.py py2exe` → `dist/library.zip`
    Py2exe,
    /// `setup.py build` → `build/exe.<platform>-<X.Y>/python<XY>.zip`
    Freeze,
}

impl BundleLayout {
    /// Argument passed to the setup script.
    pub fn pack_command(self) -> &'static str {
        match self {
            BundleLayout::Py2exe => "py2exe",
            BundleLayout::Freeze => "build",
        }
    }

    /// Whether [`BundleTarget`] resolution needs a probed interpreter.
    pub fn needs_interpreter(self) -> bool {
        matches!(self, BundleLayout::Freeze)
    }
}

/// Concrete output location of one packager run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleTarget {
    pub layout: BundleLayout,
    /// Output directory, relative to the setup script's directory.
    pub output_dir: PathBuf,
    /// File name of the library archive inside `output_dir`.
    pub library_name: String,
}

impl BundleTarget {
    pub fn py2exe() -> Self {
        Self {
            layout: BundleLayout::Py2exe,
            output_dir: PathBuf::from("dist"),
            library_name: "library.zip".to_string(),
        }
    }

    pub fn freeze(interpreter: &InterpreterInfo) -> Self {
        Self {
            layout: BundleLayout::Freeze,
            output_dir: PathBuf::from("build").join(format!(
                "exe.{}-{}",
                interpreter.platform,
                interpreter.dotted_version()
            )),
            library_name: format!("python{}.zip", interpreter.compact_version()),
        }
    }

    pub fn pack_command(&self) -> &'static str {
        self.layout.pack_command()
    }
}

// ---------------------------------------------------------------------------
// Interpreter
// ---------------------------------------------------------------------------

/// Platform tag and version of the Python interpreter that runs the packager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpreterInfo {
    /// `sysconfig.get_platform()`, e.g. `linux-x86_64` or `win-amd64`.
    pub platform: String,
    pub major: u32,
    pub minor: u32,
}

impl InterpreterInfo {
    /// `3.11`
    pub fn dotted_version(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }

    /// `311`
    pub fn compact_version(&self) -> String {
        format!("{}{}", self.major, self.minor)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
