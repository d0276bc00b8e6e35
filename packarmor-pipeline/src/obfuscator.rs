//! Obfuscator commands and the pyarmor driver.
//!
//! The argument lists are pyarmor's own CLI contract and must stay exactly
//! as built here.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::Path;
use std::process::Command;

use crate::error::PackError;

/// Name of the runtime module pyarmor expects to import next to obfuscated
/// scripts. It is never obfuscated itself.
pub const RUNTIME_MODULE: &str = "pytransform.py";

/// One obfuscator invocation, as an argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmorCommand {
    args: Vec<OsString>,
}

impl ArmorCommand {
    /// `init --type app --src <src> --entry <entry> <project>`
    pub fn init(src: &Path, entry: &Path, project: &Path) -> Self {
        Self::from_parts([
            OsStr::new("init"),
            OsStr::new("--type"),
            OsStr::new("app"),
            OsStr::new("--src"),
            src.as_os_str(),
            OsStr::new("--entry"),
            entry.as_os_str(),
            project.as_os_str(),
        ])
    }

    /// `config --runtime-path '' --disable-restrict-mode 1 --manifest <filters> <project>`
    pub fn config(entry: &Path, setup_script: &OsStr, project: &Path) -> Self {
        let manifest = manifest_filters(entry, setup_script);
        Self::from_parts([
            OsStr::new("config"),
            OsStr::new("--runtime-path"),
            OsStr::new(""),
            OsStr::new("--disable-restrict-mode"),
            OsStr::new("1"),
            OsStr::new("--manifest"),
            manifest.as_os_str(),
            project.as_os_str(),
        ])
    }

    /// `build --no-runtime --output dist`
    pub fn build_scripts() -> Self {
        Self::from_parts(["build", "--no-runtime", "--output", "dist"].map(OsStr::new))
    }

    /// `build --only-runtime --output runtimes`
    pub fn build_runtime() -> Self {
        Self::from_parts(["build", "--only-runtime", "--output", "runtimes"].map(OsStr::new))
    }

    fn from_parts<'a>(parts: impl IntoIterator<Item = &'a OsStr>) -> Self {
        Self {
            args: parts.into_iter().map(OsStr::to_os_string).collect(),
        }
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// First argument: `init`, `config` or `build`.
    pub fn subcommand(&self) -> &OsStr {
        self.args.first().map(OsString::as_os_str).unwrap_or_default()
    }

    /// Lossy argument strings, for assertions and log lines.
    pub fn to_strings(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for ArmorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arg in &self.args {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(' ') {
                write!(f, "'{arg}'")?;
            } else {
                f.write_str(&arg)?;
            }
        }
        Ok(())
    }
}

/// Manifest template: every `.py` file, minus build output, the entry
/// script, the setup script and the runtime module.
pub fn manifest_filters(entry: &Path, setup_script: &OsStr) -> OsString {
    let mut filters = OsString::from("global-include *.py,prune build, prune dist,exclude ");
    filters.push(entry.as_os_str());
    filters.push(" ");
    filters.push(setup_script);
    filters.push(" ");
    filters.push(RUNTIME_MODULE);
    filters
}

/// Runs obfuscator commands.
pub trait Obfuscator {
    fn call(&self, command: &ArmorCommand, cwd: &Path) -> Result<(), PackError>;
}

/// Drives the `pyarmor` executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PyArmor {
    program: String,
}

impl PyArmor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Obfuscator for PyArmor {
    fn call(&self, command: &ArmorCommand, cwd: &Path) -> Result<(), PackError> {
        tracing::info!("{} {}", self.program, command);
        let status = Command::new(&self.program)
            .args(command.args())
            .current_dir(cwd)
            .status()
            .map_err(|e| PackError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        if !status.success() {
            return Err(PackError::Obfuscator {
                command: format!("{} {}", self.program, command),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}
