//! Running the packager's setup script and probing its interpreter.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

use packarmor_core::InterpreterInfo;

use crate::error::PackError;

const PROBE_SCRIPT: &str = "\
import json, sys, sysconfig
print(json.dumps({'platform': sysconfig.get_platform(),
                  'major': sys.version_info[0],
                  'minor': sys.version_info[1]}))
";

/// The interpreter-side half of packaging.
pub trait Packager {
    /// Platform tag and version of the interpreter that will run setup scripts.
    fn probe(&self) -> Result<InterpreterInfo, PackError>;

    /// `<interpreter> <script> <command>` in `setup_dir`, waiting for it.
    fn run_setup(&self, setup_dir: &Path, script: &OsStr, command: &str)
        -> Result<(), PackError>;
}

/// A Python interpreter on `PATH` or at an explicit location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PythonPackager {
    python: String,
}

impl PythonPackager {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }

    fn spawn_err(&self, source: std::io::Error) -> PackError {
        PackError::Spawn {
            program: self.python.clone(),
            source,
        }
    }
}

impl Packager for PythonPackager {
    fn probe(&self) -> Result<InterpreterInfo, PackError> {
        let output = Command::new(&self.python)
            .args(["-c", PROBE_SCRIPT])
            .output()
            .map_err(|e| self.spawn_err(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(PackError::InterpreterProbe(format!(
                "{} exited with {}: {}",
                self.python, output.status, stderr
            )));
        }

        parse_probe(&output.stdout)
    }

    fn run_setup(
        &self,
        setup_dir: &Path,
        script: &OsStr,
        command: &str,
    ) -> Result<(), PackError> {
        tracing::info!(
            dir = %setup_dir.display(),
            "{} {} {}",
            self.python,
            script.to_string_lossy(),
            command
        );
        let status = Command::new(&self.python)
            .arg(script)
            .arg(command)
            .current_dir(setup_dir)
            .status()
            .map_err(|e| self.spawn_err(e))?;

        if !status.success() {
            return Err(PackError::Packager {
                command: format!("{} {} {}", self.python, script.to_string_lossy(), command),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

/// Parse the probe script's single JSON line.
pub fn parse_probe(stdout: &[u8]) -> Result<InterpreterInfo, PackError> {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| PackError::InterpreterProbe("probe printed nothing".to_string()))?;
    Ok(serde_json::from_str(line.trim())?)
}
