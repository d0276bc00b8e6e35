//! Source → compiled-unit compilation.
//!
//! A compiled unit sits next to its source with `c` appended to the file
//! name: `pkg/mod.py` → `pkg/mod.pyc`. That is the name py2exe and cx_Freeze
//! store in their library archives.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

/// Failure of a single compile invocation.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("{0}")]
    Other(String),
}

/// Turns text sources into compiled units.
pub trait Compiler {
    /// Whether `source` is something this compiler understands.
    fn accepts(&self, _source: &Path) -> bool {
        true
    }

    /// Compile `source` into `target`, overwriting it.
    fn compile(&self, source: &Path, target: &Path) -> Result<(), CompileError>;

    /// Compile every `(source, target)` pair. Implementations backed by a
    /// subprocess override this to start the process once.
    fn compile_all(&self, jobs: &[(PathBuf, PathBuf)]) -> Result<(), CompileError> {
        for (source, target) in jobs {
            self.compile(source, target)?;
        }
        Ok(())
    }
}

/// `pkg/mod.py` → `pkg/mod.pyc`
pub fn compiled_path(source: &Path) -> PathBuf {
    let mut name = OsString::from(source.as_os_str());
    name.push("c");
    PathBuf::from(name)
}

// Pairs arrive as argv[1:] = src0 dst0 src1 dst1 ...
const PY_COMPILE_SCRIPT: &str = "\
import py_compile, sys
args = sys.argv[1:]
for src, dst in zip(args[0::2], args[1::2]):
    py_compile.compile(src, cfile=dst, doraise=True)
";

/// Compiles `.py` files with the interpreter's own `py_compile`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PyCompiler {
    python: String,
}

impl PyCompiler {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }

    pub fn python(&self) -> &str {
        &self.python
    }
}

impl Default for PyCompiler {
    fn default() -> Self {
        Self::new("python")
    }
}

impl Compiler for PyCompiler {
    fn accepts(&self, source: &Path) -> bool {
        source.extension().is_some_and(|ext| ext == "py")
    }

    fn compile(&self, source: &Path, target: &Path) -> Result<(), CompileError> {
        self.compile_all(&[(source.to_path_buf(), target.to_path_buf())])
    }

    fn compile_all(&self, jobs: &[(PathBuf, PathBuf)]) -> Result<(), CompileError> {
        if jobs.is_empty() {
            return Ok(());
        }

        let mut command = Command::new(&self.python);
        command.arg("-c").arg(PY_COMPILE_SCRIPT);
        for (source, target) in jobs {
            command.arg(source).arg(target);
        }

        let output = command.output().map_err(|e| CompileError::Spawn {
            program: self.python.clone(),
            source: e,
        })?;

        if !output.status.success() {
            return Err(CompileError::Failed {
                program: self.python.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        tracing::debug!(count = jobs.len(), python = %self.python, "py_compile finished");
        Ok(())
    }
}
