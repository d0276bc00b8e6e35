//! Shared pack pipeline entrypoint.
//!
//! ## `run`: 9-step sequence
//!
//! 1. Enter the armor home (scoped; restored on every exit path).
//! 2. Obfuscator `init` + `config` for the scratch project.
//! 3. Obfuscator `build --no-runtime` in the scratch project.
//! 4. Swap the obfuscated entry script and runtime module into the source tree.
//! 5. Run the packager's setup script.
//! 6. Restore the plain entry script, even if step 5 failed.
//! 7. Reconcile the packager's library archive with the obfuscated scripts.
//! 8. Obfuscator `build --only-runtime`; copy runtime files to the output.
//! 9. Remove the scratch project.

use std::fs;
use std::path::{Path, PathBuf};

use packarmor_archive::{reconcile, Compiler, ReconcileReport};
use packarmor_core::{PackPlan, PackRequest};

use crate::error::{io_err, PackError};
use crate::obfuscator::{ArmorCommand, Obfuscator, RUNTIME_MODULE};
use crate::packager::Packager;
use crate::swap::EntrySwap;
use crate::workdir::WorkdirGuard;

/// Scratch project, relative to the armor home.
pub const SCRATCH_PROJECT: &str = "projects/build-for-packer";

/// The external collaborators of a pack run.
pub struct Toolchain<'a> {
    pub obfuscator: &'a dyn Obfuscator,
    pub packager: &'a dyn Packager,
    pub compiler: &'a dyn Compiler,
}

/// Outcome of a successful pack run.
#[derive(Debug, Clone)]
pub struct PackReport {
    pub output_dir: PathBuf,
    pub library: PathBuf,
    pub library_report: ReconcileReport,
    /// Runtime files copied into `output_dir`, by file name.
    pub runtime_files: Vec<PathBuf>,
}

/// Resolve `request`, probing the interpreter only when the layout needs it.
pub fn plan(request: &PackRequest, packager: &dyn Packager) -> Result<PackPlan, PackError> {
    let interpreter = if request.kind.layout().needs_interpreter() {
        Some(packager.probe()?)
    } else {
        None
    };
    Ok(PackPlan::resolve(request, interpreter.as_ref())?)
}

/// Obfuscate, package and patch the library archive for `plan`.
///
/// The working directory is `armor_home` for the duration of the call.
pub fn run(
    plan: &PackPlan,
    armor_home: &Path,
    tools: &Toolchain<'_>,
) -> Result<PackReport, PackError> {
    let entry = plan.src.join(&plan.entry);
    if !entry.is_file() {
        return Err(PackError::MissingEntry(entry));
    }
    let armor_home = &std::path::absolute(armor_home).map_err(|e| io_err(armor_home, e))?;

    // Step 1
    let _cwd = WorkdirGuard::enter(armor_home)?;

    let project_rel = Path::new(SCRATCH_PROJECT);
    let project = armor_home.join(project_rel);
    if project.exists() {
        tracing::warn!(path = %project.display(), "removing leftover scratch project");
        fs::remove_dir_all(&project).map_err(|e| io_err(&project, e))?;
    }

    // Step 2
    tracing::info!(src = %plan.src.display(), entry = %plan.entry.display(), "creating scratch project");
    tools.obfuscator.call(
        &ArmorCommand::init(&plan.src, &plan.entry, project_rel),
        armor_home,
    )?;
    tools.obfuscator.call(
        &ArmorCommand::config(&plan.entry, plan.setup_script(), project_rel),
        armor_home,
    )?;

    // Step 3
    tracing::info!("obfuscating scripts");
    tools
        .obfuscator
        .call(&ArmorCommand::build_scripts(), &project)?;

    // Steps 4-6
    let swap = EntrySwap::install(armor_home, &plan.src, &plan.entry, &project)?;
    tracing::info!(kind = %plan.kind, "running packager");
    let packed = tools
        .packager
        .run_setup(plan.setup_dir(), plan.setup_script(), plan.pack_command());
    match (swap.restore(), packed) {
        (Ok(()), packed) => packed?,
        (Err(restore), Ok(())) => return Err(restore),
        (Err(restore), Err(packager)) => {
            tracing::warn!(error = %packager, "packager failed before entry restore");
            return Err(PackError::RestoreAfterPackager {
                packager: Box::new(packager),
                restore: Box::new(restore),
            });
        }
    }

    // Step 7
    let library = plan.library_path();
    tracing::info!(library = %library.display(), "patching library archive");
    let library_report = reconcile(&library, &project.join("dist"), tools.compiler)?;

    // Step 8
    tracing::info!("building runtime files");
    tools
        .obfuscator
        .call(&ArmorCommand::build_runtime(), &project)?;
    let output_dir = plan.output_dir();
    let runtime_files = copy_runtime_files(&project.join("runtimes"), &output_dir)?;

    // Step 9
    fs::remove_dir_all(&project).map_err(|e| io_err(&project, e))?;
    tracing::info!(output = %output_dir.display(), "pack finished");

    Ok(PackReport {
        output_dir,
        library,
        library_report,
        runtime_files,
    })
}

/// Copy every runtime file except the runtime module into `output_dir`.
fn copy_runtime_files(runtimes: &Path, output_dir: &Path) -> Result<Vec<PathBuf>, PackError> {
    let mut entries: Vec<_> = fs::read_dir(runtimes)
        .map_err(|e| io_err(runtimes, e))?
        .filter_map(|e| e.ok())
        .collect();
    entries.sort_by_key(|e| e.file_name());

    let mut copied = Vec::new();
    for entry in entries {
        let name = entry.file_name();
        if name == RUNTIME_MODULE {
            continue;
        }
        let path = entry.path();
        if !path.is_file() {
            tracing::warn!(path = %path.display(), "skipping non-file runtime entry");
            continue;
        }
        let dest = output_dir.join(&name);
        fs::copy(&path, &dest).map_err(|e| io_err(&dest, e))?;
        tracing::debug!(file = %dest.display(), "runtime file copied");
        copied.push(PathBuf::from(name));
    }
    Ok(copied)
}
