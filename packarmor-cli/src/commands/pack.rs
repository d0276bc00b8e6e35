//! `packarmor <SCRIPT>`: obfuscate, package and patch the library archive.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use packarmor_archive::PyCompiler;
use packarmor_core::{config, Config, PackPlan, PackRequest, PackerKind, Settings};
use packarmor_pipeline::{
    pipeline::{self, PackReport, Toolchain},
    PyArmor, PythonPackager,
};

/// Arguments for a pack run.
#[derive(Args, Debug)]
pub struct PackArgs {
    /// Entry script.
    #[arg(value_name = "SCRIPT")]
    pub entry: PathBuf,

    /// Packager: py2exe | py2app | cx_Freeze | PyInstaller.
    #[arg(short = 't', long = "type", value_name = "TYPE", default_value = "py2exe")]
    pub kind: PackerKind,

    /// Source path of Python scripts (default: the entry script's directory).
    #[arg(short = 'p', long)]
    pub path: Option<PathBuf>,

    /// Setup script (default: setup.py in the source path).
    #[arg(short = 's', long)]
    pub setup: Option<PathBuf>,

    /// Python interpreter running the setup script and py_compile.
    #[arg(long, value_name = "EXE")]
    pub python: Option<String>,

    /// Obfuscator executable.
    #[arg(long, value_name = "EXE")]
    pub obfuscator: Option<String>,

    /// Directory holding pytransform.py; the scratch project is created here.
    #[arg(long, value_name = "DIR")]
    pub armor_home: Option<PathBuf>,

    /// Print the resolved plan without running anything.
    #[arg(long)]
    pub dry_run: bool,

    /// With --dry-run, emit the plan as JSON.
    #[arg(long, requires = "dry_run")]
    pub json: bool,
}

impl PackArgs {
    pub fn run(self) -> Result<()> {
        let flags = Config {
            python: self.python.clone(),
            obfuscator: self.obfuscator.clone(),
            armor_home: self.armor_home.clone(),
        };
        let settings = config::resolve(flags).context("failed to load packarmor configuration")?;

        let request = PackRequest {
            entry: self.entry.clone(),
            kind: self.kind,
            path: self.path.clone(),
            setup: self.setup.clone(),
        };
        let packager = PythonPackager::new(settings.python.clone());
        let plan = pipeline::plan(&request, &packager)
            .with_context(|| format!("cannot plan packing of '{}'", self.entry.display()))?;

        if self.dry_run {
            let view = PlanView::new(&plan, &settings);
            if self.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&view).context("failed to serialize plan JSON")?
                );
            } else {
                print_plan(view);
            }
            return Ok(());
        }

        let obfuscator = PyArmor::new(settings.obfuscator.clone());
        let compiler = PyCompiler::new(settings.python.clone());
        let tools = Toolchain {
            obfuscator: &obfuscator,
            packager: &packager,
            compiler: &compiler,
        };

        let report = pipeline::run(&plan, &settings.armor_home, &tools)
            .with_context(|| format!("packing with {} failed", plan.kind))?;
        print_report(&plan, &report);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct PlanView {
    kind: String,
    src: String,
    entry: String,
    setup: String,
    pack_command: String,
    output_dir: String,
    library: String,
    python: String,
    obfuscator: String,
    armor_home: String,
}

impl PlanView {
    fn new(plan: &PackPlan, settings: &Settings) -> Self {
        Self {
            kind: plan.kind.to_string(),
            src: plan.src.display().to_string(),
            entry: plan.entry.display().to_string(),
            setup: plan.setup.display().to_string(),
            pack_command: plan.pack_command().to_string(),
            output_dir: plan.output_dir().display().to_string(),
            library: plan.library_path().display().to_string(),
            python: settings.python.clone(),
            obfuscator: settings.obfuscator.clone(),
            armor_home: settings.armor_home.display().to_string(),
        }
    }
}

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "setting")]
    key: &'static str,
    #[tabled(rename = "value")]
    value: String,
}

fn print_plan(view: PlanView) {
    println!("{} packarmor v{}", "[dry-run]".yellow().bold(), env!("CARGO_PKG_VERSION"));
    let rows = vec![
        PlanRow { key: "packager", value: view.kind },
        PlanRow { key: "source", value: view.src },
        PlanRow { key: "entry", value: view.entry },
        PlanRow { key: "setup script", value: view.setup },
        PlanRow { key: "pack command", value: view.pack_command },
        PlanRow { key: "output", value: view.output_dir },
        PlanRow { key: "library", value: view.library },
        PlanRow { key: "python", value: view.python },
        PlanRow { key: "obfuscator", value: view.obfuscator },
        PlanRow { key: "armor home", value: view.armor_home },
    ];
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn print_report(plan: &PackPlan, report: &PackReport) {
    println!(
        "{} packed '{}' with {} → {}",
        "✓".green().bold(),
        plan.entry.display(),
        plan.kind,
        report.output_dir.display()
    );
    println!(
        "  library {} ({} members, {} compiled, {} restored)",
        report.library.display(),
        report.library_report.members.len(),
        report.library_report.compiled.len(),
        report.library_report.extracted.len()
    );
    for file in &report.runtime_files {
        println!("  +  {}", file.display());
    }
}
