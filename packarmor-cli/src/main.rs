//! packarmor: pack obfuscated Python scripts with a third-party packager.
//!
//! # Usage
//!
//! ```text
//! packarmor [--type py2exe|py2app|cx_Freeze|PyInstaller] [--path <DIR>] [--setup <FILE>] <SCRIPT>
//! packarmor --dry-run [--json] <SCRIPT>
//! packarmor -v | --version
//! ```

mod commands;

use anyhow::Result;
use clap::{ArgAction, Parser};

use commands::pack::PackArgs;

const AFTER_HELP: &str = "\
Once the packager's setup script works, this tool obfuscates every Python
source script and packages them, replacing the plain scripts in the
packager's output with obfuscated ones:

    packarmor --type py2exe /path/to/src/entry.py";

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "packarmor",
    version,
    about = "Pack obfuscated scripts",
    after_help = AFTER_HELP,
    disable_version_flag = true,
)]
struct Cli {
    /// Print version.
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: (),

    #[command(flatten)]
    pack: PackArgs,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    cli.pack.run()
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .try_init();
}
