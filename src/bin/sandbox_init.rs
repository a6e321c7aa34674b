//! Sandbox runner
//!
//! Started by the engine inside fresh namespaces as
//! `sandbox-init [--output <path>] <system_command> <artifact> <file_name_prefix>`.
//! `--output` names the file a compile step writes (`{binary}`).
//! Exits with the artifact's exit code, or `SETUP_FAILED_EXIT` when the
//! sandbox could not be sealed.

use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use tracing::error;

use code_runner::adapter::is_valid_prefix;
use code_runner::diagnostics;
use code_runner::sandbox::init::{self, SETUP_FAILED_EXIT};
use code_runner::sandbox::SandboxConfig;

#[derive(Debug, Parser)]
#[command(name = "sandbox-init", about = "Seal a sandbox and run an artifact in it")]
struct Args {
    /// File written by a compile step, substituted for `{binary}`
    #[arg(long)]
    output: Option<PathBuf>,
    /// Launcher words placed before the artifact (may be empty)
    system_command: String,
    /// Artifact path on the host
    artifact: PathBuf,
    /// Names the diagnostic log of this execution
    file_name_prefix: String,
}

fn main() {
    let args = Args::parse();
    let config = SandboxConfig::from_env();

    if let Some(file) = open_log(&config, &args.file_name_prefix) {
        tracing_subscriber::fmt()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(false)
            .init();
    }

    match init::run(
        &config,
        &args.system_command,
        &args.artifact,
        args.output.as_deref(),
    ) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("Sandbox runner failed: {:?}", e);
            std::process::exit(SETUP_FAILED_EXIT);
        }
    }
}

/// Diagnostic log for this execution; `None` leaves the runner silent.
fn open_log(config: &SandboxConfig, prefix: &str) -> Option<File> {
    if !is_valid_prefix(prefix) {
        return None;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(diagnostics::log_path(&config.log_dir, prefix))
        .ok()
}
