//! Sandbox runner process logic
//!
//! The engine execs the sandbox runner with the namespaces already unshared.
//! The runner forks once: the child is PID 1 of the new PID namespace, seals
//! the sandbox and execs the artifact; the parent relays the artifact's stderr
//! (stamped) and exit status back to the engine.
//!
//! PID 1 only starts sealing once the parent has confirmed it is alive after
//! the parent death signal was armed. From then on, killing the runner kills
//! PID 1, and with it every process in the namespace.

use std::ffi::CString;
use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, OwnedFd};
use std::path::Path;

use anyhow::{Context, Result};
use nix::sys::prctl::set_pdeathsig;
use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{dup2, execvp, fork, pipe, ForkResult};
use tracing::{error, info, warn};

use super::bootstrap::{seal, Sealed};
use super::config::SandboxConfig;
use crate::core::stamp;
use crate::runner::command_words;

/// Exit code when the isolation boundary could not be established
pub const SETUP_FAILED_EXIT: i32 = 125;
/// Exit code when the artifact could not be exec'd after sealing
pub const EXEC_FAILED_EXIT: i32 = 127;

/// Build the artifact's argv from in-sandbox paths.
///
/// See [`command_words`]: an empty `system_command` executes the artifact
/// itself, and `{source}` / `{binary}` are filled for compile steps.
pub fn artifact_argv(
    system_command: &str,
    artifact: &Path,
    output: Option<&Path>,
) -> Result<Vec<CString>> {
    let words = command_words(system_command, artifact, output);
    words
        .into_iter()
        .map(|word| CString::new(word).context("command contains a NUL byte"))
        .collect()
}

/// Seal the sandbox in a forked PID 1 and run the artifact there.
///
/// `output` is the file a compile step writes, if any. Returns the exit code
/// the runner should exit with: the artifact's own code, or `128 + signal`
/// when it was killed.
pub fn run(
    config: &SandboxConfig,
    system_command: &str,
    artifact: &Path,
    output: Option<&Path>,
) -> Result<i32> {
    let artifact = config.inside(artifact);
    let output = output.map(|p| config.inside(p));
    let argv = artifact_argv(system_command, &artifact, output.as_deref())?;

    let (stderr_read, stderr_write) = pipe().context("Failed to create stderr pipe")?;
    let (ready_read, ready_write) = pipe().context("Failed to create handshake pipe")?;
    let (go_read, go_write) = pipe().context("Failed to create handshake pipe")?;

    // SAFETY: the runner is single-threaded, so the child may keep using
    // everything it inherited until exec.
    match unsafe { fork() }.context("Failed to fork sandbox init")? {
        ForkResult::Child => {
            drop(stderr_read);
            drop(ready_read);
            drop(go_write);
            child_main(config, &argv, stderr_write, ready_write, go_read)
        }
        ForkResult::Parent { child } => {
            drop(stderr_write);
            drop(ready_write);
            drop(go_read);

            // A child that died before arming shows up in its wait status.
            if let Err(e) = release_child(&mut File::from(ready_read), &mut File::from(go_write)) {
                warn!("Sandbox init did not complete the start handshake: {}", e);
            }

            let mut stderr = Vec::new();
            File::from(stderr_read)
                .read_to_end(&mut stderr)
                .context("Failed to read artifact stderr")?;

            let status = waitpid(child, None).context("Failed to wait for sandbox init")?;

            if !stderr.is_empty() {
                relay_stderr(&stderr);
            }

            let code = match status {
                WaitStatus::Exited(_, code) => code,
                WaitStatus::Signaled(_, signal, _) => 128 + signal as i32,
                other => anyhow::bail!("Unexpected wait status: {:?}", other),
            };
            info!("Artifact finished with exit code {}", code);
            Ok(code)
        }
    }
}

fn child_main(
    config: &SandboxConfig,
    argv: &[CString],
    stderr: OwnedFd,
    ready: OwnedFd,
    go: OwnedFd,
) -> ! {
    // Tie the namespace's lifetime to the runner: when the engine kills the
    // runner, PID 1 dies and the kernel tears down everything below it.
    if let Err(e) = set_pdeathsig(Signal::SIGKILL) {
        abort_setup(&format!("failed to set parent death signal: {}", e));
    }
    if let Err(e) = await_parent(&mut File::from(ready), &mut File::from(go)) {
        abort_setup(&format!("runner gone before start: {}", e));
    }

    if let Err(e) = dup2(stderr.as_raw_fd(), std::io::stderr().as_raw_fd()) {
        abort_setup(&format!("failed to redirect stderr: {}", e));
    }
    drop(stderr);

    let sealed = match seal(config) {
        Ok(sealed) => sealed,
        Err(e) => abort_setup(&e.to_string()),
    };

    exec_artifact(sealed, argv)
}

/// Child half of the start handshake, run once the death signal is armed.
///
/// Announces itself, then waits for the parent's reply. End of file instead
/// of a reply means the parent died, possibly before the signal was armed.
fn await_parent(ready: &mut impl Write, go: &mut impl Read) -> io::Result<()> {
    ready.write_all(&[1])?;
    let mut reply = [0u8; 1];
    match go.read(&mut reply)? {
        1 => Ok(()),
        _ => Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "no reply from sandbox runner",
        )),
    }
}

/// Parent half of the start handshake
fn release_child(ready: &mut impl Read, go: &mut impl Write) -> io::Result<()> {
    let mut announce = [0u8; 1];
    ready.read_exact(&mut announce)?;
    go.write_all(&[1])
}

/// Replace PID 1 with the artifact. Requires a [`Sealed`] sandbox.
fn exec_artifact(_sealed: Sealed, argv: &[CString]) -> ! {
    info!("Executing {:?}", argv);
    let Some(program) = argv.first() else {
        abort_setup("empty command");
    };
    let err = match execvp(program, argv) {
        Ok(never) => match never {},
        Err(e) => e,
    };
    error!("Failed to exec {:?}: {}", program, err);
    std::process::exit(EXEC_FAILED_EXIT)
}

fn abort_setup(reason: &str) -> ! {
    error!("Sandbox setup failed, refusing to run artifact: {}", reason);
    std::process::exit(SETUP_FAILED_EXIT)
}

fn relay_stderr(stderr: &[u8]) {
    let text = String::from_utf8_lossy(stderr);
    let mut out = std::io::stderr().lock();
    let _ = out.write_all(stamp::stamp(&text).as_bytes());
    let _ = out.flush();
}
