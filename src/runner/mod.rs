//! Runner module - process launch abstraction
//!
//! This module provides a unified way of launching a prepared artifact:
//! - `SandboxedRunner`: untrusted code, launched through the sandbox runner
//!   inside fresh namespaces
//! - `TrustedRunner`: direct execution without isolation (local development
//!   and tests)
//!
//! Runners only build the command. `execute` owns spawning, the wall-clock
//! deadline and output capture, so every runner gets identical timeout
//! semantics.
//!
//! The runner module does NOT:
//! - Classify outcomes into execution errors
//! - Create or delete artifacts

pub mod sandboxed;
pub mod trusted;

use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Time allowed to collect output already buffered in the pipes after a kill
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Bytes kept per stream; anything past this is read and dropped
pub const OUTPUT_LIMIT: usize = 16 * 1024 * 1024;

/// Placeholder for the artifact path in a launcher command
pub const SOURCE_PLACEHOLDER: &str = "{source}";
/// Placeholder for the output path in a launcher command
pub const BINARY_PLACEHOLDER: &str = "{binary}";

/// What to run: the sandbox runner's positional arguments
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Interpreter or launcher words, e.g. `python3` or `java -cp /runner_files`
    pub system_command: String,
    /// Artifact produced by the adapter
    pub artifact: PathBuf,
    /// Correlates the diagnostic log with this execution
    pub file_name_prefix: String,
    /// File the command writes (compile steps); substituted for `{binary}`
    pub output: Option<PathBuf>,
}

impl Invocation {
    /// Run `artifact` with `system_command` placed before it
    pub fn new(
        system_command: impl Into<String>,
        artifact: impl Into<PathBuf>,
        file_name_prefix: impl Into<String>,
    ) -> Self {
        Self {
            system_command: system_command.into(),
            artifact: artifact.into(),
            file_name_prefix: file_name_prefix.into(),
            output: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Arguments for the sandbox runner: `[--output <path>] systemCommand artifact prefix`
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(5);
        if let Some(output) = &self.output {
            args.push("--output".to_string());
            args.push(output.to_string_lossy().into_owned());
        }
        args.push(self.system_command.clone());
        args.push(self.artifact.to_string_lossy().into_owned());
        args.push(self.file_name_prefix.clone());
        args
    }

    /// Full argv of the launched program, with host paths
    pub fn argv(&self) -> Vec<String> {
        command_words(&self.system_command, &self.artifact, self.output.as_deref())
    }
}

/// Expand a launcher command into argv.
///
/// `{source}` and `{binary}` inside words are replaced by `artifact` and
/// `output`. When no word names `{source}`, the artifact is appended, so
/// `python3 -u` runs `python3 -u <artifact>` and an empty command runs the
/// artifact itself.
pub fn command_words(system_command: &str, artifact: &Path, output: Option<&Path>) -> Vec<String> {
    let artifact = artifact.to_string_lossy();
    let output = output.map(|p| p.to_string_lossy());

    let mut names_source = false;
    let mut words: Vec<String> = system_command
        .split_whitespace()
        .map(|word| {
            names_source |= word.contains(SOURCE_PLACEHOLDER);
            let word = word.replace(SOURCE_PLACEHOLDER, &artifact);
            match &output {
                Some(output) => word.replace(BINARY_PLACEHOLDER, output),
                None => word,
            }
        })
        .collect();

    if !names_source {
        words.push(artifact.into_owned());
    }
    words
}

/// Execution status (raw, no classification)
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    /// Process ended on its own
    Exited(ExitStatus),
    /// Deadline passed; the process was killed
    TimedOut,
    /// Spawning or waiting failed
    Failed(String),
}

/// Outcome of running one invocation
#[derive(Debug)]
pub struct RunOutcome {
    pub status: RunStatus,
    /// Stdout content
    pub stdout: String,
    /// Stderr content
    pub stderr: String,
    /// Wall-clock time from spawn to exit or kill
    pub elapsed: Duration,
}

impl RunOutcome {
    fn failed(message: String) -> Self {
        Self {
            status: RunStatus::Failed(message),
            stdout: String::new(),
            stderr: String::new(),
            elapsed: Duration::ZERO,
        }
    }
}

/// Runner trait for building launch commands
pub trait Runner: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Build the command that runs `invocation`. Stdio is configured by the caller.
    fn command(&self, invocation: &Invocation) -> Result<Command>;
}

/// Run `invocation` through `runner`, bounded by `timeout`.
pub async fn execute(runner: &dyn Runner, invocation: &Invocation, timeout: Duration) -> RunOutcome {
    let deadline = Instant::now() + timeout;

    let mut cmd = match runner.command(invocation) {
        Ok(cmd) => cmd,
        Err(e) => return RunOutcome::failed(format!("{:#}", e)),
    };
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(
        "Spawning {} runner for {:?}",
        runner.name(),
        invocation.to_args()
    );

    let start = Instant::now();
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            return RunOutcome::failed(format!("failed to spawn {} runner: {}", runner.name(), e))
        }
    };

    let (Some(mut out_pipe), Some(mut err_pipe)) = (child.stdout.take(), child.stderr.take())
    else {
        return RunOutcome::failed("child stdio was not captured".to_string());
    };

    let mut stdout = Capture::new(OUTPUT_LIMIT);
    let mut stderr = Capture::new(OUTPUT_LIMIT);

    let waited = tokio::time::timeout_at(deadline, async {
        let (out_res, err_res, status) = tokio::join!(
            drain(&mut out_pipe, &mut stdout),
            drain(&mut err_pipe, &mut stderr),
            child.wait()
        );
        if let Err(e) = out_res.and(err_res) {
            warn!("Failed to read process output: {}", e);
        }
        status
    })
    .await;

    let status = match waited {
        Ok(Ok(status)) => RunStatus::Exited(status),
        Ok(Err(e)) => RunStatus::Failed(format!("failed to wait for process: {}", e)),
        Err(_) => {
            if let Err(e) = child.kill().await {
                warn!("Failed to kill timed out process: {}", e);
            }
            // Keep whatever was already written before the kill.
            let _ = tokio::time::timeout(DRAIN_GRACE, async {
                tokio::join!(
                    drain(&mut out_pipe, &mut stdout),
                    drain(&mut err_pipe, &mut stderr)
                )
            })
            .await;
            RunStatus::TimedOut
        }
    };

    for (name, capture) in [("stdout", &stdout), ("stderr", &stderr)] {
        if capture.dropped > 0 {
            warn!(
                "Truncated {} of {}: dropped {} bytes past the {} byte limit",
                name, invocation.file_name_prefix, capture.dropped, capture.limit
            );
        }
    }

    RunOutcome {
        status,
        stdout: stdout.into_string(),
        stderr: stderr.into_string(),
        elapsed: start.elapsed(),
    }
}

/// Bounded output buffer
#[derive(Debug)]
struct Capture {
    buf: Vec<u8>,
    limit: usize,
    /// Bytes read past `limit` and discarded
    dropped: usize,
}

impl Capture {
    fn new(limit: usize) -> Self {
        Self {
            buf: Vec::new(),
            limit,
            dropped: 0,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        let room = self.limit.saturating_sub(self.buf.len());
        let kept = chunk.len().min(room);
        self.buf.extend_from_slice(&chunk[..kept]);
        self.dropped += chunk.len() - kept;
    }

    fn into_string(self) -> String {
        String::from_utf8_lossy(&self.buf).into_owned()
    }
}

/// Move everything `reader` yields into `sink`.
///
/// Reads in chunks so that, if this future is dropped at the deadline, every
/// byte read so far is already in `sink`. Keeps reading past the limit so the
/// writer never blocks on a full pipe.
async fn drain<R: AsyncRead + Unpin>(reader: &mut R, sink: &mut Capture) -> io::Result<()> {
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        sink.push(&chunk[..n]);
    }
}

// Re-exports
pub use sandboxed::SandboxedRunner;
pub use trusted::TrustedRunner;
