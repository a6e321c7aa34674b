//! Sandboxed runner implementation
//!
//! Launches the sandbox runner executable for untrusted code. The child
//! unshares its namespaces between fork and exec, so the runner starts as
//! root of a fresh user namespace with no privileges on the host.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use super::{Invocation, Runner};
use crate::engine::EngineConfig;
use crate::sandbox::config::{LOG_DIR_ENV, ROOT_ENV};
use crate::sandbox::Isolation;

/// Runner that executes code through the namespace sandbox
pub struct SandboxedRunner {
    /// Sandbox runner executable (name on PATH or absolute path)
    program: PathBuf,
    /// Diagnostic log directory passed down to the sandbox runner
    log_dir: PathBuf,
    /// Extra environment for the sandbox runner (key, value)
    env: Vec<(String, String)>,
    isolation: Isolation,
}

impl SandboxedRunner {
    /// Create a runner mapping namespace root onto the current user
    pub fn new(program: impl AsRef<Path>, log_dir: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            log_dir: log_dir.as_ref().to_path_buf(),
            env: Vec::new(),
            isolation: Isolation::for_current_user(),
        }
    }

    /// Runner for `config.runner`, sharing the engine's log dir and root
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.runner, &config.log_dir)
            .with_env(ROOT_ENV, config.root.to_string_lossy())
    }

    /// Pass an extra variable to the sandbox runner, e.g. `SANDBOX_ROOT`
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

impl Runner for SandboxedRunner {
    fn name(&self) -> &'static str {
        "sandboxed"
    }

    fn command(&self, invocation: &Invocation) -> Result<Command> {
        let mut cmd = Command::new(&self.program);
        cmd.args(invocation.to_args())
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .env(LOG_DIR_ENV, &self.log_dir);

        let isolation = self.isolation.clone();
        // SAFETY: `Isolation::enter` only issues syscalls and writes
        // pre-rendered buffers; it does not allocate or take locks.
        unsafe {
            cmd.pre_exec(move || isolation.enter());
        }

        Ok(cmd)
    }
}
