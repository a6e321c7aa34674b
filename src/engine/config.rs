//! Engine configuration
//!
//! Fixed parameters of an execution (wall-clock budget, diagnostic log
//! location, sandbox root, sandbox runner executable), passed to the engine at
//! construction. The log dir and root are exported to the sandbox runner so
//! both sides agree on them.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

use crate::sandbox::config::{DEFAULT_LOG_DIR, DEFAULT_ROOT, LOG_DIR_ENV, ROOT_ENV};

/// Default wall-clock budget per execution
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
/// Default sandbox runner executable, looked up on PATH
pub const DEFAULT_RUNNER: &str = "sandbox-init";

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Wall-clock budget from spawn to kill
    pub timeout: Duration,
    /// Directory holding `<prefix>.log` diagnostic files
    pub log_dir: PathBuf,
    /// Directory the sandbox chroots into; artifacts must live below it
    pub root: PathBuf,
    /// Sandbox runner executable
    pub runner: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            root: PathBuf::from(DEFAULT_ROOT),
            runner: PathBuf::from(DEFAULT_RUNNER),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let timeout_secs = match std::env::var("EXEC_TIMEOUT_SECS") {
            Ok(value) => value
                .parse::<u64>()
                .with_context(|| format!("Invalid EXEC_TIMEOUT_SECS: {}", value))?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            anyhow::bail!("EXEC_TIMEOUT_SECS must be greater than zero");
        }

        let log_dir = std::env::var(LOG_DIR_ENV).unwrap_or_else(|_| DEFAULT_LOG_DIR.into());
        let root = std::env::var(ROOT_ENV).unwrap_or_else(|_| DEFAULT_ROOT.into());
        let runner = std::env::var("SANDBOX_RUNNER").unwrap_or_else(|_| DEFAULT_RUNNER.into());

        Ok(Self {
            timeout: Duration::from_secs(timeout_secs),
            log_dir: log_dir.into(),
            root: root.into(),
            runner: runner.into(),
        })
    }
}
