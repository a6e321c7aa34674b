//! Trusted runner implementation
//!
//! Executes the artifact directly, without namespaces or chroot. Only for
//! code you already trust: local development and the engine's own tests.

use anyhow::Result;
use tokio::process::Command;

use super::{Invocation, Runner};

/// Runner that executes trusted code directly without sandbox
#[derive(Debug, Default, Clone, Copy)]
pub struct TrustedRunner;

impl TrustedRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Runner for TrustedRunner {
    fn name(&self) -> &'static str {
        "trusted"
    }

    fn command(&self, invocation: &Invocation) -> Result<Command> {
        let argv = invocation.argv();
        let Some((program, args)) = argv.split_first() else {
            anyhow::bail!("empty command for {:?}", invocation.artifact);
        };

        let mut cmd = Command::new(program);
        cmd.args(args);
        Ok(cmd)
    }
}
