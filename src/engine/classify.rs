//! Outcome classification
//!
//! Order matters: a killed process may have left partial stdout and
//! half-written stderr, so the deadline is checked before anything derived
//! from stderr.

use std::time::Duration;

use tracing::warn;

use crate::core::stamp;
use crate::core::{ExecError, ExecResult};
use crate::runner::{RunOutcome, RunStatus};

/// Turn a raw run outcome into the caller-facing result
pub fn classify(outcome: RunOutcome, budget: Duration) -> ExecResult {
    let RunOutcome {
        status,
        stdout,
        stderr,
        ..
    } = outcome;

    match status {
        RunStatus::TimedOut => {
            let err = ExecError::TimeLimitExceeded {
                budget,
                output: stdout,
            };
            warn!("{}", err);
            Err(err)
        }
        RunStatus::Failed(message) => {
            warn!("Process failed: {}", message);
            Err(ExecError::Runtime {
                message,
                output: String::new(),
            })
        }
        RunStatus::Exited(status) if !status.success() => {
            let message = status.to_string();
            warn!("Process failed: {}", message);
            Err(ExecError::Runtime {
                message,
                output: String::new(),
            })
        }
        RunStatus::Exited(_) if !stderr.is_empty() => {
            let message = stamp::strip(&stderr).to_string();
            warn!("Process wrote to stderr: {}", message.trim_end());
            Err(ExecError::Runtime {
                message,
                output: stdout,
            })
        }
        RunStatus::Exited(_) => Ok(stdout),
    }
}
