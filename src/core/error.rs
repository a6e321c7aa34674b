//! Classified execution failures
//!
//! Every variant is terminal for the request that produced it. Nothing in the
//! core retries; that is left to whoever called `Executable::run`.

use std::time::Duration;
use thiserror::Error;

/// Outcome of a single execution: captured stdout, or exactly one classified error.
pub type ExecResult = std::result::Result<String, ExecError>;

#[derive(Debug, Error)]
pub enum ExecError {
    /// No adapter is registered for the requested language
    #[error("unsupported language: {language}")]
    UnsupportedLanguage { language: String },

    /// The adapter could not turn the source into a runnable artifact
    #[error("compilation error: {message}")]
    Compilation { message: String },

    /// The sandbox ran past its wall-clock budget and was killed.
    /// `output` holds whatever stdout was flushed before the kill.
    #[error("time limit exceeded: program ran longer than {}s", budget.as_secs())]
    TimeLimitExceeded { budget: Duration, output: String },

    /// Abnormal exit, spawn failure, or output on stderr
    #[error("runtime error: {message}")]
    Runtime { message: String, output: String },
}

impl ExecError {
    /// Stdout captured alongside the error (empty for pre-run failures)
    pub fn output(&self) -> &str {
        match self {
            ExecError::TimeLimitExceeded { output, .. } | ExecError::Runtime { output, .. } => {
                output
            }
            _ => "",
        }
    }

    /// Human-readable message without the variant prefix
    pub fn message(&self) -> String {
        match self {
            ExecError::UnsupportedLanguage { language } => language.clone(),
            ExecError::Compilation { message } | ExecError::Runtime { message, .. } => {
                message.clone()
            }
            ExecError::TimeLimitExceeded { budget, .. } => {
                format!("exceeded {}s", budget.as_secs())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_limit_display_uses_budget() {
        let err = ExecError::TimeLimitExceeded {
            budget: Duration::from_secs(15),
            output: "partial".into(),
        };
        assert_eq!(
            err.to_string(),
            "time limit exceeded: program ran longer than 15s"
        );
        assert_eq!(err.output(), "partial");
    }

    #[test]
    fn test_pre_run_errors_have_no_output() {
        let err = ExecError::Compilation {
            message: "main.c:1: error".into(),
        };
        assert_eq!(err.output(), "");
        assert_eq!(err.message(), "main.c:1: error");
    }
}
