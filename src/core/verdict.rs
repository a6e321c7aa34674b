use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{ExecError, ExecResult};

/// Status reported for a finished execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Success,
    UnsupportedLanguage,
    CompilationError,
    TimeLimitExceeded,
    RuntimeError,
}

impl Verdict {
    pub fn of(result: &ExecResult) -> Self {
        match result {
            Ok(_) => Verdict::Success,
            Err(ExecError::UnsupportedLanguage { .. }) => Verdict::UnsupportedLanguage,
            Err(ExecError::Compilation { .. }) => Verdict::CompilationError,
            Err(ExecError::TimeLimitExceeded { .. }) => Verdict::TimeLimitExceeded,
            Err(ExecError::Runtime { .. }) => Verdict::RuntimeError,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Success => "success",
            Verdict::UnsupportedLanguage => "unsupported_language",
            Verdict::CompilationError => "compilation_error",
            Verdict::TimeLimitExceeded => "time_limit_exceeded",
            Verdict::RuntimeError => "runtime_error",
        };
        write!(f, "{}", s)
    }
}
