use serde::{Deserialize, Serialize};

use crate::adapter::FileSettings;
use crate::core::{ExecResult, Verdict};

/// Job received from the Redis queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionJob {
    pub request_id: String,
    pub language: String,
    pub code: String,
    #[serde(default)]
    pub settings: Option<FileSettings>,
}

/// Report stored in Redis once a job finishes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub request_id: String,
    pub verdict: Verdict,
    /// Captured stdout (partial for time limit and stderr runtime errors)
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ExecutionReport {
    pub fn new(request_id: impl Into<String>, result: &ExecResult) -> Self {
        let verdict = Verdict::of(result);
        let (output, error_message) = match result {
            Ok(stdout) => (stdout.clone(), None),
            Err(e) => (e.output().to_string(), Some(e.message())),
        };

        Self {
            request_id: request_id.into(),
            verdict,
            output,
            error_message,
        }
    }
}
