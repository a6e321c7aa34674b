//! Compiler module - sandboxed compilation for the command adapter
//!
//! The compile command is untrusted input's first contact with a toolchain,
//! so it goes through the same [`Runner`] as the artifact itself: in
//! production that is the namespace sandbox, chrooted into the sandbox root.
//! A failed build becomes a readable message (compiler stderr first, then
//! stdout, then a description of how the compiler ended).

use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::core::stamp;
use crate::runner::{self, Invocation, RunStatus, Runner};

/// Result of a compilation attempt
#[derive(Debug)]
pub struct CompileResult {
    pub success: bool,
    pub message: Option<String>,
}

impl CompileResult {
    fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Compile step for `template`; `{source}` and `{binary}` are filled in by the runner
pub fn compile_invocation(
    template: &[String],
    source: &Path,
    binary: &Path,
    file_name_prefix: &str,
) -> Invocation {
    Invocation::new(template.join(" "), source, file_name_prefix).with_output(binary)
}

/// Run a compile step through `runner`, killing the compiler after `timeout`
pub async fn compile(runner: &dyn Runner, invocation: &Invocation, timeout: Duration) -> CompileResult {
    debug!(
        "Compiling with {:?} via {} runner",
        invocation.argv(),
        runner.name()
    );

    let outcome = runner::execute(runner, invocation, timeout).await;

    let status = match outcome.status {
        RunStatus::Exited(status) if status.success() => return CompileResult::ok(),
        RunStatus::Exited(status) => status,
        RunStatus::TimedOut => {
            return CompileResult::failed(format!(
                "Compilation timed out after {}s",
                timeout.as_secs()
            ))
        }
        RunStatus::Failed(message) => return CompileResult::failed(message),
    };

    let stderr = stamp::strip(&outcome.stderr);
    let error_msg = if !stderr.trim().is_empty() {
        stderr.to_string()
    } else if !outcome.stdout.trim().is_empty() {
        outcome.stdout
    } else {
        match status.code() {
            Some(code) => format!("Compilation failed with exit code {}", code),
            None => "Compiler crashed".to_string(),
        }
    };

    CompileResult::failed(error_msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::TrustedRunner;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_compile_invocation_keeps_placeholders() {
        let invocation = compile_invocation(
            &words("gcc -o {binary} {source}"),
            Path::new("/securefs/runner_files/abc.c"),
            Path::new("/securefs/runner_files/abc.out"),
            "abc",
        );

        assert_eq!(invocation.system_command, "gcc -o {binary} {source}");
        assert_eq!(
            invocation.argv(),
            words("gcc -o /securefs/runner_files/abc.out /securefs/runner_files/abc.c")
        );
    }

    #[tokio::test]
    async fn test_failed_compile_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("cc.sh");
        std::fs::write(&script, "echo 'error: expected ;' >&2\nexit 1\n").unwrap();

        let invocation = Invocation::new("sh", &script, "cc");
        let result = compile(&TrustedRunner, &invocation, Duration::from_secs(5)).await;

        assert!(!result.success);
        assert_eq!(result.message.as_deref(), Some("error: expected ;\n"));
    }

    #[tokio::test]
    async fn test_silent_failure_reports_exit_code() {
        let invocation = Invocation::new("false", "/nonexistent.c", "cc");
        let result = compile(&TrustedRunner, &invocation, Duration::from_secs(5)).await;

        assert!(!result.success);
        assert_eq!(
            result.message.as_deref(),
            Some("Compilation failed with exit code 1")
        );
    }

    #[tokio::test]
    async fn test_compile_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("slow.sh");
        std::fs::write(&script, "exec sleep 10\n").unwrap();

        let invocation = Invocation::new("sh", &script, "cc");
        let result = compile(&TrustedRunner, &invocation, Duration::from_millis(200)).await;

        assert!(!result.success);
        assert!(result.message.unwrap().contains("timed out"));
    }
}
