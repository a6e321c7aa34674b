//! Command adapter driven by the languages table
//!
//! Writes the source to `<directory>/<prefix>.<extension>`. Interpreted
//! languages run that file directly; compiled languages build
//! `<directory>/<prefix>.out` and the source is removed once the build ends.
//! The compiler runs through the runner it was given, which in production is
//! the namespace sandbox, so it sees the sandbox root and nothing else.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use super::{AdaptError, Adapted, FileDefaults, ResolvedSettings, SourceAdapter};
use crate::compiler::{compile, compile_invocation};
use crate::core::ScopedFile;
use crate::languages::LanguageConfig;
use crate::runner::Runner;

pub struct CommandAdapter {
    language: String,
    config: LanguageConfig,
    /// Runs the compile command
    compiler: Arc<dyn Runner>,
}

impl CommandAdapter {
    pub fn new(
        language: impl Into<String>,
        config: LanguageConfig,
        compiler: Arc<dyn Runner>,
    ) -> Self {
        Self {
            language: language.into(),
            config,
            compiler,
        }
    }

    fn binary_path(settings: &ResolvedSettings) -> PathBuf {
        settings
            .directory
            .join(format!("{}.out", settings.file_name_prefix))
    }
}

#[async_trait]
impl SourceAdapter for CommandAdapter {
    fn defaults(&self) -> FileDefaults {
        FileDefaults {
            directory: self.config.directory.clone(),
            extension: self.config.extension.clone(),
        }
    }

    async fn adapt(&self, code: &str, settings: &ResolvedSettings) -> Result<Adapted, AdaptError> {
        let source = settings.source_path();

        fs::create_dir_all(&settings.directory).await.map_err(|e| {
            AdaptError::new(format!(
                "Failed to create {:?}: {}",
                settings.directory, e
            ))
        })?;

        fs::write(&source, code).await.map_err(|e| {
            AdaptError::new(format!("Failed to write source {:?}: {}", source, e))
                .with_artifact(&source)
        })?;

        let Some(template) = &self.config.compile_command else {
            debug!("{}: running {:?} without compilation", self.language, source);
            return Ok(Adapted {
                system_command: self.config.run_command.clone(),
                artifact: source,
            });
        };

        // The source is only needed while compiling.
        let _source_guard = ScopedFile::new(&source);
        let binary = Self::binary_path(settings);
        let invocation =
            compile_invocation(template, &source, &binary, &settings.file_name_prefix);
        let result = compile(
            self.compiler.as_ref(),
            &invocation,
            self.config.compile_timeout,
        )
        .await;

        if !result.success {
            let message = result
                .message
                .unwrap_or_else(|| "Compilation failed".to_string());
            return Err(AdaptError::new(message).with_artifact(&binary));
        }

        info!("{}: compiled {:?}", self.language, binary);
        Ok(Adapted {
            system_command: self.config.run_command.clone(),
            artifact: binary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{Invocation, TrustedRunner};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::process::Command;

    /// Trusted runner that remembers what it was asked to launch
    #[derive(Default)]
    struct RecordingRunner {
        seen: Mutex<Vec<Invocation>>,
    }

    impl Runner for RecordingRunner {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn command(&self, invocation: &Invocation) -> anyhow::Result<Command> {
            self.seen.lock().unwrap().push(invocation.clone());
            TrustedRunner.command(invocation)
        }
    }

    fn config(dir: &std::path::Path, compile_command: Option<&str>) -> LanguageConfig {
        LanguageConfig {
            extension: "sh".into(),
            directory: dir.to_path_buf(),
            compile_command: compile_command
                .map(|c| c.split_whitespace().map(String::from).collect()),
            run_command: "sh".into(),
            compile_timeout: Duration::from_secs(5),
        }
    }

    fn adapter(dir: &std::path::Path, compile_command: Option<&str>) -> CommandAdapter {
        CommandAdapter::new(
            "fake",
            config(dir, compile_command),
            Arc::new(TrustedRunner),
        )
    }

    fn settings(dir: &std::path::Path, prefix: &str) -> ResolvedSettings {
        ResolvedSettings {
            file_name_prefix: prefix.into(),
            directory: dir.to_path_buf(),
            extension: "sh".into(),
        }
    }

    #[tokio::test]
    async fn test_interpreted_source_is_the_artifact() {
        let dir = tempfile::tempdir().unwrap();

        let adapted = adapter(dir.path(), None)
            .adapt("echo hi", &settings(dir.path(), "run1"))
            .await
            .unwrap();

        assert_eq!(adapted.system_command, "sh");
        assert_eq!(adapted.artifact, dir.path().join("run1.sh"));
        assert_eq!(std::fs::read_to_string(&adapted.artifact).unwrap(), "echo hi");
    }

    #[tokio::test]
    async fn test_compiled_binary_replaces_source() {
        let dir = tempfile::tempdir().unwrap();

        let adapted = adapter(dir.path(), Some("cp {source} {binary}"))
            .adapt("echo built", &settings(dir.path(), "run2"))
            .await
            .unwrap();

        assert_eq!(adapted.artifact, dir.path().join("run2.out"));
        assert!(adapted.artifact.exists());
        assert!(!dir.path().join("run2.sh").exists());
    }

    #[tokio::test]
    async fn test_compiler_runs_through_given_runner() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::default());
        let adapter = CommandAdapter::new(
            "fake",
            config(dir.path(), Some("cp {source} {binary}")),
            runner.clone(),
        );

        adapter
            .adapt("echo built", &settings(dir.path(), "run4"))
            .await
            .unwrap();

        let seen = runner.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].system_command, "cp {source} {binary}");
        assert_eq!(seen[0].artifact, dir.path().join("run4.sh"));
        assert_eq!(seen[0].output, Some(dir.path().join("run4.out")));
        assert_eq!(seen[0].file_name_prefix, "run4");
    }

    #[tokio::test]
    async fn test_compile_failure_reports_message_and_cleans_source() {
        let dir = tempfile::tempdir().unwrap();

        let err = adapter(dir.path(), Some("false"))
            .adapt("int main(", &settings(dir.path(), "run3"))
            .await
            .unwrap_err();

        assert_eq!(err.message, "Compilation failed with exit code 1");
        assert_eq!(err.artifact, Some(dir.path().join("run3.out")));
        assert!(!dir.path().join("run3.sh").exists());
    }
}
