//! Execution engine
//!
//! Owns one execution end to end:
//! 1. resolve file settings against the language defaults
//! 2. build the artifact through the language's adapter
//! 3. run it through the configured runner under a fixed deadline
//! 4. harvest the diagnostic log
//! 5. classify the outcome
//!
//! The artifact and the diagnostic log are held by drop guards from the moment
//! they can exist, so they are gone when `run` returns, whichever way it
//! returns.

pub mod classify;
pub mod config;

use std::sync::Arc;

use tracing::{info, warn};

use crate::adapter::{AdapterRegistry, FileSettings, SourceAdapter};
use crate::core::{ExecError, ExecResult, ScopedFile, Verdict};
use crate::diagnostics;
use crate::languages::Languages;
use crate::runner::{self, Invocation, Runner, SandboxedRunner};

pub use classify::classify;
pub use config::EngineConfig;

/// Shared, read-only state for building executables
#[derive(Clone)]
pub struct Engine {
    config: Arc<EngineConfig>,
    registry: Arc<AdapterRegistry>,
    runner: Arc<dyn Runner>,
}

impl Engine {
    /// Engine compiling and running everything through the namespace sandbox
    pub fn new(config: EngineConfig, languages: &Languages) -> Self {
        let runner: Arc<dyn Runner> = Arc::new(SandboxedRunner::from_config(&config));
        let registry = AdapterRegistry::from_languages(languages, Arc::clone(&runner));
        Self::with_runner(config, registry, runner)
    }

    pub fn with_runner(
        config: EngineConfig,
        registry: AdapterRegistry,
        runner: Arc<dyn Runner>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            runner,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Bind code to its language's adapter. Creates no files or processes.
    pub fn prepare(
        &self,
        language: &str,
        code: impl Into<String>,
        settings: Option<FileSettings>,
    ) -> Result<Executable, ExecError> {
        let Some(adapter) = self.registry.get(language) else {
            let err = ExecError::UnsupportedLanguage {
                language: language.to_string(),
            };
            warn!("{}", err);
            return Err(err);
        };

        Ok(Executable {
            language: language.to_string(),
            code: code.into(),
            settings: settings.unwrap_or_default(),
            adapter,
            config: Arc::clone(&self.config),
            runner: Arc::clone(&self.runner),
        })
    }

    /// `prepare` followed by `run`
    pub async fn execute(
        &self,
        language: &str,
        code: impl Into<String>,
        settings: Option<FileSettings>,
    ) -> ExecResult {
        self.prepare(language, code, settings)?.run().await
    }
}

/// One prepared execution. `run` consumes it, so it runs at most once.
pub struct Executable {
    language: String,
    code: String,
    settings: FileSettings,
    adapter: Arc<dyn SourceAdapter>,
    config: Arc<EngineConfig>,
    runner: Arc<dyn Runner>,
}

impl Executable {
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Build, run and classify. Returns captured stdout or one classified error.
    pub async fn run(self) -> ExecResult {
        let settings = self.settings.resolve(&self.adapter.defaults());
        let prefix = settings.file_name_prefix.clone();

        let _log_guard = ScopedFile::new(diagnostics::log_path(&self.config.log_dir, &prefix));

        let adapted = match self.adapter.adapt(&self.code, &settings).await {
            Ok(adapted) => adapted,
            Err(e) => {
                let _artifact_guard = e.artifact.as_ref().map(ScopedFile::new);
                warn!("Compilation failed for {} ({}): {}", self.language, prefix, e);
                diagnostics::harvest(&self.config.log_dir, &prefix).await;
                return Err(ExecError::Compilation { message: e.message });
            }
        };
        let _artifact_guard = ScopedFile::new(&adapted.artifact);

        let invocation = Invocation::new(adapted.system_command, &adapted.artifact, &prefix);

        info!(
            "Running {} ({}) via {} runner",
            self.language,
            prefix,
            self.runner.name()
        );
        let outcome = runner::execute(self.runner.as_ref(), &invocation, self.config.timeout).await;
        let elapsed = outcome.elapsed;

        diagnostics::harvest(&self.config.log_dir, &prefix).await;

        let result = classify(outcome, self.config.timeout);
        info!(
            "Finished {} ({}): {} in {}ms",
            self.language,
            prefix,
            Verdict::of(&result),
            elapsed.as_millis()
        );
        result
    }
}
