//! Source adapters - turning source text into something runnable
//!
//! An adapter takes the submitted code plus resolved file settings and
//! produces the launcher words and the on-disk artifact the sandbox will run.
//! Adapters are looked up per language through [`AdapterRegistry`].

pub mod command;
pub mod registry;

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub use command::CommandAdapter;
pub use registry::AdapterRegistry;

/// Caller-supplied file settings; unset fields fall back to language defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileSettings {
    /// Names the artifact and the diagnostic log of one execution.
    /// Must be unique among in-flight executions.
    #[serde(default, rename = "FileNamePrefix", alias = "file_name_prefix")]
    pub file_name_prefix: Option<String>,
    /// Directory the artifact is written to; must be inside the language's directory
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Source file extension without the dot
    #[serde(default)]
    pub extension: Option<String>,
}

/// Per-language values used for unset [`FileSettings`] fields
#[derive(Debug, Clone, PartialEq)]
pub struct FileDefaults {
    pub directory: PathBuf,
    pub extension: String,
}

/// File settings with every field filled in
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSettings {
    pub file_name_prefix: String,
    pub directory: PathBuf,
    pub extension: String,
}

impl FileSettings {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            file_name_prefix: Some(prefix.into()),
            ..Self::default()
        }
    }

    /// Fill unset fields from `defaults`.
    ///
    /// A missing prefix, or one that is not a plain file name component, is
    /// replaced by a fresh UUID. A directory outside the language's directory
    /// and an extension that is not plain alphanumerics fall back to the
    /// defaults, so the artifact can never land outside its directory.
    pub fn resolve(&self, defaults: &FileDefaults) -> ResolvedSettings {
        let file_name_prefix = match &self.file_name_prefix {
            Some(prefix) if is_valid_prefix(prefix) => prefix.clone(),
            Some(prefix) => {
                warn!("Ignoring unsafe file name prefix {:?}", prefix);
                generate_prefix()
            }
            None => generate_prefix(),
        };

        let directory = match &self.directory {
            Some(dir) if is_within(dir, &defaults.directory) => dir.clone(),
            Some(dir) => {
                warn!(
                    "Ignoring directory {:?} outside {:?}",
                    dir, defaults.directory
                );
                defaults.directory.clone()
            }
            None => defaults.directory.clone(),
        };

        let extension = match self.extension.as_deref().map(|ext| ext.trim_start_matches('.')) {
            Some(ext) if is_valid_extension(ext) => ext.to_string(),
            Some(ext) => {
                warn!("Ignoring unsafe extension {:?}", ext);
                defaults.extension.clone()
            }
            None => defaults.extension.clone(),
        };

        ResolvedSettings {
            file_name_prefix,
            directory,
            extension,
        }
    }
}

impl ResolvedSettings {
    /// `<directory>/<prefix>.<extension>`
    pub fn source_path(&self) -> PathBuf {
        self.directory
            .join(format!("{}.{}", self.file_name_prefix, self.extension))
    }
}

fn generate_prefix() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// `dir` is `base` or below it, without `.` or `..` components
fn is_within(dir: &Path, base: &Path) -> bool {
    dir.starts_with(base)
        && dir
            .components()
            .all(|c| matches!(c, Component::RootDir | Component::Normal(_)))
}

/// ASCII letters and digits only, at most 16 of them
fn is_valid_extension(extension: &str) -> bool {
    !extension.is_empty()
        && extension.len() <= 16
        && extension.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// ASCII letters, digits, `-` and `_` only
pub fn is_valid_prefix(prefix: &str) -> bool {
    !prefix.is_empty()
        && prefix.len() <= 128
        && prefix
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// What an adapter hands back to the engine
#[derive(Debug, Clone, PartialEq)]
pub struct Adapted {
    /// Launcher words placed before the artifact (may be empty)
    pub system_command: String,
    /// File the sandbox runs
    pub artifact: PathBuf,
}

/// Adapter failure; becomes a compilation error
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AdaptError {
    pub message: String,
    /// Artifact location if one was reported before failing; the engine removes it
    pub artifact: Option<PathBuf>,
}

impl AdaptError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            artifact: None,
        }
    }

    pub fn with_artifact(mut self, artifact: impl Into<PathBuf>) -> Self {
        self.artifact = Some(artifact.into());
        self
    }
}

/// Capability turning source code into a runnable command and artifact
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Defaults used when resolving [`FileSettings`]
    fn defaults(&self) -> FileDefaults;

    /// Write (and if needed build) the artifact. Called at most once per execution.
    async fn adapt(&self, code: &str, settings: &ResolvedSettings) -> Result<Adapted, AdaptError>;
}
