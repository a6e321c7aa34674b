//! Language configuration for the command adapter

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// Default directory for sources and artifacts, inside the sandbox root
pub const DEFAULT_DIRECTORY: &str = "/securefs/runner_files";
/// Default compile timeout in seconds
pub const DEFAULT_COMPILE_TIMEOUT_SECS: u64 = 30;

/// Configuration for a supported programming language
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageConfig {
    /// Source file extension without the dot (e.g., "cpp")
    pub extension: String,
    /// Directory where sources and artifacts are written
    pub directory: PathBuf,
    /// Compile command template (None if not needed)
    pub compile_command: Option<Vec<String>>,
    /// Words placed before the artifact when running it
    pub run_command: String,
    /// Upper bound for the compile step
    pub compile_timeout: Duration,
}

/// Raw TOML configuration for a language
#[derive(Debug, Deserialize)]
struct RawLanguageConfig {
    extension: String,
    directory: Option<PathBuf>,
    compile_command: Option<String>,
    #[serde(default)]
    run_command: String,
    compile_timeout: Option<u64>,
    #[serde(default)]
    aliases: Vec<String>,
}

/// Loaded language table, keyed by lowercase name and alias
#[derive(Debug, Clone, Default)]
pub struct Languages {
    configs: HashMap<String, LanguageConfig>,
}

impl Languages {
    /// Languages bundled with the crate
    pub fn embedded() -> anyhow::Result<Self> {
        let content = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/languages.toml"));
        Self::parse(content)
    }

    /// Load languages from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read language config {:?}", path))?;
        Self::parse(&content)
    }

    /// Use `LANGUAGES_CONFIG` when set, the bundled table otherwise
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var("LANGUAGES_CONFIG") {
            Ok(path) => Self::from_file(path),
            Err(_) => Self::embedded(),
        }
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let raw_configs: HashMap<String, RawLanguageConfig> =
            toml::from_str(content).context("Invalid language config")?;

        let mut configs = HashMap::new();

        for (name, raw) in raw_configs {
            let extension = raw.extension.trim_start_matches('.').to_string();
            if extension.is_empty() {
                anyhow::bail!("Empty extension for {}", name);
            }

            let compile_command = raw.compile_command.map(|cmd| into_command(&cmd));
            if compile_command.as_ref().is_some_and(|cmd| cmd.is_empty()) {
                anyhow::bail!("Empty compile command for {}", name);
            }

            let config = LanguageConfig {
                extension,
                directory: raw.directory.unwrap_or_else(|| DEFAULT_DIRECTORY.into()),
                compile_command,
                run_command: raw.run_command.trim().to_string(),
                compile_timeout: Duration::from_secs(
                    raw.compile_timeout.unwrap_or(DEFAULT_COMPILE_TIMEOUT_SECS),
                ),
            };

            // Add main language name
            configs.insert(name.to_lowercase(), config.clone());

            // Add aliases
            for alias in raw.aliases {
                configs.insert(alias.to_lowercase(), config.clone());
            }
        }

        Ok(Self { configs })
    }

    /// Get language configuration by language name or alias
    pub fn get(&self, language: &str) -> Option<&LanguageConfig> {
        self.configs.get(&language.to_lowercase())
    }

    /// Iterate over every registered name and alias
    pub fn iter(&self) -> impl Iterator<Item = (&String, &LanguageConfig)> {
        self.configs.iter()
    }
}

fn into_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_config() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[c]
extension = "c"
compile_command = "gcc -o {{binary}} {{source}}"

[python]
extension = ".py"
directory = "/srv/box/code"
run_command = "python3"
aliases = ["py", "Python3"]
"#
        )
        .unwrap();
        file
    }

    #[test]
    fn test_load_languages() {
        let config_file = create_test_config();
        let languages = Languages::from_file(config_file.path()).unwrap();

        let c = languages.get("C").unwrap();
        assert_eq!(
            c.compile_command.as_deref(),
            Some(&["gcc", "-o", "{binary}", "{source}"].map(String::from)[..])
        );
        assert_eq!(c.run_command, "");
        assert_eq!(c.directory, PathBuf::from(DEFAULT_DIRECTORY));
        assert_eq!(c.compile_timeout, Duration::from_secs(30));

        let py = languages.get("python3").unwrap();
        assert_eq!(py.extension, "py");
        assert_eq!(py.directory, PathBuf::from("/srv/box/code"));
        assert_eq!(languages.get("py"), languages.get("python"));
    }

    #[test]
    fn test_embedded_languages_parse() {
        let languages = Languages::embedded().unwrap();
        assert!(languages.get("python").is_some());
        assert!(languages.get("cpp").unwrap().compile_command.is_some());
    }

    #[test]
    fn test_empty_compile_command_is_rejected() {
        let err = Languages::parse("[x]\nextension = \"x\"\ncompile_command = \"  \"\n");
        assert!(err.is_err());
    }
}
