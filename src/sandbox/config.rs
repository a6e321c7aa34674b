//! Sandbox configuration
//!
//! Settings read by the sandbox runner process before it seals itself in.
//! The engine exports `SANDBOX_LOG_DIR` to the child so both sides agree on
//! where the diagnostic log lives.

use std::path::{Path, PathBuf};

/// Environment variable carrying the sandbox hostname
pub const HOSTNAME_ENV: &str = "SANDBOX_HOSTNAME";
/// Environment variable carrying the new root directory
pub const ROOT_ENV: &str = "SANDBOX_ROOT";
/// Environment variable carrying the diagnostic log directory
pub const LOG_DIR_ENV: &str = "SANDBOX_LOG_DIR";

pub const DEFAULT_HOSTNAME: &str = "sandbox";
pub const DEFAULT_ROOT: &str = "/securefs";
pub const DEFAULT_LOG_DIR: &str = "/securefs/serverOutput";

/// Sandbox configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SandboxConfig {
    /// Hostname visible inside the UTS namespace
    pub hostname: String,
    /// Directory that becomes `/` after chroot
    pub root: PathBuf,
    /// Diagnostic log directory, as seen before chroot
    pub log_dir: PathBuf,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            hostname: DEFAULT_HOSTNAME.to_string(),
            root: PathBuf::from(DEFAULT_ROOT),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
        }
    }
}

impl SandboxConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let hostname = std::env::var(HOSTNAME_ENV).unwrap_or_else(|_| DEFAULT_HOSTNAME.into());
        let root = std::env::var(ROOT_ENV).unwrap_or_else(|_| DEFAULT_ROOT.into());
        let log_dir = std::env::var(LOG_DIR_ENV).unwrap_or_else(|_| DEFAULT_LOG_DIR.into());

        Self {
            hostname,
            root: root.into(),
            log_dir: log_dir.into(),
        }
    }

    /// Translate a host path into the path the sandbox sees after chroot.
    ///
    /// Paths outside the new root are returned unchanged; they only resolve if
    /// the same path also exists inside the root.
    pub fn inside(&self, host_path: &Path) -> PathBuf {
        match host_path.strip_prefix(&self.root) {
            Ok(relative) => Path::new("/").join(relative),
            Err(_) => host_path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inside_strips_root() {
        let config = SandboxConfig::default();
        assert_eq!(
            config.inside(Path::new("/securefs/runner_files/abc.py")),
            PathBuf::from("/runner_files/abc.py")
        );
    }

    #[test]
    fn test_inside_keeps_foreign_paths() {
        let config = SandboxConfig::default();
        assert_eq!(
            config.inside(Path::new("/tmp/abc.py")),
            PathBuf::from("/tmp/abc.py")
        );
    }

    #[test]
    fn test_inside_root_itself() {
        let config = SandboxConfig::default();
        assert_eq!(config.inside(Path::new("/securefs")), PathBuf::from("/"));
    }
}
