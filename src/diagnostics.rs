//! Diagnostic log side channel
//!
//! The sandbox runner writes its own log to `<log_dir>/<prefix>.log`. After
//! each run the engine copies that file into the host log and deletes it. The
//! content is never part of an execution result.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{info, warn};

/// Location of the diagnostic log for one execution
pub fn log_path(log_dir: &Path, file_name_prefix: &str) -> PathBuf {
    log_dir.join(format!("{}.log", file_name_prefix))
}

/// Surface and delete the diagnostic log for `file_name_prefix`.
///
/// Returns the log content when the file existed. A missing file is normal
/// (runs that never reached the sandbox runner leave none).
pub async fn harvest(log_dir: &Path, file_name_prefix: &str) -> Option<String> {
    let path = log_path(log_dir, file_name_prefix);

    let content = match fs::read(&path).await {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => {
            warn!("Diagnostic log {:?} exists but could not be read: {}", path, e);
            None
        }
    };

    if let Some(ref text) = content {
        if !text.trim().is_empty() {
            info!("[sandbox {}] {}", file_name_prefix, text.trim_end());
        }
    }

    match fs::remove_file(&path).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove diagnostic log {:?}: {}", path, e),
    }

    content
}
