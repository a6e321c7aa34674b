//! Isolation boundary construction
//!
//! Runs inside the freshly unshared namespaces, as PID 1 of the new PID
//! namespace, before the untrusted artifact is exec'd. The sequence is fixed:
//!
//! 1. mount `proc` at `<root>/proc`
//! 2. mount `sysfs` at `<root>/sys`
//! 3. set the hostname
//! 4. chroot into `<root>` and chdir to `/`
//!
//! Each step consumes the previous state, so skipping or reordering a step
//! does not compile, and only a fully sealed sandbox yields the [`Sealed`]
//! token that exec requires.

use std::marker::PhantomData;
use std::path::PathBuf;

use nix::errno::Errno;
use nix::mount::{mount, MsFlags};
use nix::unistd::{chdir, chroot, sethostname};
use thiserror::Error;
use tracing::{debug, warn};

use super::config::SandboxConfig;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to create mount point {path:?}: {source}")]
    MountPoint {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to mount {fstype} on {target:?}: {source}")]
    Mount {
        fstype: &'static str,
        target: PathBuf,
        source: Errno,
    },

    #[error("failed to set hostname to {hostname:?}: {source}")]
    Hostname { hostname: String, source: Errno },

    #[error("failed to chroot into {root:?}: {source}")]
    Chroot { root: PathBuf, source: Errno },

    #[error("failed to change directory to / after chroot: {0}")]
    Chdir(Errno),
}

pub struct Fresh;
pub struct ProcMounted;
pub struct SysMounted;
pub struct Named;

/// Proof that every isolation step succeeded
#[derive(Debug)]
pub struct Sealed {
    _private: (),
}

pub struct Bootstrap<'a, S> {
    config: &'a SandboxConfig,
    _state: PhantomData<S>,
}

impl<'a, S> Bootstrap<'a, S> {
    fn advance<T>(self) -> Bootstrap<'a, T> {
        Bootstrap {
            config: self.config,
            _state: PhantomData,
        }
    }
}

impl<'a> Bootstrap<'a, Fresh> {
    pub fn new(config: &'a SandboxConfig) -> Self {
        Self {
            config,
            _state: PhantomData,
        }
    }

    /// Mount a fresh procfs so `/proc` reflects the new PID namespace
    pub fn mount_proc(self) -> Result<Bootstrap<'a, ProcMounted>, SetupError> {
        let target = self.config.root.join("proc");

        std::fs::create_dir_all(&target).map_err(|source| SetupError::MountPoint {
            path: target.clone(),
            source,
        })?;
        mount_fresh("proc", "proc", &target)?;

        debug!("Mounted proc at {:?}", target);
        Ok(self.advance())
    }
}

impl<'a> Bootstrap<'a, ProcMounted> {
    /// Mount a fresh sysfs owned by the new network namespace
    pub fn mount_sys(self) -> Result<Bootstrap<'a, SysMounted>, SetupError> {
        let target = self.config.root.join("sys");

        // An unusable mount point surfaces as a mount failure below.
        if let Err(e) = std::fs::create_dir_all(&target) {
            warn!("Could not create {:?}: {}", target, e);
        }
        mount_fresh("sysfs", "sysfs", &target)?;

        debug!("Mounted sysfs at {:?}", target);
        Ok(self.advance())
    }
}

impl<'a> Bootstrap<'a, SysMounted> {
    pub fn set_hostname(self) -> Result<Bootstrap<'a, Named>, SetupError> {
        let hostname = &self.config.hostname;
        sethostname(hostname).map_err(|source| SetupError::Hostname {
            hostname: hostname.clone(),
            source,
        })?;

        debug!("Hostname set to {}", hostname);
        Ok(self.advance())
    }
}

impl<'a> Bootstrap<'a, Named> {
    /// Switch the filesystem root. Last step: nothing on the host side is
    /// reachable by path afterwards.
    pub fn enter_root(self) -> Result<Sealed, SetupError> {
        let root = &self.config.root;
        chroot(root.as_path()).map_err(|source| SetupError::Chroot {
            root: root.clone(),
            source,
        })?;
        chdir("/").map_err(SetupError::Chdir)?;

        debug!("Entered new root {:?}", root);
        Ok(Sealed { _private: () })
    }
}

/// Run the full sealing sequence
pub fn seal(config: &SandboxConfig) -> Result<Sealed, SetupError> {
    Bootstrap::new(config)
        .mount_proc()?
        .mount_sys()?
        .set_hostname()?
        .enter_root()
}

fn mount_fresh(
    source: &'static str,
    fstype: &'static str,
    target: &std::path::Path,
) -> Result<(), SetupError> {
    mount(
        Some(source),
        target,
        Some(fstype),
        MsFlags::empty(),
        None::<&str>,
    )
    .map_err(|source| SetupError::Mount {
        fstype,
        target: target.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_error_names_target() {
        let err = SetupError::Mount {
            fstype: "proc",
            target: PathBuf::from("/securefs/proc"),
            source: Errno::EPERM,
        };
        let message = err.to_string();
        assert!(message.contains("proc"));
        assert!(message.contains("/securefs/proc"));
    }

    #[test]
    fn test_unprivileged_seal_fails_before_chroot() {
        // Outside a user namespace an unprivileged process cannot mount, so the
        // chain must stop at the first step and never reach chroot.
        if nix::unistd::geteuid().is_root() {
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let config = SandboxConfig {
            hostname: "sandbox".into(),
            root: dir.path().to_path_buf(),
            log_dir: dir.path().join("logs"),
        };

        match seal(&config) {
            Err(SetupError::Mount { fstype, .. }) => assert_eq!(fstype, "proc"),
            other => panic!("expected proc mount failure, got {:?}", other),
        }
        assert!(dir.path().join("proc").is_dir());
    }
}
