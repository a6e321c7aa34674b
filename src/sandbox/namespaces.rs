//! Namespace isolation applied in the forked child before exec
//!
//! The child unshares mount, UTS, IPC, PID, network and user namespaces in one
//! call, then maps namespace id 0 onto the invoking host user and group. The
//! resulting sandbox is rootless: uid 0 inside is the unprivileged caller
//! outside.
//!
//! Because of `CLONE_NEWPID` the exec'd sandbox runner stays in the host PID
//! namespace; its first child becomes PID 1 of the new one.

use std::io;

use nix::sched::{unshare, CloneFlags};
use nix::unistd::{getgid, getuid};

/// Namespaces every sandbox gets
pub fn isolation_flags() -> CloneFlags {
    CloneFlags::CLONE_NEWNS
        | CloneFlags::CLONE_NEWUTS
        | CloneFlags::CLONE_NEWIPC
        | CloneFlags::CLONE_NEWPID
        | CloneFlags::CLONE_NEWNET
        | CloneFlags::CLONE_NEWUSER
}

/// Single-entry id mapping line for `/proc/<pid>/{uid,gid}_map`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdMapping {
    pub inside: u32,
    pub outside: u32,
    pub count: u32,
}

impl IdMapping {
    /// Namespace root mapped onto one host id
    pub fn root_to(outside: u32) -> Self {
        Self {
            inside: 0,
            outside,
            count: 1,
        }
    }

    pub fn render(&self) -> String {
        format!("{} {} {}\n", self.inside, self.outside, self.count)
    }
}

/// Pre-rendered isolation profile.
///
/// Everything is formatted before fork so `enter` does not allocate in the
/// child.
#[derive(Debug, Clone)]
pub struct Isolation {
    flags: CloneFlags,
    uid_map: String,
    gid_map: String,
}

impl Isolation {
    /// Profile mapping namespace root onto the calling user and group
    pub fn for_current_user() -> Self {
        Self {
            flags: isolation_flags(),
            uid_map: IdMapping::root_to(getuid().as_raw()).render(),
            gid_map: IdMapping::root_to(getgid().as_raw()).render(),
        }
    }

    pub fn uid_map(&self) -> &str {
        &self.uid_map
    }

    pub fn gid_map(&self) -> &str {
        &self.gid_map
    }

    /// Unshare and write the id maps for the current process.
    ///
    /// Only call between fork and exec. `setgroups` must be denied before
    /// `gid_map` is written or the kernel rejects the mapping.
    pub fn enter(&self) -> io::Result<()> {
        unshare(self.flags)?;
        std::fs::write("/proc/self/setgroups", b"deny")?;
        std::fs::write("/proc/self/uid_map", self.uid_map.as_bytes())?;
        std::fs::write("/proc/self/gid_map", self.gid_map.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_cover_all_namespaces() {
        let flags = isolation_flags();
        for flag in [
            CloneFlags::CLONE_NEWNS,
            CloneFlags::CLONE_NEWUTS,
            CloneFlags::CLONE_NEWIPC,
            CloneFlags::CLONE_NEWPID,
            CloneFlags::CLONE_NEWNET,
            CloneFlags::CLONE_NEWUSER,
        ] {
            assert!(flags.contains(flag));
        }
    }

    #[test]
    fn test_root_maps_to_invoking_user() {
        let isolation = Isolation::for_current_user();
        let uid = getuid().as_raw();
        let gid = getgid().as_raw();

        assert_eq!(isolation.uid_map(), format!("0 {} 1\n", uid));
        assert_eq!(isolation.gid_map(), format!("0 {} 1\n", gid));
    }

    #[test]
    fn test_single_entry_mapping() {
        let mapping = IdMapping::root_to(1000);
        assert_eq!(mapping.render(), "0 1000 1\n");
        assert_eq!(mapping.count, 1);
    }
}
