//! Sandbox module - namespace isolation and the sandbox runner
//!
//! This module provides:
//! - Namespace unsharing and rootless id mapping (engine side, before exec)
//! - The ordered sealing sequence (proc, sys, hostname, chroot)
//! - The runner process that seals PID 1 and execs the artifact
//!
//! The sandbox module does NOT:
//! - Classify outcomes (that's the engine's job)
//! - Know about languages or compilation

pub mod bootstrap;
pub mod config;
pub mod init;
pub mod namespaces;

pub use bootstrap::{seal, Sealed, SetupError};
pub use config::SandboxConfig;
pub use namespaces::Isolation;
