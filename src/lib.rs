//! Sandboxed execution of untrusted source code
//!
//! The [`engine`] turns a language id and source text into captured stdout or
//! one classified [`core::ExecError`]. Every run goes through a fresh
//! namespace sandbox whose runner lives in [`sandbox`].

pub mod adapter;
pub mod compiler;
pub mod core;
pub mod diagnostics;
pub mod engine;
pub mod jobs;
pub mod languages;
pub mod redis_manager;
pub mod runner;
pub mod sandbox;
