//! Preflight - environment diagnostics before you start work.
//!
//! Preflight answers one question quickly: is this machine ready to work
//! on this project? It probes the things a development session depends on
//! (forges, package mirrors, installed tooling) using a configurable
//! multi-strategy detection engine, and reports what is broken and what
//! merely degraded.
//!
//! # Architecture
//!
//! - [`config`] - Layered configuration: defaults, project files, profiles
//! - [`engine`] - Strategy chains, group evaluation, and run coordination
//! - [`probes`] - Built-in detection strategies (HTTP, git, command)
//! - [`report`] - Report assembly and rendering
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod probes;
pub mod report;

pub use error::{PreflightError, Result};
