//! Command-line interface for Preflight.
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`run`] - Diagnostic run command
//! - [`list`] - Configuration inventory command

pub mod args;
pub mod list;
pub mod run;

pub use args::{Cli, Commands, ListArgs, OutputFormat, RunArgs};
pub use list::ListCommand;
pub use run::RunCommand;

/// Outcome of a command execution, carried to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandResult {
    pub success: bool,
    pub exit_code: u8,
}

impl CommandResult {
    /// A successful result with exit code 0.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// A failed result with the given exit code.
    pub fn failure(exit_code: u8) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}
