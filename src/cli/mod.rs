//! # Command-Line Interface
//!
//! The `binop` binary: discovers plugin packages and runs them.
//!
//! ## Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `run [LHS] [RHS]` | Invoke every plugin (default command, operands 10 and 50) |
//! | `list` | Show registered plugins |
//! | `inspect PACKAGE` | Load one package and report the outcome |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug logging:
//! ```bash
//! binop --verbose run 3 4
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod plugin_cmd;
mod run_cmd;

pub use app::{execute, run, Cli, Commands, DEFAULT_LHS, DEFAULT_RHS};
pub use output::{Output, OutputFormat};
