//! Command-line interface for playlist-ripper.
//!
//! Ripping a playlist is the default action; `check-tools` and `verify`
//! are maintenance subcommands.

mod commands;

pub use commands::{Cli, Commands, run_command};
