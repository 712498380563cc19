#![forbid(unsafe_code)]

//! Command-line host for Beadloom.
//!
//! Each invocation opens the design store over a state directory, runs one
//! command against it, and shuts the store down. Every mutation is saved by
//! the store itself; the CLI only reports what it did.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;

pub use cli::{Cli, Command, run, run_from_env};
pub use error::{CliError, Result};
