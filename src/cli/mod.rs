//! Command-line interface
//!
//! - init: create the data directory
//! - create-root, insert-child, insert-after, insert-before: place nodes
//! - move, remove: restructure
//! - show, verify: inspect

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, Target};
pub use commands::{execute, run, Config};
pub use errors::{CliError, CliResult};
pub use io::{write_error, write_response};
