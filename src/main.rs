//! nestedset CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`, which prints the JSON
//! response. Exits non-zero on failure.

use nestedset::cli;

fn main() {
    if cli::run().is_err() {
        std::process::exit(1);
    }
}
