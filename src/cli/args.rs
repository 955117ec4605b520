//! CLI argument definitions using clap
//!
//! Every command takes `--config <path>` and `--tree <id>`; commands that
//! place a node accept `--id` and generate a UUID when it is omitted.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// nestedset - nested-set tree storage
#[derive(Parser, Debug)]
#[command(name = "nestedset")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Where to find the store and which scope to act on
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Path to configuration file
    #[arg(long, default_value = "./nestedset.json")]
    pub config: PathBuf,

    /// Tree (scope) id
    #[arg(long, default_value = "default")]
    pub tree: String,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Initialize a new data directory
    Init {
        #[command(flatten)]
        target: Target,
    },

    /// Place the root of an empty tree
    CreateRoot {
        #[command(flatten)]
        target: Target,
        /// Node id (generated if omitted)
        #[arg(long)]
        id: Option<String>,
    },

    /// Insert a node as the last child of a parent
    InsertChild {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        parent: String,
        #[arg(long)]
        id: Option<String>,
    },

    /// Insert a node right after a sibling
    InsertAfter {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        sibling: String,
        #[arg(long)]
        id: Option<String>,
    },

    /// Insert a node right before a sibling
    InsertBefore {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        sibling: String,
        #[arg(long)]
        id: Option<String>,
    },

    /// Move a subtree under a new parent, as its last child
    Move {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        node: String,
        #[arg(long)]
        parent: String,
    },

    /// Remove a subtree
    Remove {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        node: String,
    },

    /// Print one node, or the whole tree in preorder
    Show {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        node: Option<String>,
    },

    /// Check every structural invariant of a tree
    Verify {
        #[command(flatten)]
        target: Target,
    },
}

impl Command {
    pub fn target(&self) -> &Target {
        match self {
            Command::Init { target }
            | Command::CreateRoot { target, .. }
            | Command::InsertChild { target, .. }
            | Command::InsertAfter { target, .. }
            | Command::InsertBefore { target, .. }
            | Command::Move { target, .. }
            | Command::Remove { target, .. }
            | Command::Show { target, .. }
            | Command::Verify { target } => target,
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_insert_child() {
        let cli = Cli::try_parse_from([
            "nestedset",
            "insert-child",
            "--tree",
            "menu",
            "--parent",
            "r",
            "--id",
            "a",
        ])
        .unwrap();
        match cli.command {
            Command::InsertChild { target, parent, id } => {
                assert_eq!(target.tree, "menu");
                assert_eq!(target.config, PathBuf::from("./nestedset.json"));
                assert_eq!(parent, "r");
                assert_eq!(id.as_deref(), Some("a"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["nestedset", "verify"]).unwrap();
        assert_eq!(cli.command.target().tree, "default");
    }

    #[test]
    fn test_move_requires_parent() {
        assert!(Cli::try_parse_from(["nestedset", "move", "--node", "a"]).is_err());
    }
}
