//! CLI command implementations
//!
//! Each invocation loads the config, opens the file store (replaying the
//! commit log), runs one operation against one tree and prints one JSON
//! response.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::mutation::MutationReceipt;
use crate::nested_set::{NestedSet, TreeConfig};
use crate::node::{NodeId, NodeView};
use crate::observability::{log_event, Event, Logger, Severity};
use crate::store::{FileRowStore, RowStore, LOG_FILE};

use super::args::{Command, Target};
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Data directory (required)
    pub data_dir: String,

    /// Minimum log severity: trace, info, warn, error, fatal (default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub tree: TreeConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.data_dir.trim().is_empty() {
            return Err(CliError::config_error("data_dir must not be empty"));
        }
        self.severity()?;
        self.tree
            .validate()
            .map_err(|e| CliError::config_error(e.to_string()))?;
        Ok(())
    }

    pub fn severity(&self) -> CliResult<Severity> {
        match self.log_level.as_str() {
            "trace" => Ok(Severity::Trace),
            "info" => Ok(Severity::Info),
            "warn" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            "fatal" => Ok(Severity::Fatal),
            other => Err(CliError::config_error(format!(
                "Invalid log_level: '{}'. Must be one of trace, info, warn, error, fatal.",
                other
            ))),
        }
    }

    pub fn data_path(&self) -> &Path {
        Path::new(&self.data_dir)
    }
}

/// Main CLI entry point; prints the response and returns the error, if any.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    match execute(cli.command) {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code(), &e.to_string())?;
            Err(e)
        }
    }
}

/// Run one command and return its response payload
pub fn execute(cmd: Command) -> CliResult<Value> {
    let config = load_config(cmd.target())?;

    if let Command::Init { .. } = cmd {
        return init(&config);
    }

    let set = open(&config, cmd.target())?;
    match cmd {
        Command::Init { .. } => init(&config),
        Command::CreateRoot { id, .. } => {
            let receipt = set.create_root(node_id(id))?;
            receipt_json(&set, &receipt)
        }
        Command::InsertChild { parent, id, .. } => {
            let receipt = set.insert_last_child_of(node_id(id), &NodeId::from(parent))?;
            receipt_json(&set, &receipt)
        }
        Command::InsertAfter { sibling, id, .. } => {
            let receipt = set.insert_next_sibling_of(node_id(id), &NodeId::from(sibling))?;
            receipt_json(&set, &receipt)
        }
        Command::InsertBefore { sibling, id, .. } => {
            let receipt = set.insert_prev_sibling_of(node_id(id), &NodeId::from(sibling))?;
            receipt_json(&set, &receipt)
        }
        Command::Move { node, parent, .. } => {
            let receipt = set.move_as_child_of(&NodeId::from(node), &NodeId::from(parent))?;
            receipt_json(&set, &receipt)
        }
        Command::Remove { node, .. } => {
            let receipt = set.remove_subtree(&NodeId::from(node))?;
            Ok(json!({
                "removed": receipt.node.id,
                "revision": receipt.revision,
                "rows_written": receipt.rows_written,
            }))
        }
        Command::Show { node: Some(node), .. } => {
            Ok(serde_json::to_value(set.describe(&NodeId::from(node))?)?)
        }
        Command::Show { node: None, .. } => {
            let nodes = set.describe_all()?;
            Ok(json!({
                "tree": set.tree(),
                "revision": set.revision()?,
                "nodes": nodes,
            }))
        }
        Command::Verify { .. } => {
            let count = set.verify()?;
            Ok(json!({
                "tree": set.tree(),
                "revision": set.revision()?,
                "nodes": count,
                "valid": true,
            }))
        }
    }
}

fn load_config(target: &Target) -> CliResult<Config> {
    let config = Config::load(&target.config)?;
    Logger::set_min_severity(config.severity()?);
    log_event(Event::ConfigLoaded, &[("data_dir", config.data_dir.as_str())]);
    Ok(config)
}

/// Create the data directory; refuses to touch an initialized one.
fn init(config: &Config) -> CliResult<Value> {
    let data_dir = config.data_path();
    if is_initialized(data_dir) {
        return Err(CliError::AlreadyInitialized(data_dir.display().to_string()));
    }

    let data_subdir = data_dir.join("data");
    fs::create_dir_all(&data_subdir).map_err(|e| {
        CliError::io_error(format!(
            "Failed to create directory {}: {}",
            data_subdir.display(),
            e
        ))
    })?;
    fs::File::create(data_subdir.join(LOG_FILE))?;

    Ok(json!({ "data_dir": config.data_dir }))
}

fn is_initialized(data_dir: &Path) -> bool {
    data_dir.join("data").join(LOG_FILE).exists()
}

fn open(config: &Config, target: &Target) -> CliResult<NestedSet<FileRowStore>> {
    let data_dir = config.data_path();
    if !is_initialized(data_dir) {
        return Err(CliError::NotInitialized(data_dir.display().to_string()));
    }
    let store = FileRowStore::open(data_dir)?;
    let set = NestedSet::open(Arc::new(store), target.tree.as_str(), config.tree.clone())?;
    Ok(set)
}

fn node_id(id: Option<String>) -> NodeId {
    id.map(NodeId::from).unwrap_or_else(NodeId::generate)
}

fn receipt_json<S: RowStore>(set: &NestedSet<S>, receipt: &MutationReceipt) -> CliResult<Value> {
    let parent = set.parent_id_of(&receipt.node.id)?;
    Ok(json!({
        "node": NodeView::new(&receipt.node, parent),
        "revision": receipt.revision,
        "rows_written": receipt.rows_written,
    }))
}
