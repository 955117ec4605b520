//! Engine configuration
//!
//! Loaded from JSON; every field has a default so `{}` is a valid config.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{TreeError, TreeResult};

/// Upper bound on whole-operation retries after a conflict
pub const MAX_CONFLICT_RETRIES: u32 = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TreeConfig {
    /// How many times a mutation that lost a conflict is re-run from scratch
    #[serde(default)]
    pub conflict_retries: u32,

    /// Run the invariant checker over the scope after every commit
    #[serde(default)]
    pub verify_after_mutation: bool,

    /// Run the invariant checker when the engine is opened
    #[serde(default = "default_verify_on_open")]
    pub verify_on_open: bool,
}

fn default_verify_on_open() -> bool {
    true
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            conflict_retries: 0,
            verify_after_mutation: false,
            verify_on_open: default_verify_on_open(),
        }
    }
}

impl TreeConfig {
    pub fn from_json(content: &str) -> TreeResult<Self> {
        let config: TreeConfig = serde_json::from_str(content)
            .map_err(|e| TreeError::Config(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> TreeResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            TreeError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn validate(&self) -> TreeResult<()> {
        if self.conflict_retries > MAX_CONFLICT_RETRIES {
            return Err(TreeError::Config(format!(
                "conflict_retries must be <= {}, got {}",
                MAX_CONFLICT_RETRIES, self.conflict_retries
            )));
        }
        Ok(())
    }

    pub fn with_conflict_retries(mut self, retries: u32) -> Self {
        self.conflict_retries = retries;
        self
    }

    pub fn with_verify_after_mutation(mut self, enabled: bool) -> Self {
        self.verify_after_mutation = enabled;
        self
    }

    pub fn with_verify_on_open(mut self, enabled: bool) -> Self {
        self.verify_on_open = enabled;
        self
    }
}
