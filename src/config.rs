//! Runtime configuration
//!
//! Loaded from an optional JSON file; any field left out keeps its default.

use crate::error::{NestKvError, Result};
use crate::store::CommitPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// nestkv configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serve over TCP on this address instead of the console
    pub listen_addr: Option<String>,
    pub max_connections: usize,
    /// Console prompt
    pub prompt: String,
    pub commit_policy: CommitPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: None,
            max_connections: 1000,
            prompt: ">> ".to_string(),
            commit_policy: CommitPolicy::default(),
        }
    }
}

impl Config {
    /// Read a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(NestKvError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
