// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

//! Node configuration: an immutable struct loaded once at startup and
//! threaded through constructors. YAML on disk, every field defaulted.

use serde::{Deserialize, Serialize};
use std::{fmt, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which side of the protocol this node plays. Derived from the
/// `run_leader` / `run_follower` flags; a node can be neither (api-only)
/// but never both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Leader,
    Follower,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Leader => f.write_str("leader"),
            Mode::Follower => f.write_str("follower"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiScheme {
    Http,
    Https,
}

/// Where the tracker's first block comes from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialBlockReference {
    /// Start a fresh chain from block 0.
    Genesis,
    /// Resolve the mutable name and load whatever it points at.
    Resolve,
    /// Load a specific saved block.
    BlockHash(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    pub run_api: bool,
    pub run_leader: bool,
    pub run_follower: bool,
    pub api_port: u16,
    pub api_scheme: ApiScheme,
    /// Registry identifier of the transaction runner implementation.
    pub runner: String,
    /// Registry identifier of the read-path implementation.
    pub reader: String,
    /// Registry identifier of the block serialization scheme.
    pub serializer: String,
    /// Base URL of the MerkleDAG daemon API.
    pub dag_api_url: String,
    /// Mutable-name key under which the chain head is published.
    pub ipfs_key: String,
    pub initial_block_reference: InitialBlockReference,
    pub mining_interval_ms: u64,
    pub pulling_interval_ms: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            run_api: false,
            run_leader: false,
            run_follower: false,
            api_port: 2335,
            api_scheme: ApiScheme::Http,
            runner: "kv".to_string(),
            reader: "kv".to_string(),
            serializer: "tree".to_string(),
            dag_api_url: "http://127.0.0.1:5001".to_string(),
            ipfs_key: "self".to_string(),
            initial_block_reference: InitialBlockReference::Genesis,
            mining_interval_ms: 10_000,
            pulling_interval_ms: 10_000,
        }
    }
}

impl NodeConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: NodeConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run_leader && self.run_follower {
            return Err(ConfigError::Invalid(
                "run_leader and run_follower are mutually exclusive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn mode(&self) -> Option<Mode> {
        if self.run_leader {
            Some(Mode::Leader)
        } else if self.run_follower {
            Some(Mode::Follower)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_err, assert_ok};

    #[test]
    fn defaults_match_the_documented_values() {
        let config = NodeConfig::default();
        assert!(!config.run_api);
        assert_eq!(config.api_port, 2335);
        assert_eq!(config.api_scheme, ApiScheme::Http);
        assert_eq!(config.mining_interval_ms, 10_000);
        assert_eq!(config.pulling_interval_ms, 10_000);
        assert_eq!(
            config.initial_block_reference,
            InitialBlockReference::Genesis
        );
        assert_eq!(config.mode(), None);
        assert_ok!(config.validate());
    }

    #[test]
    fn leader_and_follower_are_mutually_exclusive() {
        let config = NodeConfig {
            run_leader: true,
            run_follower: true,
            ..NodeConfig::default()
        };
        assert_err!(config.validate());
    }

    #[test]
    fn mode_follows_the_role_flags() {
        let leader = NodeConfig {
            run_leader: true,
            ..NodeConfig::default()
        };
        assert_eq!(leader.mode(), Some(Mode::Leader));
        let follower = NodeConfig {
            run_follower: true,
            ..NodeConfig::default()
        };
        assert_eq!(follower.mode(), Some(Mode::Follower));
    }

    #[test]
    fn parses_a_partial_yaml_config() {
        let config: NodeConfig = serde_yaml::from_str(
            "run_follower: true\npulling_interval_ms: 500\ninitial_block_reference: resolve\n",
        )
        .unwrap();
        assert!(config.run_follower);
        assert_eq!(config.pulling_interval_ms, 500);
        assert_eq!(
            config.initial_block_reference,
            InitialBlockReference::Resolve
        );
        // Untouched fields keep their defaults.
        assert_eq!(config.api_port, 2335);
    }

    #[test]
    fn parses_an_explicit_block_hash_reference() {
        let config: NodeConfig = serde_yaml::from_str(
            "initial_block_reference:\n  block_hash: QmHead\n",
        )
        .unwrap();
        assert_eq!(
            config.initial_block_reference,
            InitialBlockReference::BlockHash("QmHead".to_string())
        );
    }

    #[test]
    fn rejects_unknown_fields() {
        let result: Result<NodeConfig, _> = serde_yaml::from_str("mining_interval: 5\n");
        assert_err!(result);
    }
}
