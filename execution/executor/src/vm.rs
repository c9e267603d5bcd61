// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

//! The pluggable VM seams.
//!
//! The core never interprets invocations itself: a [`Runner`] executes them
//! during block processing and a [`Reader`] answers queries without writing.
//! Implementations are chosen at startup and handed to the tracker.

use crate::error::ExecutorError;
use async_trait::async_trait;
use daisy_storage::Storage;
use daisy_types::{Hash, Invocation};

/// What one invocation did: the root it produced plus the receipt fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunOutcome {
    /// 0 on success; any other value records a failed transaction.
    pub status: u32,
    pub final_storage: Hash,
    pub logs: Vec<String>,
    pub debug: Option<String>,
}

impl RunOutcome {
    pub fn ok(final_storage: Hash) -> Self {
        Self {
            status: 0,
            final_storage,
            logs: vec![],
            debug: None,
        }
    }

    pub fn failed(status: u32, unchanged_storage: Hash, debug: impl Into<String>) -> Self {
        Self {
            status,
            final_storage: unchanged_storage,
            logs: vec![],
            debug: Some(debug.into()),
        }
    }

    pub fn with_log(mut self, log: impl Into<String>) -> Self {
        self.logs.push(log.into());
        self
    }
}

#[async_trait]
pub trait Runner: Send + Sync + std::fmt::Debug {
    /// Executes one invocation against `initial_storage` on behalf of
    /// `caller` (a verified public key or a trusted system owner).
    ///
    /// A failed transaction is an `Ok` outcome with a non-zero status; an
    /// `Err` aborts the whole block.
    async fn run(
        &self,
        invocation: &Invocation,
        storage: &Storage,
        initial_storage: &Hash,
        block_number: u64,
        caller: &[u8],
    ) -> Result<RunOutcome, ExecutorError>;
}

#[async_trait]
pub trait Reader: Send + Sync + std::fmt::Debug {
    /// Answers a read-only query against `root`.
    async fn read(
        &self,
        function: &str,
        args: &[String],
        storage: &Storage,
        root: &Hash,
    ) -> Result<serde_json::Value, ExecutorError>;
}
