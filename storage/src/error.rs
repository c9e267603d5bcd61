// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

use daisy_types::wire::WireError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Path or name absent. Non-fatal; callers decide.
    #[error("not found")]
    NotFound,
    /// `put_new` hit an occupied path.
    #[error("file exists")]
    FileExists,
    /// Malformed node, link or wire data.
    #[error("protocol violation: {0}")]
    Protocol(String),
    #[error("wire decoding failed: {0}")]
    Wire(#[from] WireError),
    /// Object-store or name-service I/O failure. Retryable by loops.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::Transport(err.to_string())
    }
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound)
    }
}
