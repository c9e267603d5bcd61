// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

use daisy_config::Mode;
use daisy_executor::ExecutorError;
use daisy_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// A leader-only operation in follower mode, or the reverse.
    #[error("operation requires {required} mode but the node runs as {actual}")]
    WrongMode { required: Mode, actual: Mode },
    #[error(transparent)]
    Executor(#[from] ExecutorError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The actor behind this handle has stopped.
    #[error("component is gone")]
    ChannelClosed,
    /// The actor did not answer within the client deadline; the actor
    /// itself keeps running.
    #[error("call timed out")]
    Timeout,
}

impl TrackerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TrackerError::Storage(StorageError::NotFound))
    }
}
