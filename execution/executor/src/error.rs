// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

use daisy_crypto::CryptoError;
use daisy_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// A block tree or queue entry that does not decode back into its type.
    #[error("malformed block data: {0}")]
    Serialization(String),
    /// A transaction whose signature does not verify. Aborts the block.
    #[error("transaction rejected: {0}")]
    SignatureRejected(#[from] CryptoError),
    /// A follower candidate disagreeing with local re-execution.
    #[error("chain mismatch on {}", fields.join(", "))]
    ChainMismatch { fields: Vec<&'static str> },
    /// A follower candidate older than the accepted head.
    #[error("candidate block {candidate} is behind the current head {current}")]
    StaleCandidate { current: u64, candidate: u64 },
    /// A parent in the candidate chain that the store cannot produce.
    #[error("missing parent of block {block_number}")]
    MissingParent { block_number: u64 },
    /// The pluggable VM failed hard; the block is abandoned unchanged.
    #[error("vm failure: {0}")]
    Vm(String),
}

pub(crate) fn malformed(message: impl Into<String>) -> ExecutorError {
    ExecutorError::Serialization(message.into())
}
