// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

//! The block pipeline.
//!
//! Blocks are built from the deferred-transaction queue plus leader-accepted
//! transactions, executed left-to-right against an immutable starting root,
//! serialized into a storage tree whose root hash becomes the block hash,
//! and re-verified by followers through deterministic re-execution.

pub mod block_store;
pub mod builder;
pub mod error;
pub mod processor;
pub mod queue;
pub mod serializer;
pub mod verifier;
pub mod vm;

#[cfg(any(test, feature = "testing"))]
pub mod test_utils;

#[cfg(test)]
mod tests;

pub use error::ExecutorError;
pub use serializer::{BlockSerializer, TreeSerializer};
pub use vm::{Reader, RunOutcome, Runner};
