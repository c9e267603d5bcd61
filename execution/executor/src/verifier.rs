// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

//! Follower-side chain verification.
//!
//! A candidate head is accepted only if local re-execution reproduces it
//! exactly, block by block, down to the currently accepted head. Any
//! disagreement, on any field, is a hard reject.

use crate::{
    block_store,
    error::ExecutorError,
    processor,
    serializer::BlockSerializer,
    vm::Runner,
};
use daisy_storage::{Storage, StorageError};
use daisy_types::Block;
use tracing::debug;

/// Verifies `candidate` against `current` (the accepted head). On success
/// the candidate is returned for adoption, exactly as received.
pub async fn verify_chain(
    current: &Block,
    candidate: Block,
    storage: &Storage,
    runner: &dyn Runner,
    serializer: &dyn BlockSerializer,
) -> Result<Block, ExecutorError> {
    if candidate.block_number < current.block_number {
        return Err(ExecutorError::StaleCandidate {
            current: current.block_number,
            candidate: candidate.block_number,
        });
    }

    let mut cursor = candidate.clone();
    loop {
        if cursor.block_number == current.block_number {
            compare_blocks(current, &cursor)?;
            return Ok(candidate);
        }
        debug!(block_number = cursor.block_number, "re-executing candidate block");

        // Strip the claimed outcome and recompute it locally.
        let mut replay = cursor.clone();
        replay.receipts.clear();
        replay.final_storage = replay.initial_storage.clone();
        let recomputed = processor::process(&replay, storage, runner).await?;
        compare_blocks(&recomputed, &cursor)?;

        let parent_hash = match &cursor.parent_block_hash {
            Some(parent_hash) => parent_hash.clone(),
            None => {
                return Err(ExecutorError::MissingParent {
                    block_number: cursor.block_number,
                })
            },
        };
        cursor = block_store::load_block(storage, serializer, &parent_hash)
            .await
            .map_err(|err| match err {
                ExecutorError::Storage(StorageError::NotFound) => ExecutorError::MissingParent {
                    block_number: cursor.block_number,
                },
                other => other,
            })?;
    }
}

/// Field-by-field equality, reporting every field that differs.
fn compare_blocks(expected: &Block, actual: &Block) -> Result<(), ExecutorError> {
    let mut fields = vec![];
    if expected.block_number != actual.block_number {
        fields.push("block_number");
    }
    if expected.parent_block_hash != actual.parent_block_hash {
        fields.push("parent_block_hash");
    }
    if expected.initial_storage != actual.initial_storage {
        fields.push("initial_storage");
    }
    if expected.final_storage != actual.final_storage {
        fields.push("final_storage");
    }
    if expected.transactions != actual.transactions {
        fields.push("transactions");
    }
    if expected.receipts != actual.receipts {
        fields.push("receipts");
    }
    if fields.is_empty() {
        Ok(())
    } else {
        Err(ExecutorError::ChainMismatch { fields })
    }
}
