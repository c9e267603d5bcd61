// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

//! Block construction.

use crate::{block_store, error::ExecutorError, queue};
use daisy_storage::Storage;
use daisy_types::{Block, Hash, Transaction};
use tracing::debug;

/// The genesis block: number 0, no parent, empty root on both sides.
pub async fn genesis(storage: &Storage) -> Result<Block, ExecutorError> {
    Ok(Block::genesis(storage.empty_root().await?))
}

/// An open block on top of a saved parent. Its transactions are the parent
/// state's deferred queue for the new number (in enqueue order) followed by
/// `extra_transactions`.
pub async fn build_next(
    storage: &Storage,
    parent_hash: &Hash,
    extra_transactions: Vec<Transaction>,
) -> Result<Block, ExecutorError> {
    let parent_number = block_store::block_number_at(storage, parent_hash).await?;
    let parent_final = block_store::final_storage_at(storage, parent_hash).await?;
    let block_number = parent_number + 1;

    let mut transactions = queue::drain_for_block(storage, &parent_final, block_number).await?;
    debug!(
        block_number,
        queued = transactions.len(),
        extra = extra_transactions.len(),
        "building block"
    );
    transactions.extend(extra_transactions);

    Ok(Block::open(
        block_number,
        parent_hash.clone(),
        parent_final,
        transactions,
    ))
}
