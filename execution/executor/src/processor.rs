// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

//! Block execution.
//!
//! Transactions run left-to-right: each starts from the storage root the
//! previous one produced and yields a receipt. Signature verification
//! happens here, before the VM sees the invocation; a bad signature aborts
//! the whole block so every replica fails it identically.

use crate::{
    error::ExecutorError,
    serializer::BlockSerializer,
    vm::{RunOutcome, Runner},
};
use daisy_storage::Storage;
use daisy_types::{Block, Hash, Receipt, Transaction, TransactionAuth};
use tracing::{debug, warn};

/// Executes every transaction in `block`, filling in receipts and
/// `final_storage`. The input block is not consumed; processing a draft
/// twice from the same state is deterministic.
pub async fn process(
    block: &Block,
    storage: &Storage,
    runner: &dyn Runner,
) -> Result<Block, ExecutorError> {
    let mut processed = block.clone();
    processed.receipts = Vec::with_capacity(block.transactions.len());
    let mut current_root = block.initial_storage.clone();

    for transaction in &block.transactions {
        let receipt = execute_transaction(
            runner,
            storage,
            &current_root,
            block.block_number,
            transaction,
        )
        .await?;
        if !receipt.is_ok() {
            warn!(
                block_number = block.block_number,
                function = %transaction.invocation.function,
                status = receipt.status,
                "transaction failed"
            );
        }
        current_root = receipt.final_storage.clone();
        processed.receipts.push(receipt);
    }

    processed.final_storage = current_root;
    Ok(processed)
}

/// Runs a single transaction: authenticates it, hands it to the VM, shapes
/// the outcome into a receipt starting from `initial_storage`.
async fn execute_transaction(
    runner: &dyn Runner,
    storage: &Storage,
    initial_storage: &Hash,
    block_number: u64,
    transaction: &Transaction,
) -> Result<Receipt, ExecutorError> {
    let caller = match &transaction.auth {
        TransactionAuth::Signed(bundle) => {
            daisy_crypto::verify(&transaction.invocation.signing_bytes(), bundle)?
        },
        TransactionAuth::Owned(owner) => owner.clone(),
    };
    debug!(
        block_number,
        function = %transaction.invocation.function,
        "running transaction"
    );
    let RunOutcome {
        status,
        final_storage,
        logs,
        debug,
    } = runner
        .run(
            &transaction.invocation,
            storage,
            initial_storage,
            block_number,
            &caller,
        )
        .await?;
    Ok(Receipt {
        status,
        initial_storage: initial_storage.clone(),
        final_storage,
        logs,
        debug,
    })
}

/// Serializes a processed block into a fresh storage tree; the resulting
/// root hash is the block hash.
pub async fn save(
    block: &Block,
    storage: &Storage,
    serializer: &dyn BlockSerializer,
) -> Result<Hash, ExecutorError> {
    let tree = serializer.serialize(block)?;
    let root = storage.empty_root().await?;
    Ok(storage.put_all(&root, &tree).await?)
}
