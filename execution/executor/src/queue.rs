// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

//! The deferred-transaction queue.
//!
//! A VM may schedule work for a future block: entries live at
//! `/transaction_queue/<block_number>/<seq>` inside the state tree itself,
//! so they travel with the storage root and are drained deterministically
//! when the block with that number is built.

use crate::error::{malformed, ExecutorError};
use daisy_storage::{Storage, StorageError, Value};
use daisy_types::{Hash, Invocation, Transaction};
use serde::{Deserialize, Serialize};
use tracing::debug;

const QUEUE_PREFIX: &str = "transaction_queue";

/// Flat wire form of a queued transaction. No `_link` references: each entry
/// is one self-contained blob.
#[derive(Serialize, Deserialize)]
struct QueuedEntry {
    function: String,
    args: Vec<String>,
    owner: String,
}

/// Appends `invocation` to the queue for `block_number`, owned by `owner`.
/// Sequence numbers are 1-based and local to the block number.
pub async fn schedule(
    storage: &Storage,
    root: &Hash,
    block_number: u64,
    owner: &[u8],
    invocation: &Invocation,
) -> Result<Hash, ExecutorError> {
    let dir = format!("{QUEUE_PREFIX}/{block_number}");
    let next_seq = storage.ls(root, &dir).await?.len() + 1;
    let entry = QueuedEntry {
        function: invocation.function.clone(),
        args: invocation.args.clone(),
        owner: bs58::encode(owner).into_string(),
    };
    let bytes = serde_json::to_vec(&entry)
        .map_err(|err| malformed(format!("unencodable queue entry: {err}")))?;
    debug!(block_number, seq = next_seq, function = %invocation.function, "queueing transaction");
    Ok(storage
        .put(root, &format!("{dir}/{next_seq}"), bytes)
        .await?)
}

/// All transactions queued for `block_number` in ascending sequence order.
/// An absent queue directory is an empty queue.
pub async fn drain_for_block(
    storage: &Storage,
    root: &Hash,
    block_number: u64,
) -> Result<Vec<Transaction>, ExecutorError> {
    let dir = format!("{QUEUE_PREFIX}/{block_number}");
    let tree = match storage.get_all(root, &dir).await {
        Ok(tree) => tree,
        Err(StorageError::NotFound) => return Ok(vec![]),
        Err(err) => return Err(err.into()),
    };
    let map = tree
        .as_tree()
        .ok_or_else(|| malformed("transaction queue is not a tree"))?;
    let mut entries = map
        .iter()
        .map(|(key, value)| {
            key.parse::<u64>()
                .map(|seq| (seq, value))
                .map_err(|_| malformed(format!("non-numeric queue sequence {key:?}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|(seq, _)| *seq);
    entries
        .into_iter()
        .map(|(_, value)| parse_entry(value))
        .collect()
}

fn parse_entry(value: &Value) -> Result<Transaction, ExecutorError> {
    let bytes = value
        .as_bytes()
        .ok_or_else(|| malformed("queue entry is not a leaf"))?;
    let entry: QueuedEntry = serde_json::from_slice(bytes)
        .map_err(|err| malformed(format!("undecodable queue entry: {err}")))?;
    let owner = bs58::decode(&entry.owner)
        .into_vec()
        .map_err(|_| malformed("queue entry owner is not base58"))?;
    Ok(Transaction::system(
        Invocation::new(entry.function, entry.args),
        owner,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use daisy_storage::InMemoryDag;
    use std::sync::Arc;

    fn storage() -> Storage {
        Storage::new(Arc::new(InMemoryDag::new()))
    }

    #[tokio::test]
    async fn draining_an_empty_queue_yields_nothing() {
        let storage = storage();
        let root = storage.empty_root().await.unwrap();
        assert_eq!(
            drain_for_block(&storage, &root, 4).await.unwrap(),
            vec![]
        );
    }

    #[tokio::test]
    async fn entries_come_back_in_sequence_order_with_their_owner() {
        let storage = storage();
        let mut root = storage.empty_root().await.unwrap();
        for (owner, arg) in [(vec![0x01], "10"), (vec![0x02], "20")] {
            root = schedule(
                &storage,
                &root,
                5,
                &owner,
                &Invocation::new("spawn", vec![arg.to_string()]),
            )
            .await
            .unwrap();
        }

        let drained = drain_for_block(&storage, &root, 5).await.unwrap();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].owner(), Some(&[0x01][..]));
        assert_eq!(drained[0].invocation, Invocation::new("spawn", vec!["10".into()]));
        assert_eq!(drained[1].owner(), Some(&[0x02][..]));
    }

    #[tokio::test]
    async fn queues_for_different_blocks_are_independent() {
        let storage = storage();
        let root = storage.empty_root().await.unwrap();
        let root = schedule(&storage, &root, 5, &[0x01], &Invocation::new("a", vec![]))
            .await
            .unwrap();
        let root = schedule(&storage, &root, 6, &[0x01], &Invocation::new("b", vec![]))
            .await
            .unwrap();

        let at_five = drain_for_block(&storage, &root, 5).await.unwrap();
        let at_six = drain_for_block(&storage, &root, 6).await.unwrap();
        assert_eq!(at_five[0].invocation.function, "a");
        assert_eq!(at_six[0].invocation.function, "b");
    }
}
