// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::{hash::Hash, transaction::Transaction};
use serde::{Deserialize, Serialize};

/// Per-transaction execution result.
///
/// Receipts chain through storage roots: the first receipt starts from the
/// block's `initial_storage`, each subsequent receipt starts from its
/// predecessor's `final_storage`, and the last receipt's `final_storage` is
/// the block's.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// 0 on success; any other value marks the transaction as failed.
    pub status: u32,
    pub initial_storage: Hash,
    pub final_storage: Hash,
    pub logs: Vec<String>,
    pub debug: Option<String>,
}

impl Receipt {
    pub fn is_ok(&self) -> bool {
        self.status == 0
    }
}

/// A numbered block of transactions and the storage transition they effected.
///
/// An open (draft) block has `final_storage == initial_storage` and no
/// receipts; processing fills both in. Genesis is block 0 with no parent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub block_number: u64,
    pub parent_block_hash: Option<Hash>,
    pub initial_storage: Hash,
    pub final_storage: Hash,
    pub transactions: Vec<Transaction>,
    pub receipts: Vec<Receipt>,
}

impl Block {
    pub fn genesis(empty_root: Hash) -> Self {
        Self {
            block_number: 0,
            parent_block_hash: None,
            initial_storage: empty_root.clone(),
            final_storage: empty_root,
            transactions: vec![],
            receipts: vec![],
        }
    }

    /// An unprocessed draft on top of a saved parent. `final_storage` mirrors
    /// `initial_storage` until the processor runs.
    pub fn open(
        block_number: u64,
        parent_block_hash: Hash,
        initial_storage: Hash,
        transactions: Vec<Transaction>,
    ) -> Self {
        Self {
            block_number,
            parent_block_hash: Some(parent_block_hash),
            initial_storage: initial_storage.clone(),
            final_storage: initial_storage,
            transactions,
            receipts: vec![],
        }
    }
}
