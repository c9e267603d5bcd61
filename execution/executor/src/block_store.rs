// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

//! Field-level access to saved blocks.
//!
//! A saved block is a storage tree; its hash is the block hash. These
//! helpers read single fields without materializing the whole block, plus
//! load and deserialize a complete one.

use crate::{
    error::{malformed, ExecutorError},
    serializer::BlockSerializer,
};
use daisy_storage::{Storage, StorageError, LINK_SUFFIX};
use daisy_types::{Block, Hash};

pub async fn block_number_at(storage: &Storage, block_hash: &Hash) -> Result<u64, ExecutorError> {
    let bytes = storage.get(block_hash, "block_number").await?;
    std::str::from_utf8(&bytes)
        .ok()
        .and_then(|text| text.parse::<u64>().ok())
        .ok_or_else(|| malformed("block_number is not a decimal integer"))
}

/// The storage root the block finished on, read through its `_link`
/// reference.
pub async fn final_storage_at(storage: &Storage, block_hash: &Hash) -> Result<Hash, ExecutorError> {
    Ok(storage
        .get_hash(block_hash, &format!("final_storage{LINK_SUFFIX}"))
        .await?)
}

/// The parent block hash, or `None` for genesis.
pub async fn parent_hash_at(
    storage: &Storage,
    block_hash: &Hash,
) -> Result<Option<Hash>, ExecutorError> {
    match storage
        .get_hash(block_hash, &format!("parent_block_hash{LINK_SUFFIX}"))
        .await
    {
        Ok(parent) => Ok(Some(parent)),
        Err(StorageError::NotFound) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Fetches and deserializes the whole block at `block_hash`.
pub async fn load_block(
    storage: &Storage,
    serializer: &dyn BlockSerializer,
    block_hash: &Hash,
) -> Result<Block, ExecutorError> {
    let tree = storage.get_all(block_hash, "").await?;
    serializer.deserialize(&tree)
}
