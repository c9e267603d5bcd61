// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

//! Block ↔ storage-tree serialization.
//!
//! The canonical scheme writes block fields at the tree root: numbers as
//! decimal strings, storage roots as `_link` references, ordered lists as
//! mappings keyed by decimal index. Byte fields (signatures, keys, owners)
//! are base58 strings. The mapping is bijective; deserialization sorts index
//! keys numerically and rejects transactions that do not carry exactly one
//! of signature or owner.

use crate::error::{malformed, ExecutorError};
use daisy_storage::Value;
use daisy_types::{
    Block, Hash, Invocation, Receipt, SignatureBundle, Transaction, TransactionAuth,
};
use std::collections::BTreeMap;

/// Strategy seam for the block encoding; the tree scheme below is the one
/// provided implementation.
pub trait BlockSerializer: Send + Sync + std::fmt::Debug {
    fn serialize(&self, block: &Block) -> Result<Value, ExecutorError>;
    fn deserialize(&self, tree: &Value) -> Result<Block, ExecutorError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TreeSerializer;

impl TreeSerializer {
    pub fn new() -> Self {
        Self
    }
}

impl BlockSerializer for TreeSerializer {
    fn serialize(&self, block: &Block) -> Result<Value, ExecutorError> {
        let mut map = BTreeMap::new();
        map.insert(
            "block_number".to_string(),
            Value::string(block.block_number.to_string()),
        );
        if let Some(parent) = &block.parent_block_hash {
            map.insert(
                "parent_block_hash".to_string(),
                Value::link(parent.clone()),
            );
        }
        map.insert(
            "initial_storage".to_string(),
            Value::link(block.initial_storage.clone()),
        );
        map.insert(
            "final_storage".to_string(),
            Value::link(block.final_storage.clone()),
        );
        map.insert(
            "transactions".to_string(),
            indexed_tree(block.transactions.iter().map(serialize_transaction)),
        );
        map.insert(
            "receipts".to_string(),
            indexed_tree(block.receipts.iter().map(serialize_receipt)),
        );
        Ok(Value::Tree(map))
    }

    fn deserialize(&self, tree: &Value) -> Result<Block, ExecutorError> {
        let map = tree
            .as_tree()
            .ok_or_else(|| malformed("block is not a tree"))?;
        let block_number = require_string(map, "block_number")?
            .parse::<u64>()
            .map_err(|_| malformed("block_number is not a decimal integer"))?;
        let parent_block_hash = match map.get("parent_block_hash") {
            None => None,
            Some(value) => Some(require_link_value(value, "parent_block_hash")?),
        };
        let transactions = indexed_values(map.get("transactions"), "transactions")?
            .into_iter()
            .map(deserialize_transaction)
            .collect::<Result<Vec<_>, _>>()?;
        let receipts = indexed_values(map.get("receipts"), "receipts")?
            .into_iter()
            .map(deserialize_receipt)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Block {
            block_number,
            parent_block_hash,
            initial_storage: require_link(map, "initial_storage")?,
            final_storage: require_link(map, "final_storage")?,
            transactions,
            receipts,
        })
    }
}

fn serialize_transaction(transaction: &Transaction) -> Value {
    let mut map = BTreeMap::new();
    map.insert(
        "function".to_string(),
        Value::string(transaction.invocation.function.clone()),
    );
    map.insert(
        "args".to_string(),
        indexed_tree(
            transaction
                .invocation
                .args
                .iter()
                .map(|arg| Value::string(arg.clone())),
        ),
    );
    match &transaction.auth {
        TransactionAuth::Signed(bundle) => {
            map.insert(
                "signature".to_string(),
                Value::string(bs58::encode(&bundle.signature).into_string()),
            );
            map.insert(
                "public_key".to_string(),
                Value::string(bs58::encode(&bundle.public_key).into_string()),
            );
        },
        TransactionAuth::Owned(owner) => {
            map.insert(
                "owner".to_string(),
                Value::string(bs58::encode(owner).into_string()),
            );
        },
    }
    Value::Tree(map)
}

fn deserialize_transaction(value: &Value) -> Result<Transaction, ExecutorError> {
    let map = value
        .as_tree()
        .ok_or_else(|| malformed("transaction is not a tree"))?;
    let function = require_string(map, "function")?;
    let args = indexed_values(map.get("args"), "args")?
        .into_iter()
        .map(|arg| {
            arg.as_str()
                .map(str::to_string)
                .ok_or_else(|| malformed("argument is not a string"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let invocation = Invocation::new(function, args);

    let signature = map.get("signature");
    let public_key = map.get("public_key");
    let owner = map.get("owner");
    let auth = match (signature, public_key, owner) {
        (Some(signature), Some(public_key), None) => TransactionAuth::Signed(SignatureBundle {
            signature: decode_b58(signature, "signature")?,
            public_key: decode_b58(public_key, "public_key")?,
        }),
        (None, None, Some(owner)) => TransactionAuth::Owned(decode_b58(owner, "owner")?),
        _ => {
            return Err(malformed(
                "transaction must carry exactly one of signature or owner",
            ))
        },
    };
    Ok(Transaction { invocation, auth })
}

fn serialize_receipt(receipt: &Receipt) -> Value {
    let mut map = BTreeMap::new();
    map.insert(
        "status".to_string(),
        Value::string(receipt.status.to_string()),
    );
    map.insert(
        "initial_storage".to_string(),
        Value::link(receipt.initial_storage.clone()),
    );
    map.insert(
        "final_storage".to_string(),
        Value::link(receipt.final_storage.clone()),
    );
    map.insert(
        "logs".to_string(),
        indexed_tree(receipt.logs.iter().map(|log| Value::string(log.clone()))),
    );
    if let Some(debug) = &receipt.debug {
        map.insert("debug".to_string(), Value::string(debug.clone()));
    }
    Value::Tree(map)
}

fn deserialize_receipt(value: &Value) -> Result<Receipt, ExecutorError> {
    let map = value
        .as_tree()
        .ok_or_else(|| malformed("receipt is not a tree"))?;
    let status = require_string(map, "status")?
        .parse::<u32>()
        .map_err(|_| malformed("receipt status is not a decimal integer"))?;
    let logs = indexed_values(map.get("logs"), "logs")?
        .into_iter()
        .map(|log| {
            log.as_str()
                .map(str::to_string)
                .ok_or_else(|| malformed("log entry is not a string"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let debug = match map.get("debug") {
        None => None,
        Some(value) => Some(
            value
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| malformed("debug is not a string"))?,
        ),
    };
    Ok(Receipt {
        status,
        initial_storage: require_link(map, "initial_storage")?,
        final_storage: require_link(map, "final_storage")?,
        logs,
        debug,
    })
}

/// `[v0, v1, …]` becomes `{"0": v0, "1": v1, …}`; an empty list is omitted
/// entirely.
fn indexed_tree(values: impl Iterator<Item = Value>) -> Value {
    let map: BTreeMap<String, Value> = values
        .enumerate()
        .map(|(index, value)| (index.to_string(), value))
        .collect();
    if map.is_empty() {
        Value::Empty
    } else {
        Value::Tree(map)
    }
}

/// The inverse: index keys sorted by numeric value, absent trees as empty
/// lists.
fn indexed_values<'a>(
    value: Option<&'a Value>,
    field: &str,
) -> Result<Vec<&'a Value>, ExecutorError> {
    let map = match value {
        None | Some(Value::Empty) => return Ok(vec![]),
        Some(value) => value
            .as_tree()
            .ok_or_else(|| malformed(format!("{field} is not a tree")))?,
    };
    let mut entries = map
        .iter()
        .map(|(key, value)| {
            key.parse::<u64>()
                .map(|index| (index, value))
                .map_err(|_| malformed(format!("non-numeric index {key:?} in {field}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|(index, _)| *index);
    Ok(entries.into_iter().map(|(_, value)| value).collect())
}

fn require_string(map: &BTreeMap<String, Value>, key: &str) -> Result<String, ExecutorError> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| malformed(format!("missing or non-string field {key}")))
}

fn require_link(map: &BTreeMap<String, Value>, key: &str) -> Result<Hash, ExecutorError> {
    let value = map
        .get(key)
        .ok_or_else(|| malformed(format!("missing field {key}")))?;
    require_link_value(value, key)
}

fn require_link_value(value: &Value, key: &str) -> Result<Hash, ExecutorError> {
    value
        .as_link()
        .cloned()
        .ok_or_else(|| malformed(format!("field {key} is not a link")))
}

fn decode_b58(value: &Value, field: &str) -> Result<Vec<u8>, ExecutorError> {
    let text = value
        .as_str()
        .ok_or_else(|| malformed(format!("{field} is not a string")))?;
    bs58::decode(text)
        .into_vec()
        .map_err(|_| malformed(format!("{field} is not base58")))
}
