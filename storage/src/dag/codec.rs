// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

//! Wire codec for DAG nodes.
//!
//! Nodes are encoded in the dag-pb layout: every link as a length-delimited
//! field 2 (hash = 1, name = 2, size = 3), links before data, data as field
//! 1. Hashes inside link fields are raw multihash bytes; in decoded form
//! they carry the printable base58 spelling used everywhere else.

use crate::{
    dag::{DagLink, DagNode},
    error::StorageError,
};
use daisy_types::{
    wire::{put_bytes_field, put_varint_field, FieldReader, WireValue},
    Hash,
};

const NODE_DATA_FIELD: u64 = 1;
const NODE_LINK_FIELD: u64 = 2;
const LINK_HASH_FIELD: u64 = 1;
const LINK_NAME_FIELD: u64 = 2;
const LINK_SIZE_FIELD: u64 = 3;

pub fn encode_node(node: &DagNode) -> Result<Vec<u8>, StorageError> {
    let mut buf = vec![];
    for link in &node.links {
        let raw_hash = bs58::decode(link.hash.as_str())
            .into_vec()
            .map_err(|_| StorageError::Protocol(format!("unencodable hash {}", link.hash)))?;
        let mut link_buf = vec![];
        put_bytes_field(&mut link_buf, LINK_HASH_FIELD, &raw_hash);
        put_bytes_field(&mut link_buf, LINK_NAME_FIELD, link.name.as_bytes());
        put_varint_field(&mut link_buf, LINK_SIZE_FIELD, link.size);
        put_bytes_field(&mut buf, NODE_LINK_FIELD, &link_buf);
    }
    if !node.data.is_empty() {
        put_bytes_field(&mut buf, NODE_DATA_FIELD, &node.data);
    }
    Ok(buf)
}

pub fn decode_node(bytes: &[u8]) -> Result<DagNode, StorageError> {
    let mut node = DagNode::default();
    for field in FieldReader::new(bytes) {
        match field? {
            (NODE_DATA_FIELD, WireValue::Bytes(data)) => node.data = data.to_vec(),
            (NODE_LINK_FIELD, WireValue::Bytes(link)) => node.links.push(decode_link(link)?),
            _ => {},
        }
    }
    Ok(node)
}

pub fn decode_link(bytes: &[u8]) -> Result<DagLink, StorageError> {
    let mut hash = None;
    let mut name = String::new();
    let mut size = 0;
    for field in FieldReader::new(bytes) {
        match field? {
            (LINK_HASH_FIELD, WireValue::Bytes(raw)) => {
                hash = Some(Hash::new(bs58::encode(raw).into_string()));
            },
            (LINK_NAME_FIELD, WireValue::Bytes(raw)) => {
                name = String::from_utf8(raw.to_vec())
                    .map_err(|_| StorageError::Protocol("link name is not utf-8".to_string()))?;
            },
            (LINK_SIZE_FIELD, WireValue::Varint(value)) => size = value,
            _ => {},
        }
    }
    let hash = hash.ok_or_else(|| StorageError::Protocol("link without a hash".to_string()))?;
    Ok(DagLink { name, hash, size })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::DIR_SENTINEL;
    use daisy_crypto::multihash_b58;

    fn link(name: &str, payload: &[u8]) -> DagLink {
        DagLink {
            name: name.to_string(),
            hash: Hash::new(multihash_b58(payload)),
            size: payload.len() as u64,
        }
    }

    #[test]
    fn roundtrips_a_leaf() {
        let node = DagNode::leaf(b"value".to_vec());
        let bytes = encode_node(&node).unwrap();
        assert_eq!(decode_node(&bytes).unwrap(), node);
    }

    #[test]
    fn roundtrips_a_directory_with_links() {
        let node = DagNode {
            data: DIR_SENTINEL.to_vec(),
            links: vec![link("alpha", b"a"), link("beta", b"b")],
        };
        let bytes = encode_node(&node).unwrap();
        assert_eq!(decode_node(&bytes).unwrap(), node);
    }

    #[test]
    fn links_precede_data_on_the_wire() {
        let node = DagNode {
            data: DIR_SENTINEL.to_vec(),
            links: vec![link("alpha", b"a")],
        };
        let bytes = encode_node(&node).unwrap();
        // First field key: field 2, wire type 2.
        assert_eq!(bytes[0], 0x12);
    }

    #[test]
    fn empty_data_is_omitted() {
        let node = DagNode::leaf(vec![]);
        assert_eq!(encode_node(&node).unwrap(), Vec::<u8>::new());
        assert_eq!(decode_node(&[]).unwrap(), node);
    }

    #[test]
    fn link_without_hash_is_rejected() {
        let mut link_buf = vec![];
        daisy_types::wire::put_bytes_field(&mut link_buf, 2, b"orphan");
        let mut buf = vec![];
        daisy_types::wire::put_bytes_field(&mut buf, 2, &link_buf);
        assert!(matches!(
            decode_node(&buf),
            Err(StorageError::Protocol(_))
        ));
    }
}
