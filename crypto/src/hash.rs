// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

use sha2::{Digest, Sha256};

/// Multihash prefix for sha2-256: function code 0x12, digest length 0x20.
const SHA256_MULTIHASH_PREFIX: [u8; 2] = [0x12, 0x20];

pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&Sha256::digest(bytes));
    digest
}

/// Raw multihash bytes of a sha256 digest, as embedded in DAG link fields.
pub fn multihash_bytes(digest: &[u8; 32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(34);
    bytes.extend_from_slice(&SHA256_MULTIHASH_PREFIX);
    bytes.extend_from_slice(digest);
    bytes
}

/// The printable (base58) multihash of a node's wire encoding. This is the
/// content address the object store hands out for that node.
pub fn multihash_b58(node_bytes: &[u8]) -> String {
    bs58::encode(multihash_bytes(&sha256(node_bytes))).into_string()
}
