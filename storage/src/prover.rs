// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

//! Standalone Merkle proof verification.
//!
//! A proof is the wire encoding of every node from a leaf to a root. Given
//! the root hash, the path and the claimed value, verification recomputes
//! each node's multihash and checks that its parent links to it under the
//! right segment name. Pure sha256 and wire decoding; no store access.

use crate::{dag::codec::decode_node, error::StorageError};
use daisy_crypto::{multihash_b58, multihash_bytes, sha256};
use daisy_types::Hash;

/// The outcome of verifying a proof chain. Failures are data, not errors:
/// only malformed wire bytes escalate to [`StorageError`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProofVerdict {
    /// The proof binds `value` at `path` to `root`.
    Qed,
    /// The leaf node does not carry the claimed value.
    InvalidDataProof,
    /// The chain breaks at `segment`: no link with that name and the
    /// expected hash.
    InvalidProof { segment: String },
    /// The chain is internally consistent but tops out at a different root.
    RootMismatch,
}

impl ProofVerdict {
    pub fn is_qed(&self) -> bool {
        matches!(self, ProofVerdict::Qed)
    }
}

/// Verifies that `proof` (leaf-first) binds `expected_value` at `path` under
/// `root`.
pub fn verify_proof(
    root: &Hash,
    path: &str,
    expected_value: &[u8],
    proof: &[Vec<u8>],
) -> Result<ProofVerdict, StorageError> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let (leaf_bytes, upper_nodes) = match proof.split_first() {
        Some(split) => split,
        None => return Ok(ProofVerdict::InvalidDataProof),
    };
    let leaf = decode_node(leaf_bytes)?;
    if leaf.data != expected_value {
        return Ok(ProofVerdict::InvalidDataProof);
    }

    if upper_nodes.len() != segments.len() {
        // The chain must supply exactly one parent per path segment; report
        // the first segment left unbound.
        let at = segments
            .iter()
            .rev()
            .nth(upper_nodes.len())
            .copied()
            .unwrap_or("");
        return Ok(ProofVerdict::InvalidProof {
            segment: at.to_string(),
        });
    }

    let mut previous_bytes = leaf_bytes;
    for (segment, upper_bytes) in segments.iter().rev().zip(upper_nodes) {
        let expected_hash = multihash_bytes(&sha256(previous_bytes));
        let expected_b58 = bs58::encode(&expected_hash).into_string();
        let upper = decode_node(upper_bytes)?;
        let bound = upper
            .links
            .iter()
            .any(|link| link.name == *segment && link.hash.as_str() == expected_b58);
        if !bound {
            return Ok(ProofVerdict::InvalidProof {
                segment: segment.to_string(),
            });
        }
        previous_bytes = upper_bytes;
    }

    if multihash_b58(previous_bytes) != root.as_str() {
        return Ok(ProofVerdict::RootMismatch);
    }
    Ok(ProofVerdict::Qed)
}
