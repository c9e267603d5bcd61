// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

//! The MerkleDAG adapter: the handful of object-store operations the rest of
//! the system is built on, with an HTTP client for a live daemon and an
//! in-memory implementation that computes the same content addresses.

pub mod codec;
pub mod http;
pub mod memory;

use crate::error::StorageError;
use async_trait::async_trait;
use daisy_types::Hash;

/// Two-byte placeholder carried by intermediate (directory) nodes. Empty
/// data is accepted on read as well.
pub const DIR_SENTINEL: [u8; 2] = [0x08, 0x01];

pub fn is_sentinel(data: &[u8]) -> bool {
    data.is_empty() || data == DIR_SENTINEL
}

/// A named edge to another node. `size` is the cumulative byte size the
/// target accounts for; the core treats it as advisory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DagLink {
    pub name: String,
    pub hash: Hash,
    pub size: u64,
}

/// One object-store node: opaque data plus an ordered sequence of named
/// links. Addressed by the sha256 multihash of its wire encoding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DagNode {
    pub data: Vec<u8>,
    pub links: Vec<DagLink>,
}

impl DagNode {
    pub fn leaf(data: Vec<u8>) -> Self {
        Self {
            data,
            links: vec![],
        }
    }

    pub fn directory() -> Self {
        Self {
            data: DIR_SENTINEL.to_vec(),
            links: vec![],
        }
    }

    pub fn link_named(&self, name: &str) -> Option<&DagLink> {
        self.links.iter().find(|link| link.name == name)
    }
}

#[async_trait]
pub trait MerkleDag: Send + Sync {
    /// Creates a fresh empty node and returns its hash.
    async fn object_new(&self) -> Result<Hash, StorageError>;

    /// Stores a node, returning its content address.
    async fn object_put(&self, node: &DagNode) -> Result<Hash, StorageError>;

    /// Returns a new root in which the node at `path` under `root` links to
    /// `child`. `path` may contain `/` separators; with
    /// `create_intermediates` missing interior nodes are created.
    async fn object_patch_add_link(
        &self,
        root: &Hash,
        path: &str,
        child: &Hash,
        create_intermediates: bool,
    ) -> Result<Hash, StorageError>;

    /// Fetches a node's data and links.
    async fn object_get(&self, hash: &Hash) -> Result<DagNode, StorageError>;

    /// Fetches a node's raw wire encoding, as hashed by the store.
    async fn object_get_protobuf(&self, hash: &Hash) -> Result<Vec<u8>, StorageError>;
}
