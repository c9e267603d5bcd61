// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

//! An in-process object store computing the same content addresses as a real
//! daemon (sha256 multihash of the wire encoding). Backs tests and
//! single-process deployments.

use crate::{
    dag::{
        codec::{decode_node, encode_node},
        DagLink, DagNode, MerkleDag,
    },
    error::StorageError,
};
use async_trait::async_trait;
use daisy_crypto::multihash_b58;
use daisy_types::Hash;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
pub struct InMemoryDag {
    nodes: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryDag {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self, node: &DagNode) -> Result<Hash, StorageError> {
        let bytes = encode_node(node)?;
        let hash = multihash_b58(&bytes);
        self.nodes.write().insert(hash.clone(), bytes);
        Ok(Hash::new(hash))
    }

    fn load(&self, hash: &Hash) -> Result<DagNode, StorageError> {
        let nodes = self.nodes.read();
        let bytes = nodes.get(hash.as_str()).ok_or(StorageError::NotFound)?;
        decode_node(bytes)
    }

    fn node_size(&self, hash: &Hash) -> u64 {
        self.nodes
            .read()
            .get(hash.as_str())
            .map(|bytes| bytes.len() as u64)
            .unwrap_or(0)
    }

    fn add_link_under(
        &self,
        node: &DagNode,
        segments: &[&str],
        child: &Hash,
        create_intermediates: bool,
    ) -> Result<Hash, StorageError> {
        let (segment, rest) = match segments.split_first() {
            Some(split) => split,
            None => return Ok(child.clone()),
        };
        let target = if rest.is_empty() {
            child.clone()
        } else {
            let next = match node.link_named(segment) {
                Some(link) => self.load(&link.hash)?,
                None if create_intermediates => DagNode::directory(),
                None => return Err(StorageError::NotFound),
            };
            self.add_link_under(&next, rest, child, create_intermediates)?
        };
        let new_link = DagLink {
            name: segment.to_string(),
            hash: target.clone(),
            size: self.node_size(&target),
        };
        let mut updated = node.clone();
        match updated.links.iter().position(|link| link.name == *segment) {
            Some(at) => updated.links[at] = new_link,
            None => updated.links.push(new_link),
        }
        self.store(&updated)
    }
}

#[async_trait]
impl MerkleDag for InMemoryDag {
    async fn object_new(&self) -> Result<Hash, StorageError> {
        self.store(&DagNode::directory())
    }

    async fn object_put(&self, node: &DagNode) -> Result<Hash, StorageError> {
        self.store(node)
    }

    async fn object_patch_add_link(
        &self,
        root: &Hash,
        path: &str,
        child: &Hash,
        create_intermediates: bool,
    ) -> Result<Hash, StorageError> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Err(StorageError::Protocol("empty link path".to_string()));
        }
        let node = self.load(root)?;
        self.add_link_under(&node, &segments, child, create_intermediates)
    }

    async fn object_get(&self, hash: &Hash) -> Result<DagNode, StorageError> {
        self.load(hash)
    }

    async fn object_get_protobuf(&self, hash: &Hash) -> Result<Vec<u8>, StorageError> {
        let nodes = self.nodes.read();
        nodes
            .get(hash.as_str())
            .cloned()
            .ok_or(StorageError::NotFound)
    }
}
