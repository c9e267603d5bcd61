// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::{
    dag::{is_sentinel, DagNode, MerkleDag},
    error::StorageError,
};
use async_recursion::async_recursion;
use daisy_types::Hash;
use std::{collections::BTreeMap, sync::Arc};

/// Link-name suffix marking a reference value: a link named `<key>_link`
/// points at another root instead of a nested subtree.
pub const LINK_SUFFIX: &str = "_link";

/// A logical value inside a storage tree, as written by [`Storage::put_all`]
/// and read back by [`Storage::get_all`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    /// A concrete leaf blob.
    Bytes(Vec<u8>),
    /// A reference to another root hash, stored under the `_link` suffix and
    /// never recursed into.
    Link(Hash),
    /// A nested mapping.
    Tree(BTreeMap<String, Value>),
    /// Nothing; skipped on write.
    Empty,
}

impl Value {
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(bytes.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Value::Bytes(value.into().into_bytes())
    }

    pub fn link(hash: Hash) -> Self {
        Value::Link(hash)
    }

    pub fn tree(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Value::Tree(entries.into_iter().collect())
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Bytes(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    pub fn as_link(&self) -> Option<&Hash> {
        match self {
            Value::Link(hash) => Some(hash),
            _ => None,
        }
    }

    pub fn as_tree(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Tree(map) => Some(map),
            _ => None,
        }
    }
}

/// What to store when [`Storage::update`] finds the path absent.
pub enum UpdateFallback {
    /// Store the default as-is.
    Stored(Vec<u8>),
    /// Run the update function over the default first.
    Applied(Vec<u8>),
}

/// The result of greedily descending a path from a root: how far we got and
/// everything we touched on the way.
pub(crate) struct Walk {
    /// Segments that could not be matched, in order.
    pub remaining: Vec<String>,
    /// Segments that were matched, in order.
    #[allow(dead_code)]
    pub matched: Vec<String>,
    /// Every node traversed, root first.
    pub nodes: Vec<DagNode>,
    /// The hash of each traversed node, parallel to `nodes`.
    pub hashes: Vec<Hash>,
}

impl Walk {
    fn reached(&self) -> &DagNode {
        self.nodes.last().expect("walk always holds the root")
    }

    fn reached_hash(&self) -> &Hash {
        self.hashes.last().expect("walk always holds the root")
    }

    fn is_complete(&self) -> bool {
        self.remaining.is_empty()
    }
}

/// Path-addressed operations over a MerkleDAG. Stateless: every operation
/// takes a root hash and returns values or a new root; nothing is ever
/// mutated in place.
#[derive(Clone)]
pub struct Storage {
    dag: Arc<dyn MerkleDag>,
}

impl Storage {
    pub fn new(dag: Arc<dyn MerkleDag>) -> Self {
        Self { dag }
    }

    pub fn dag(&self) -> &Arc<dyn MerkleDag> {
        &self.dag
    }

    /// A fresh root with no links and sentinel data.
    pub async fn empty_root(&self) -> Result<Hash, StorageError> {
        self.dag.object_new().await
    }

    fn split_path(path: &str) -> Vec<&str> {
        path.split('/').filter(|segment| !segment.is_empty()).collect()
    }

    fn join_path(prefix: &str, key: &str) -> String {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}/{key}")
        }
    }

    pub(crate) async fn walk(&self, root: &Hash, path: &str) -> Result<Walk, StorageError> {
        let mut segments = Self::split_path(path).into_iter();
        let mut walk = Walk {
            remaining: vec![],
            matched: vec![],
            nodes: vec![self.dag.object_get(root).await?],
            hashes: vec![root.clone()],
        };
        for segment in segments.by_ref() {
            match walk.reached().link_named(segment) {
                Some(link) => {
                    let hash = link.hash.clone();
                    walk.nodes.push(self.dag.object_get(&hash).await?);
                    walk.hashes.push(hash);
                    walk.matched.push(segment.to_string());
                },
                None => {
                    walk.remaining.push(segment.to_string());
                    break;
                },
            }
        }
        walk.remaining
            .extend(segments.map(|segment| segment.to_string()));
        Ok(walk)
    }

    /// Reads the value at `path`, or `NotFound`.
    pub async fn get(&self, root: &Hash, path: &str) -> Result<Vec<u8>, StorageError> {
        let walk = self.walk(root, path).await?;
        if !walk.is_complete() {
            return Err(StorageError::NotFound);
        }
        Ok(walk.reached().data.clone())
    }

    /// The hash of the node at `path`, or `NotFound`.
    pub async fn get_hash(&self, root: &Hash, path: &str) -> Result<Hash, StorageError> {
        let walk = self.walk(root, path).await?;
        if !walk.is_complete() {
            return Err(StorageError::NotFound);
        }
        Ok(walk.reached_hash().clone())
    }

    /// Writes `bytes` at `path`, returning the new root.
    pub async fn put(
        &self,
        root: &Hash,
        path: &str,
        bytes: impl Into<Vec<u8>> + Send,
    ) -> Result<Hash, StorageError> {
        let segments = Self::split_path(path);
        if segments.is_empty() {
            return Err(StorageError::Protocol("cannot put at the root".to_string()));
        }
        let leaf = self.dag.object_put(&DagNode::leaf(bytes.into())).await?;
        self.dag
            .object_patch_add_link(root, &segments.join("/"), &leaf, true)
            .await
    }

    /// Like [`Storage::put`], but refuses to overwrite an existing object.
    pub async fn put_new(
        &self,
        root: &Hash,
        path: &str,
        bytes: impl Into<Vec<u8>> + Send,
    ) -> Result<Hash, StorageError> {
        let walk = self.walk(root, path).await?;
        if walk.is_complete() {
            return Err(StorageError::FileExists);
        }
        self.put(root, path, bytes).await
    }

    /// Reads, transforms and rewrites the value at `path`. When absent, the
    /// fallback decides whether the default is stored raw or transformed.
    pub async fn update<F>(
        &self,
        root: &Hash,
        path: &str,
        f: F,
        fallback: UpdateFallback,
    ) -> Result<Hash, StorageError>
    where
        F: FnOnce(Vec<u8>) -> Vec<u8> + Send,
    {
        match self.get(root, path).await {
            Ok(current) => self.put(root, path, f(current)).await,
            Err(StorageError::NotFound) => match fallback {
                UpdateFallback::Stored(default) => self.put(root, path, default).await,
                UpdateFallback::Applied(default) => self.put(root, path, f(default)).await,
            },
            Err(err) => Err(err),
        }
    }

    /// Direct children of the node at `path`; empty when the path is absent.
    pub async fn ls(&self, root: &Hash, path: &str) -> Result<Vec<(String, Hash)>, StorageError> {
        let walk = self.walk(root, path).await?;
        if !walk.is_complete() {
            return Ok(vec![]);
        }
        Ok(walk
            .reached()
            .links
            .iter()
            .map(|link| (link.name.clone(), link.hash.clone()))
            .collect())
    }

    /// Stores a raw blob as a standalone object.
    pub async fn save(&self, bytes: impl Into<Vec<u8>> + Send) -> Result<Hash, StorageError> {
        self.dag.object_put(&DagNode::leaf(bytes.into())).await
    }

    /// Fetches a standalone object's data.
    pub async fn retrieve(&self, hash: &Hash) -> Result<Vec<u8>, StorageError> {
        Ok(self.dag.object_get(hash).await?.data)
    }

    /// Bulk-writes a whole value tree under `root`, returning the new root.
    /// Keys are written in lexicographic order so that identical logical
    /// trees always produce identical roots.
    pub async fn put_all(&self, root: &Hash, values: &Value) -> Result<Hash, StorageError> {
        match values {
            Value::Tree(map) => self.put_tree(root.clone(), "", map).await,
            Value::Empty => Ok(root.clone()),
            _ => Err(StorageError::Protocol(
                "put_all expects a tree at the top level".to_string(),
            )),
        }
    }

    #[async_recursion]
    async fn put_tree(
        &self,
        root: Hash,
        prefix: &str,
        map: &BTreeMap<String, Value>,
    ) -> Result<Hash, StorageError> {
        let mut root = root;
        for (key, value) in map {
            let path = Self::join_path(prefix, key);
            root = match value {
                Value::Bytes(bytes) => self.put(&root, &path, bytes.clone()).await?,
                Value::Link(hash) => {
                    self.dag
                        .object_patch_add_link(
                            &root,
                            &format!("{path}{LINK_SUFFIX}"),
                            hash,
                            true,
                        )
                        .await?
                },
                Value::Tree(subtree) => self.put_tree(root, &path, subtree).await?,
                Value::Empty => root,
            };
        }
        Ok(root)
    }

    /// Bulk-reads the tree under `path`. Links named `<key>_link` come back
    /// as [`Value::Link`] without being recursed into.
    pub async fn get_all(&self, root: &Hash, path: &str) -> Result<Value, StorageError> {
        let walk = self.walk(root, path).await?;
        if !walk.is_complete() {
            return Err(StorageError::NotFound);
        }
        self.read_tree(walk.reached()).await
    }

    #[async_recursion]
    async fn read_tree(&self, node: &DagNode) -> Result<Value, StorageError> {
        if node.links.is_empty() {
            return Ok(Value::Bytes(node.data.clone()));
        }
        if !is_sentinel(&node.data) {
            return Err(StorageError::Protocol(
                "node carries both data and links".to_string(),
            ));
        }
        let mut map = BTreeMap::new();
        for link in &node.links {
            match link.name.strip_suffix(LINK_SUFFIX) {
                Some(key) => {
                    map.insert(key.to_string(), Value::Link(link.hash.clone()));
                },
                None => {
                    let child = self.dag.object_get(&link.hash).await?;
                    map.insert(link.name.clone(), self.read_tree(&child).await?);
                },
            }
        }
        Ok(Value::Tree(map))
    }

    /// The Merkle inclusion proof for `path`: the wire encoding of every node
    /// from the leaf up to and including the root.
    pub async fn proof(&self, root: &Hash, path: &str) -> Result<Vec<Vec<u8>>, StorageError> {
        let walk = self.walk(root, path).await?;
        if !walk.is_complete() {
            return Err(StorageError::NotFound);
        }
        let mut proof = Vec::with_capacity(walk.hashes.len());
        for hash in walk.hashes.iter().rev() {
            proof.push(self.dag.object_get_protobuf(hash).await?);
        }
        Ok(proof)
    }
}
