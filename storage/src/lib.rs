// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

//! The content-addressed storage layer.
//!
//! A logical filesystem is overlaid on a MerkleDAG object store: paths
//! resolve link-by-link from a root hash, and every write produces a new
//! root. [`Storage`] exposes the path-addressed operations, [`prover`]
//! verifies Merkle inclusion proofs offline, and [`name`] wraps the object
//! store's mutable-name facility that anchors the chain head.

pub mod dag;
pub mod error;
pub mod name;
pub mod prover;
mod storage;

pub use dag::{http::HttpDagClient, memory::InMemoryDag, DagLink, DagNode, MerkleDag};
pub use error::StorageError;
pub use name::{HttpNameService, InMemoryNameService, NameService};
pub use prover::{verify_proof, ProofVerdict};
pub use storage::{Storage, UpdateFallback, Value, LINK_SUFFIX};
