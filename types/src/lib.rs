// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core data types shared across the Daisy workspace: content-addressed
//! hashes, invocations and transactions, receipts and blocks, and the minimal
//! protobuf wire primitives the content addressing is defined over.

pub mod block;
pub mod hash;
pub mod transaction;
pub mod wire;

pub use block::{Block, Receipt};
pub use hash::Hash;
pub use transaction::{Invocation, SignatureBundle, Transaction, TransactionAuth};
