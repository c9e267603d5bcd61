// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

//! Signature and content-address primitives: secp256k1 ECDSA over sha256
//! digests, DER public-key decoding, and the sha256 multihash rule the DAG
//! addresses nodes by.

pub mod der;
pub mod ecdsa;
pub mod hash;

pub use der::decode_der_public_key;
pub use ecdsa::{sign, verify, KeyPair};
pub use hash::{multihash_b58, multihash_bytes, sha256};

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("malformed public key")]
    MalformedPublicKey,
    #[error("malformed private key")]
    MalformedPrivateKey,
    #[error("malformed signature encoding")]
    MalformedSignature,
    #[error("malformed DER key: {0}")]
    MalformedDer(&'static str),
}
