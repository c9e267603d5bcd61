// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::wire::put_bytes_field;
use serde::{Deserialize, Serialize};

/// The pure intent portion of a transaction: a function name plus its
/// positional string arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub function: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(function: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            function: function.into(),
            args,
        }
    }

    /// The deterministic byte encoding clients sign: the function name as
    /// field 1 followed by each argument as a repeated field 2, in order.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut buf = vec![];
        put_bytes_field(&mut buf, 1, self.function.as_bytes());
        for arg in &self.args {
            put_bytes_field(&mut buf, 2, arg.as_bytes());
        }
        buf
    }
}

/// An ECDSA signature over an invocation's signing bytes, together with the
/// uncompressed public key that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureBundle {
    #[serde(with = "hex")]
    pub signature: Vec<u8>,
    #[serde(with = "hex")]
    pub public_key: Vec<u8>,
}

/// Authorization of a transaction: exactly one of a client signature or a
/// trusted system owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionAuth {
    /// User-signed; the signature covers [`Invocation::signing_bytes`].
    Signed(SignatureBundle),
    /// System-queued; carries the owner bytes of the enqueuer and is trusted
    /// without a signature.
    Owned(#[serde(with = "hex")] Vec<u8>),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub invocation: Invocation,
    pub auth: TransactionAuth,
}

impl Transaction {
    pub fn signed(invocation: Invocation, bundle: SignatureBundle) -> Self {
        Self {
            invocation,
            auth: TransactionAuth::Signed(bundle),
        }
    }

    pub fn system(invocation: Invocation, owner: Vec<u8>) -> Self {
        Self {
            invocation,
            auth: TransactionAuth::Owned(owner),
        }
    }

    pub fn signature(&self) -> Option<&SignatureBundle> {
        match &self.auth {
            TransactionAuth::Signed(bundle) => Some(bundle),
            TransactionAuth::Owned(_) => None,
        }
    }

    pub fn owner(&self) -> Option<&[u8]> {
        match &self.auth {
            TransactionAuth::Signed(_) => None,
            TransactionAuth::Owned(owner) => Some(owner),
        }
    }
}
