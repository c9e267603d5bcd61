// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

//! A small key-value VM and transaction helpers shared by pipeline and
//! tracker tests.

use crate::{
    error::ExecutorError,
    vm::{Reader, RunOutcome, Runner},
};
use async_trait::async_trait;
use daisy_crypto::KeyPair;
use daisy_storage::{Storage, StorageError};
use daisy_types::{Hash, Invocation, Transaction};

/// Executes `set <path> <value>` writes and `get <path>` reads against the
/// storage tree. `fail` produces a failure receipt; `abort` fails hard and
/// takes the block with it.
#[derive(Debug)]
pub struct MockVm;

#[async_trait]
impl Runner for MockVm {
    async fn run(
        &self,
        invocation: &Invocation,
        storage: &Storage,
        initial_storage: &Hash,
        _block_number: u64,
        _caller: &[u8],
    ) -> Result<RunOutcome, ExecutorError> {
        match (invocation.function.as_str(), invocation.args.as_slice()) {
            ("set", [path, value]) => {
                let root = storage.put(initial_storage, path, value.clone()).await?;
                Ok(RunOutcome::ok(root).with_log(format!("set {path}")))
            },
            ("fail", _) => Ok(RunOutcome::failed(
                1,
                initial_storage.clone(),
                "requested failure",
            )),
            ("abort", _) => Err(ExecutorError::Vm("requested abort".to_string())),
            (other, _) => Err(ExecutorError::Vm(format!("unknown function {other}"))),
        }
    }
}

#[async_trait]
impl Reader for MockVm {
    async fn read(
        &self,
        function: &str,
        args: &[String],
        storage: &Storage,
        root: &Hash,
    ) -> Result<serde_json::Value, ExecutorError> {
        match (function, args) {
            ("get", [path]) => match storage.get(root, path).await {
                Ok(bytes) => Ok(serde_json::Value::String(
                    String::from_utf8_lossy(&bytes).into_owned(),
                )),
                Err(StorageError::NotFound) => Ok(serde_json::Value::Null),
                Err(err) => Err(err.into()),
            },
            (other, _) => Err(ExecutorError::Vm(format!("unknown read {other}"))),
        }
    }
}

pub fn signed_set(keypair: &KeyPair, path: &str, value: &str) -> Transaction {
    let invocation = Invocation::new("set", vec![path.to_string(), value.to_string()]);
    let bundle = daisy_crypto::sign(&invocation.signing_bytes(), keypair)
        .expect("signing with a generated keypair");
    Transaction::signed(invocation, bundle)
}

pub fn system_set(owner: &[u8], path: &str, value: &str) -> Transaction {
    Transaction::system(
        Invocation::new("set", vec![path.to_string(), value.to_string()]),
        owner.to_vec(),
    )
}
