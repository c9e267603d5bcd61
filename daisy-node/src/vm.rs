// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

//! The built-in key-value VM.
//!
//! Enough of a VM to run a chain without writing one: `set` writes a path,
//! `put_new` writes only fresh paths, `defer` schedules an invocation for a
//! future block through the deferred-transaction queue. Reads are `get` and
//! `ls`. Deployments with real semantics plug their own `Runner`/`Reader`
//! in via the registry.

use async_trait::async_trait;
use daisy_executor::{queue, ExecutorError, Reader, RunOutcome, Runner};
use daisy_storage::{Storage, StorageError};
use daisy_types::{Hash, Invocation};

#[derive(Debug)]
pub struct KvVm;

#[async_trait]
impl Runner for KvVm {
    async fn run(
        &self,
        invocation: &Invocation,
        storage: &Storage,
        initial_storage: &Hash,
        _block_number: u64,
        caller: &[u8],
    ) -> Result<RunOutcome, ExecutorError> {
        match (invocation.function.as_str(), invocation.args.as_slice()) {
            ("set", [path, value]) => {
                let root = storage.put(initial_storage, path, value.clone()).await?;
                Ok(RunOutcome::ok(root).with_log(format!("set {path}")))
            },
            ("put_new", [path, value]) => {
                match storage.put_new(initial_storage, path, value.clone()).await {
                    Ok(root) => Ok(RunOutcome::ok(root).with_log(format!("created {path}"))),
                    Err(StorageError::FileExists) => Ok(RunOutcome::failed(
                        1,
                        initial_storage.clone(),
                        format!("{path} already exists"),
                    )),
                    Err(err) => Err(err.into()),
                }
            },
            ("defer", [block_number, function, rest @ ..]) => {
                let block_number = block_number.parse::<u64>().map_err(|_| {
                    ExecutorError::Vm(format!("defer target {block_number:?} is not a number"))
                })?;
                let deferred = Invocation::new(function.clone(), rest.to_vec());
                let root =
                    queue::schedule(storage, initial_storage, block_number, caller, &deferred)
                        .await?;
                Ok(RunOutcome::ok(root)
                    .with_log(format!("deferred {function} to block {block_number}")))
            },
            (other, _) => Err(ExecutorError::Vm(format!(
                "unknown function {other} (arity {})",
                invocation.args.len()
            ))),
        }
    }
}

#[async_trait]
impl Reader for KvVm {
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
            ("ls", [path]) => {
                let names: Vec<_> = storage
                    .ls(root, path)
                    .await?
                    .into_iter()
                    .map(|(name, _)| serde_json::Value::String(name))
                    .collect();
                Ok(serde_json::Value::Array(names))
            },
            (other, _) => Err(ExecutorError::Vm(format!("unknown read {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::assert_matches;
    use daisy_storage::InMemoryDag;
    use std::sync::Arc;

    fn storage() -> Storage {
        Storage::new(Arc::new(InMemoryDag::new()))
    }

    #[tokio::test]
    async fn set_then_get_roundtrips() {
        let storage = storage();
        let root = storage.empty_root().await.unwrap();
        let outcome = KvVm
            .run(
                &Invocation::new("set", vec!["city".into(), "narnia".into()]),
                &storage,
                &root,
                1,
                &[0x01],
            )
            .await
            .unwrap();
        assert_eq!(outcome.status, 0);

        let value = KvVm
            .read("get", &["city".to_string()], &storage, &outcome.final_storage)
            .await
            .unwrap();
        assert_eq!(value, serde_json::json!("narnia"));
    }

    #[tokio::test]
    async fn put_new_fails_softly_on_existing_paths() {
        let storage = storage();
        let root = storage.empty_root().await.unwrap();
        let root = storage.put(&root, "taken", "already").await.unwrap();
        let outcome = KvVm
            .run(
                &Invocation::new("put_new", vec!["taken".into(), "again".into()]),
                &storage,
                &root,
                1,
                &[0x01],
            )
            .await
            .unwrap();
        assert_eq!(outcome.status, 1);
        assert_eq!(outcome.final_storage, root);
    }

    #[tokio::test]
    async fn defer_lands_in_the_queue_for_that_block() {
        let storage = storage();
        let root = storage.empty_root().await.unwrap();
        let outcome = KvVm
            .run(
                &Invocation::new(
                    "defer",
                    vec!["7".into(), "set".into(), "k".into(), "v".into()],
                ),
                &storage,
                &root,
                1,
                &[0x09],
            )
            .await
            .unwrap();

        let queued = queue::drain_for_block(&storage, &outcome.final_storage, 7)
            .await
            .unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].owner(), Some(&[0x09][..]));
        assert_eq!(
            queued[0].invocation,
            Invocation::new("set", vec!["k".to_string(), "v".to_string()])
        );
    }

    #[tokio::test]
    async fn unknown_functions_abort() {
        let storage = storage();
        let root = storage.empty_root().await.unwrap();
        let result = KvVm
            .run(&Invocation::new("explode", vec![]), &storage, &root, 1, &[])
            .await;
        assert_matches!(result, Err(ExecutorError::Vm(_)));
    }
}
