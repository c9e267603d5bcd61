// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::{error::TrackerError, metrics};
use daisy_config::Mode;
use daisy_executor::{builder, processor, verifier, BlockSerializer, Reader, Runner};
use daisy_storage::Storage;
use daisy_types::{Block, Hash, Transaction};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, oneshot},
    time::timeout,
};
use tracing::{debug, info};

const COMMAND_BUFFER: usize = 64;
const CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

enum TrackerCommand {
    GetBlock {
        resp: oneshot::Sender<Block>,
    },
    AddTransaction {
        transaction: Transaction,
        resp: oneshot::Sender<Result<(), TrackerError>>,
    },
    Read {
        function: String,
        args: Vec<String>,
        resp: oneshot::Sender<Result<serde_json::Value, TrackerError>>,
    },
    Mint {
        resp: oneshot::Sender<Result<Hash, TrackerError>>,
    },
    Adopt {
        candidate: Block,
        resp: oneshot::Sender<Result<(), TrackerError>>,
    },
}

/// Client side of the tracker actor. Cheap to clone; every call is answered
/// within [`CLIENT_TIMEOUT`] or fails, leaving the actor untouched.
#[derive(Clone)]
pub struct TrackerHandle {
    sender: mpsc::Sender<TrackerCommand>,
}

impl TrackerHandle {
    async fn call<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> TrackerCommand,
    ) -> Result<T, TrackerError> {
        let (resp, receiver) = oneshot::channel();
        self.sender
            .send(build(resp))
            .await
            .map_err(|_| TrackerError::ChannelClosed)?;
        match timeout(CLIENT_TIMEOUT, receiver).await {
            Err(_) => Err(TrackerError::Timeout),
            Ok(Err(_)) => Err(TrackerError::ChannelClosed),
            Ok(Ok(value)) => Ok(value),
        }
    }

    /// The open (or most recently accepted) block.
    pub async fn get_block(&self) -> Result<Block, TrackerError> {
        self.call(|resp| TrackerCommand::GetBlock { resp }).await
    }

    /// Leader only: appends a transaction to the open block.
    pub async fn add_transaction(&self, transaction: Transaction) -> Result<(), TrackerError> {
        self.call(|resp| TrackerCommand::AddTransaction { transaction, resp })
            .await?
    }

    /// Runs a read-only query against the current block's state.
    pub async fn read(
        &self,
        function: impl Into<String>,
        args: Vec<String>,
    ) -> Result<serde_json::Value, TrackerError> {
        let function = function.into();
        self.call(|resp| TrackerCommand::Read {
            function,
            args,
            resp,
        })
        .await?
    }

    /// Leader only: processes and saves the open block, then opens its
    /// successor. Returns the saved block's hash.
    pub async fn mint_current_block(&self) -> Result<Hash, TrackerError> {
        self.call(|resp| TrackerCommand::Mint { resp }).await?
    }

    /// Follower only: verifies a candidate against the current head and
    /// adopts it on success.
    pub async fn adopt_block(&self, candidate: Block) -> Result<(), TrackerError> {
        self.call(|resp| TrackerCommand::Adopt { candidate, resp })
            .await?
    }
}

/// The single writer over the current block. Commands are served strictly
/// in arrival order; a failed mint or adoption leaves the held block
/// exactly as it was.
pub struct Tracker {
    storage: Storage,
    runner: Arc<dyn Runner>,
    reader: Arc<dyn Reader>,
    serializer: Arc<dyn BlockSerializer>,
    mode: Mode,
    block: Block,
    receiver: mpsc::Receiver<TrackerCommand>,
}

impl Tracker {
    pub fn spawn(
        storage: Storage,
        runner: Arc<dyn Runner>,
        reader: Arc<dyn Reader>,
        serializer: Arc<dyn BlockSerializer>,
        mode: Mode,
        initial_block: Block,
    ) -> TrackerHandle {
        let (sender, receiver) = mpsc::channel(COMMAND_BUFFER);
        let tracker = Tracker {
            storage,
            runner,
            reader,
            serializer,
            mode,
            block: initial_block,
            receiver,
        };
        tokio::spawn(tracker.run());
        TrackerHandle { sender }
    }

    async fn run(mut self) {
        info!(mode = %self.mode, block_number = self.block.block_number, "tracker started");
        while let Some(command) = self.receiver.recv().await {
            self.handle(command).await;
        }
        debug!("tracker stopped");
    }

    async fn handle(&mut self, command: TrackerCommand) {
        // A dropped receiver means the caller timed out or went away; the
        // result is discarded either way.
        match command {
            TrackerCommand::GetBlock { resp } => {
                let _ = resp.send(self.block.clone());
            },
            TrackerCommand::AddTransaction { transaction, resp } => {
                let _ = resp.send(self.add_transaction(transaction));
            },
            TrackerCommand::Read {
                function,
                args,
                resp,
            } => {
                let _ = resp.send(self.read(&function, &args).await);
            },
            TrackerCommand::Mint { resp } => {
                let _ = resp.send(self.mint().await);
            },
            TrackerCommand::Adopt { candidate, resp } => {
                let _ = resp.send(self.adopt(candidate).await);
            },
        }
    }

    fn require_mode(&self, required: Mode) -> Result<(), TrackerError> {
        if self.mode == required {
            Ok(())
        } else {
            Err(TrackerError::WrongMode {
                required,
                actual: self.mode,
            })
        }
    }

    fn add_transaction(&mut self, transaction: Transaction) -> Result<(), TrackerError> {
        self.require_mode(Mode::Leader)?;
        self.block.transactions.push(transaction);
        Ok(())
    }

    async fn read(
        &self,
        function: &str,
        args: &[String],
    ) -> Result<serde_json::Value, TrackerError> {
        Ok(self
            .reader
            .read(function, args, &self.storage, &self.block.final_storage)
            .await?)
    }

    async fn mint(&mut self) -> Result<Hash, TrackerError> {
        self.require_mode(Mode::Leader)?;
        let processed =
            processor::process(&self.block, &self.storage, self.runner.as_ref()).await?;
        let block_hash =
            processor::save(&processed, &self.storage, self.serializer.as_ref()).await?;
        let next = builder::build_next(&self.storage, &block_hash, vec![]).await?;
        info!(
            block_number = processed.block_number,
            block_hash = %block_hash,
            transactions = processed.transactions.len(),
            "minted block"
        );
        self.block = next;
        metrics::MINTED_BLOCKS.inc();
        metrics::EXECUTED_TRANSACTIONS.inc_by(processed.transactions.len() as u64);
        Ok(block_hash)
    }

    async fn adopt(&mut self, candidate: Block) -> Result<(), TrackerError> {
        self.require_mode(Mode::Follower)?;
        let accepted = verifier::verify_chain(
            &self.block,
            candidate,
            &self.storage,
            self.runner.as_ref(),
            self.serializer.as_ref(),
        )
        .await
        .map_err(|err| {
            metrics::REJECTED_CANDIDATES.inc();
            err
        })?;
        info!(block_number = accepted.block_number, "adopted block");
        self.block = accepted;
        metrics::ADOPTED_BLOCKS.inc();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::assert_matches;
    use daisy_crypto::KeyPair;
    use daisy_executor::{
        test_utils::{signed_set, MockVm},
        ExecutorError, TreeSerializer,
    };
    use daisy_storage::InMemoryDag;
    use daisy_types::Invocation;

    async fn spawn_tracker(mode: Mode) -> (TrackerHandle, Storage) {
        let storage = Storage::new(Arc::new(InMemoryDag::new()));
        let genesis = builder::genesis(&storage).await.unwrap();
        let handle = Tracker::spawn(
            storage.clone(),
            Arc::new(MockVm),
            Arc::new(MockVm),
            Arc::new(TreeSerializer::new()),
            mode,
            genesis,
        );
        (handle, storage)
    }

    #[tokio::test]
    async fn leader_mints_and_reopens_the_next_block() {
        let (tracker, _) = spawn_tracker(Mode::Leader).await;
        let keypair = KeyPair::generate();

        tracker
            .add_transaction(signed_set(&keypair, "greeting", "hello"))
            .await
            .unwrap();
        let block_hash = tracker.mint_current_block().await.unwrap();

        let open = tracker.get_block().await.unwrap();
        assert_eq!(open.block_number, 1);
        assert_eq!(open.parent_block_hash, Some(block_hash));
        assert!(open.transactions.is_empty());

        let value = tracker
            .read("get", vec!["greeting".to_string()])
            .await
            .unwrap();
        assert_eq!(value, serde_json::json!("hello"));
    }

    #[tokio::test]
    async fn follower_rejects_leader_operations() {
        let (tracker, _) = spawn_tracker(Mode::Follower).await;
        let keypair = KeyPair::generate();

        assert_matches!(
            tracker
                .add_transaction(signed_set(&keypair, "k", "v"))
                .await,
            Err(TrackerError::WrongMode { .. })
        );
        assert_matches!(
            tracker.mint_current_block().await,
            Err(TrackerError::WrongMode { .. })
        );
    }

    #[tokio::test]
    async fn leader_rejects_adoption() {
        let (tracker, storage) = spawn_tracker(Mode::Leader).await;
        let genesis = builder::genesis(&storage).await.unwrap();
        assert_matches!(
            tracker.adopt_block(genesis).await,
            Err(TrackerError::WrongMode { .. })
        );
    }

    #[tokio::test]
    async fn a_failed_mint_preserves_the_draft() {
        let (tracker, _) = spawn_tracker(Mode::Leader).await;
        tracker
            .add_transaction(Transaction::system(
                Invocation::new("abort", vec![]),
                vec![0x01],
            ))
            .await
            .unwrap();

        assert_matches!(
            tracker.mint_current_block().await,
            Err(TrackerError::Executor(ExecutorError::Vm(_)))
        );

        // The draft still holds the poisoned transaction, untouched.
        let open = tracker.get_block().await.unwrap();
        assert_eq!(open.block_number, 0);
        assert_eq!(open.transactions.len(), 1);
    }

    #[tokio::test]
    async fn reads_fall_back_to_null_for_missing_keys() {
        let (tracker, _) = spawn_tracker(Mode::Leader).await;
        let value = tracker
            .read("get", vec!["absent".to_string()])
            .await
            .unwrap();
        assert_eq!(value, serde_json::Value::Null);
    }
}
