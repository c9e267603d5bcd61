// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

//! Node wiring: turns a [`NodeConfig`] into running components.

pub mod vm;

use anyhow::{bail, Context};
use daisy_api::ApiContext;
use daisy_config::{ApiScheme, InitialBlockReference, Mode, NodeConfig};
use daisy_executor::{block_store, builder, BlockSerializer, Reader, Runner, TreeSerializer};
use daisy_storage::{HttpDagClient, HttpNameService, MerkleDag, NameService, Storage};
use daisy_tracker::{
    spawn_follower_loop, spawn_leader_loop, Publisher, PublisherHandle, Tracker, TrackerHandle,
};
use daisy_types::{Block, Hash};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vm::KvVm;

/// Handles to everything the node spawned; dropping it stops nothing, the
/// process lifetime is managed by `main`.
pub struct RunningNode {
    pub tracker: TrackerHandle,
    pub publisher: PublisherHandle,
}

/// Maps the configured serializer identifier to an implementation.
pub fn resolve_serializer(config: &NodeConfig) -> anyhow::Result<Arc<dyn BlockSerializer>> {
    match config.serializer.as_str() {
        "tree" => Ok(Arc::new(TreeSerializer::new())),
        other => bail!("unknown serializer {other:?}"),
    }
}

/// Maps the configured runner/reader identifiers to implementations.
pub fn resolve_vm(config: &NodeConfig) -> anyhow::Result<(Arc<dyn Runner>, Arc<dyn Reader>)> {
    let runner: Arc<dyn Runner> = match config.runner.as_str() {
        "kv" => Arc::new(KvVm),
        other => bail!("unknown runner {other:?}"),
    };
    let reader: Arc<dyn Reader> = match config.reader.as_str() {
        "kv" => Arc::new(KvVm),
        other => bail!("unknown reader {other:?}"),
    };
    Ok((runner, reader))
}

/// The block the tracker starts from. A leader opens a draft on top of a
/// referenced head; a follower holds the head itself and lets verification
/// move it forward.
async fn initial_block(
    config: &NodeConfig,
    storage: &Storage,
    serializer: &dyn BlockSerializer,
    publisher: &PublisherHandle,
) -> anyhow::Result<Block> {
    let referenced_hash = match &config.initial_block_reference {
        InitialBlockReference::Genesis => {
            return builder::genesis(storage)
                .await
                .context("building the genesis block")
        },
        InitialBlockReference::Resolve => publisher
            .resolve()
            .await
            .context("resolving the published head")?,
        InitialBlockReference::BlockHash(hash) => Hash::new(hash.clone()),
    };
    if config.run_leader {
        builder::build_next(storage, &referenced_hash, vec![])
            .await
            .context("opening a draft on the referenced head")
    } else {
        block_store::load_block(storage, serializer, &referenced_hash)
            .await
            .context("loading the referenced head")
    }
}

/// Builds and spawns every configured component.
pub async fn start(config: NodeConfig) -> anyhow::Result<RunningNode> {
    config.validate()?;

    let dag: Arc<dyn MerkleDag> = Arc::new(HttpDagClient::new(&config.dag_api_url)?);
    let names: Arc<dyn NameService> =
        Arc::new(HttpNameService::new(&config.dag_api_url, &config.ipfs_key)?);
    let storage = Storage::new(dag);
    let serializer = resolve_serializer(&config)?;
    let (runner, reader) = resolve_vm(&config)?;
    let publisher = Publisher::spawn(names);

    let block = initial_block(&config, &storage, serializer.as_ref(), &publisher).await?;
    let mode = config.mode();
    let tracker = Tracker::spawn(
        storage.clone(),
        runner,
        reader.clone(),
        serializer.clone(),
        // An api-only node never mints nor adopts; follower mode keeps the
        // leader-only surface locked.
        mode.unwrap_or(Mode::Follower),
        block,
    );

    match mode {
        Some(Mode::Leader) => {
            let tracker = tracker.clone();
            let publisher = publisher.clone();
            let interval = Duration::from_millis(config.mining_interval_ms);
            supervise("leader", move || {
                spawn_leader_loop(tracker.clone(), publisher.clone(), interval)
            });
        },
        Some(Mode::Follower) => {
            let tracker = tracker.clone();
            let publisher = publisher.clone();
            let storage = storage.clone();
            let serializer = serializer.clone();
            let interval = Duration::from_millis(config.pulling_interval_ms);
            supervise("follower", move || {
                spawn_follower_loop(
                    tracker.clone(),
                    publisher.clone(),
                    storage.clone(),
                    serializer.clone(),
                    interval,
                )
            });
        },
        None => info!("no role configured; serving reads only"),
    }

    if config.run_api {
        if config.api_scheme == ApiScheme::Https {
            warn!("api_scheme is https; expecting tls termination in front of the node");
        }
        let context = ApiContext {
            tracker: tracker.clone(),
            storage,
            reader,
            serializer,
        };
        let address = format!("0.0.0.0:{}", config.api_port);
        tokio::spawn(async move {
            if let Err(err) = daisy_api::serve(context, address).await {
                warn!(error = %err, "api server exited");
            }
        });
    }

    Ok(RunningNode { tracker, publisher })
}

/// Restarts a loop task if it dies on a panic. A clean exit means the actors
/// behind it are gone and the loop is done for good.
fn supervise<F>(name: &'static str, spawn: F)
where
    F: Fn() -> JoinHandle<()> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            match spawn().await {
                Ok(()) => {
                    debug!(loop_name = name, "loop finished");
                    return;
                },
                Err(err) if err.is_panic() => {
                    warn!(loop_name = name, "loop panicked, restarting");
                },
                Err(_) => return,
            }
        }
    });
}
