// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::{error::TrackerError, metrics, publisher::PublisherHandle, tracker::TrackerHandle};
use daisy_executor::{block_store, BlockSerializer};
use daisy_storage::Storage;
use daisy_types::Hash;
use std::{sync::Arc, time::Duration};
use tokio::{task::JoinHandle, time};
use tracing::{debug, info, warn};

/// Resolves the mutable name on every tick, loads the candidate head and
/// offers it to the tracker for verification. An unset name is quiet (no
/// publisher yet); everything else that fails is logged and retried.
pub fn spawn_follower_loop(
    tracker: TrackerHandle,
    publisher: PublisherHandle,
    storage: Storage,
    serializer: Arc<dyn BlockSerializer>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        info!(interval_ms = interval.as_millis() as u64, "follower loop started");
        let mut adopted_head: Option<Hash> = None;
        loop {
            ticker.tick().await;
            let head = match publisher.resolve().await {
                Ok(head) => head,
                Err(TrackerError::ChannelClosed) => {
                    debug!("publisher gone, follower loop stopping");
                    return;
                },
                Err(err) if err.is_not_found() => {
                    debug!("nothing published yet");
                    continue;
                },
                Err(err) => {
                    metrics::RESOLVE_FAILURES.inc();
                    warn!(error = %err, "resolve failed, retrying next tick");
                    continue;
                },
            };
            if adopted_head.as_ref() == Some(&head) {
                debug!(head = %head, "head unchanged");
                continue;
            }
            let candidate =
                match block_store::load_block(&storage, serializer.as_ref(), &head).await {
                    Ok(candidate) => candidate,
                    Err(err) => {
                        warn!(head = %head, error = %err, "failed to load candidate block");
                        continue;
                    },
                };
            match tracker.adopt_block(candidate).await {
                Ok(()) => {
                    debug!(head = %head, "head verified");
                    adopted_head = Some(head);
                },
                Err(TrackerError::ChannelClosed) => {
                    debug!("tracker gone, follower loop stopping");
                    return;
                },
                Err(err) => warn!(head = %head, error = %err, "candidate rejected"),
            }
        }
    })
}
