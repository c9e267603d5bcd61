// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::{error::TrackerError, metrics, publisher::PublisherHandle, tracker::TrackerHandle};
use std::time::Duration;
use tokio::{task::JoinHandle, time};
use tracing::{debug, info, warn};

/// Mints on every tick and publishes the resulting block hash under the
/// mutable name. Failures are logged and retried on the next tick; the loop
/// only stops once the tracker is gone.
pub fn spawn_leader_loop(
    tracker: TrackerHandle,
    publisher: PublisherHandle,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        info!(interval_ms = interval.as_millis() as u64, "leader loop started");
        loop {
            ticker.tick().await;
            let block_hash = match tracker.mint_current_block().await {
                Ok(block_hash) => block_hash,
                Err(TrackerError::ChannelClosed) => {
                    debug!("tracker gone, leader loop stopping");
                    return;
                },
                Err(err) => {
                    warn!(error = %err, "mint failed");
                    continue;
                },
            };
            match publisher.publish(block_hash.clone()).await {
                Ok(()) => debug!(block_hash = %block_hash, "published chain head"),
                Err(TrackerError::ChannelClosed) => {
                    debug!("publisher gone, leader loop stopping");
                    return;
                },
                Err(err) => {
                    metrics::PUBLISH_FAILURES.inc();
                    warn!(error = %err, "publish failed, retrying next tick");
                },
            }
        }
    })
}
