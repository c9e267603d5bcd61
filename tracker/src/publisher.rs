// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::error::TrackerError;
use daisy_storage::NameService;
use daisy_types::Hash;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, oneshot},
    time::timeout,
};
use tracing::debug;

const COMMAND_BUFFER: usize = 16;
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(120);
const RESOLVE_TIMEOUT: Duration = Duration::from_secs(60);

enum PublisherCommand {
    Publish {
        root: Hash,
        resp: oneshot::Sender<Result<(), TrackerError>>,
    },
    Resolve {
        resp: oneshot::Sender<Result<Hash, TrackerError>>,
    },
}

/// Client side of the publisher actor.
#[derive(Clone)]
pub struct PublisherHandle {
    sender: mpsc::Sender<PublisherCommand>,
}

impl PublisherHandle {
    /// Points the mutable name at `root`. Publishes are strictly ordered:
    /// the actor serves one at a time in arrival order.
    pub async fn publish(&self, root: Hash) -> Result<(), TrackerError> {
        let (resp, receiver) = oneshot::channel();
        self.sender
            .send(PublisherCommand::Publish { root, resp })
            .await
            .map_err(|_| TrackerError::ChannelClosed)?;
        match timeout(PUBLISH_TIMEOUT, receiver).await {
            Err(_) => Err(TrackerError::Timeout),
            Ok(Err(_)) => Err(TrackerError::ChannelClosed),
            Ok(Ok(result)) => result,
        }
    }

    /// The root the name currently points at.
    pub async fn resolve(&self) -> Result<Hash, TrackerError> {
        let (resp, receiver) = oneshot::channel();
        self.sender
            .send(PublisherCommand::Resolve { resp })
            .await
            .map_err(|_| TrackerError::ChannelClosed)?;
        match timeout(RESOLVE_TIMEOUT, receiver).await {
            Err(_) => Err(TrackerError::Timeout),
            Ok(Err(_)) => Err(TrackerError::ChannelClosed),
            Ok(Ok(result)) => result,
        }
    }
}

/// Single-writer guard around the mutable-name service.
pub struct Publisher {
    names: Arc<dyn NameService>,
    receiver: mpsc::Receiver<PublisherCommand>,
}

impl Publisher {
    pub fn spawn(names: Arc<dyn NameService>) -> PublisherHandle {
        let (sender, receiver) = mpsc::channel(COMMAND_BUFFER);
        let publisher = Publisher { names, receiver };
        tokio::spawn(publisher.run());
        PublisherHandle { sender }
    }

    async fn run(mut self) {
        while let Some(command) = self.receiver.recv().await {
            match command {
                PublisherCommand::Publish { root, resp } => {
                    let result = self.names.publish(&root).await.map_err(TrackerError::from);
                    let _ = resp.send(result);
                },
                PublisherCommand::Resolve { resp } => {
                    let result = self.names.resolve().await.map_err(TrackerError::from);
                    let _ = resp.send(result);
                },
            }
        }
        debug!("publisher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daisy_storage::InMemoryNameService;

    #[tokio::test]
    async fn resolve_reflects_the_latest_publish() {
        let publisher = Publisher::spawn(Arc::new(InMemoryNameService::new()));
        assert!(publisher.resolve().await.unwrap_err().is_not_found());

        publisher.publish(Hash::new("QmOne")).await.unwrap();
        publisher.publish(Hash::new("QmTwo")).await.unwrap();
        assert_eq!(publisher.resolve().await.unwrap(), Hash::new("QmTwo"));
    }
}
