// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

//! The mutable-name anchor.
//!
//! Everything in the system is content-addressed and immutable except one
//! name: the published chain head. Publishing maps the configured name to a
//! root hash; resolving reads the current mapping back.

use crate::error::StorageError;
use async_trait::async_trait;
use daisy_types::Hash;
use parking_lot::Mutex;
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(120);

#[async_trait]
pub trait NameService: Send + Sync {
    /// Points the configured name at `root`.
    async fn publish(&self, root: &Hash) -> Result<(), StorageError>;

    /// The root the name currently points at; `NotFound` when nothing has
    /// been published yet.
    async fn resolve(&self) -> Result<Hash, StorageError>;
}

/// IPNS-style publish/resolve against a daemon.
pub struct HttpNameService {
    base_url: String,
    key: String,
    client: Client,
}

#[derive(Deserialize)]
struct ResolveResponse {
    #[serde(rename = "Path")]
    path: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "Message")]
    message: String,
}

impl HttpNameService {
    pub fn new(base_url: impl Into<String>, key: impl Into<String>) -> Result<Self, StorageError> {
        let client = Client::builder().timeout(DEFAULT_PUBLISH_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key: key.into(),
            client,
        })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/api/v0/{}", self.base_url, name)
    }

    /// A daemon reports an unset name with an error body, not a status code
    /// of its own; distinguish that from transport trouble.
    async fn error_from(response: Response) -> StorageError {
        let status = response.status();
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => format!("name service returned status {}", status),
        };
        let lowered = message.to_lowercase();
        if lowered.contains("could not resolve") || lowered.contains("no link") {
            StorageError::NotFound
        } else {
            StorageError::Transport(message)
        }
    }
}

#[async_trait]
impl NameService for HttpNameService {
    async fn publish(&self, root: &Hash) -> Result<(), StorageError> {
        debug!(root = %root, key = %self.key, "name/publish");
        let target = format!("/ipfs/{root}");
        let response = self
            .client
            .post(self.endpoint("name/publish"))
            .query(&[("arg", target.as_str()), ("key", self.key.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        Ok(())
    }

    async fn resolve(&self) -> Result<Hash, StorageError> {
        let response = self
            .client
            .post(self.endpoint("name/resolve"))
            .query(&[("arg", self.key.as_str()), ("nocache", "true")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        let body: ResolveResponse = response.json().await?;
        // Resolved values look like `/<scheme>/<hash>`.
        match body.path.rsplit('/').next().filter(|hash| !hash.is_empty()) {
            Some(hash) => Ok(Hash::new(hash)),
            None => Err(StorageError::Protocol(format!(
                "unparseable resolve value {:?}",
                body.path
            ))),
        }
    }
}

/// In-process name service for tests and single-process deployments.
#[derive(Default)]
pub struct InMemoryNameService {
    value: Mutex<Option<Hash>>,
}

impl InMemoryNameService {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NameService for InMemoryNameService {
    async fn publish(&self, root: &Hash) -> Result<(), StorageError> {
        *self.value.lock() = Some(root.clone());
        Ok(())
    }

    async fn resolve(&self) -> Result<Hash, StorageError> {
        self.value.lock().clone().ok_or(StorageError::NotFound)
    }
}
