// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP adapter for an IPFS-compatible daemon's object API.

use crate::{
    dag::{DagLink, DagNode, MerkleDag},
    error::StorageError,
};
use async_trait::async_trait;
use daisy_types::Hash;
use reqwest::{multipart, Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct HttpDagClient {
    base_url: String,
    client: Client,
}

#[derive(Deserialize)]
struct HashResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

#[derive(Serialize, Deserialize)]
struct JsonLink {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Hash")]
    hash: String,
    #[serde(rename = "Size")]
    size: u64,
}

#[derive(Serialize, Deserialize)]
struct JsonNode {
    #[serde(rename = "Data")]
    data: String,
    #[serde(rename = "Links")]
    links: Vec<JsonLink>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "Message")]
    message: String,
}

impl HttpDagClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, StorageError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/api/v0/{}", self.base_url, name)
    }

    /// Converts a non-success daemon response into the error it encodes.
    /// Daemons report absent objects and links through the message body.
    async fn error_from(response: Response) -> StorageError {
        let status = response.status();
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => format!("daemon returned status {}", status),
        };
        let lowered = message.to_lowercase();
        if lowered.contains("not found") || lowered.contains("no link") {
            StorageError::NotFound
        } else {
            StorageError::Transport(message)
        }
    }

    async fn expect_hash(response: Response) -> Result<Hash, StorageError> {
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        let body: HashResponse = response.json().await?;
        Ok(Hash::new(body.hash))
    }
}

#[async_trait]
impl MerkleDag for HttpDagClient {
    async fn object_new(&self) -> Result<Hash, StorageError> {
        let response = self.client.post(self.endpoint("object/new")).send().await?;
        Self::expect_hash(response).await
    }

    async fn object_put(&self, node: &DagNode) -> Result<Hash, StorageError> {
        let body = JsonNode {
            data: base64::encode(&node.data),
            links: node
                .links
                .iter()
                .map(|link| JsonLink {
                    name: link.name.clone(),
                    hash: link.hash.as_str().to_string(),
                    size: link.size,
                })
                .collect(),
        };
        let json = serde_json::to_vec(&body)
            .map_err(|err| StorageError::Protocol(format!("unencodable node: {err}")))?;
        let form = multipart::Form::new().part(
            "file",
            multipart::Part::bytes(json).file_name("node.json"),
        );
        let response = self
            .client
            .post(self.endpoint("object/put"))
            .query(&[("inputenc", "json"), ("datafieldenc", "base64")])
            .multipart(form)
            .send()
            .await?;
        Self::expect_hash(response).await
    }

    async fn object_patch_add_link(
        &self,
        root: &Hash,
        path: &str,
        child: &Hash,
        create_intermediates: bool,
    ) -> Result<Hash, StorageError> {
        debug!(root = %root, path, child = %child, "object/patch/add-link");
        let response = self
            .client
            .post(self.endpoint("object/patch/add-link"))
            .query(&[
                ("arg", root.as_str()),
                ("arg", path),
                ("arg", child.as_str()),
                ("create", if create_intermediates { "true" } else { "false" }),
            ])
            .send()
            .await?;
        Self::expect_hash(response).await
    }

    async fn object_get(&self, hash: &Hash) -> Result<DagNode, StorageError> {
        let response = self
            .client
            .post(self.endpoint("object/get"))
            .query(&[("arg", hash.as_str()), ("data-encoding", "base64")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        let body: JsonNode = response.json().await?;
        let data = base64::decode(&body.data)
            .map_err(|_| StorageError::Protocol("node data is not base64".to_string()))?;
        Ok(DagNode {
            data,
            links: body
                .links
                .into_iter()
                .map(|link| DagLink {
                    name: link.name,
                    hash: Hash::new(link.hash),
                    size: link.size,
                })
                .collect(),
        })
    }

    async fn object_get_protobuf(&self, hash: &Hash) -> Result<Vec<u8>, StorageError> {
        let response = self
            .client
            .post(self.endpoint("block/get"))
            .query(&[("arg", hash.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        Ok(response.bytes().await?.to_vec())
    }
}
