// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

//! The REST façade.
//!
//! Four routes: read against the current head, prepare an invocation's
//! signing bytes for an external signer, submit a signed transaction, and
//! read against an arbitrary saved block. Input problems are 4xx; anything
//! the node gets wrong internally is 5xx.

use daisy_executor::{block_store, BlockSerializer, Reader};
use daisy_storage::Storage;
use daisy_tracker::TrackerHandle;
use daisy_types::{Hash, Invocation, SignatureBundle, Transaction};
use poem::{
    get, handler,
    http::StatusCode,
    listener::TcpListener,
    post,
    web::{Data, Json, Path},
    EndpointExt, Error as PoemError, Result as PoemResult, Route, Server,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Everything the routes need. Cheap to clone into the router's data slot.
#[derive(Clone)]
pub struct ApiContext {
    pub tracker: TrackerHandle,
    pub storage: Storage,
    pub reader: Arc<dyn Reader>,
    pub serializer: Arc<dyn BlockSerializer>,
}

/// Signed-transaction submission body. Both fields are base64; the public
/// key is a DER `SubjectPublicKeyInfo`.
#[derive(Deserialize)]
pub struct RunRequest {
    pub signature: String,
    pub public_key: String,
}

pub fn routes(context: ApiContext) -> impl poem::Endpoint {
    Route::new()
        .at("/read/block/:block_hash/:function/*args", get(read_at_block))
        .at("/read/:function/*args", get(read))
        .at("/prepare/:function/*args", get(prepare))
        .at("/run/:function/*args", post(run))
        .data(context)
}

pub async fn serve(context: ApiContext, address: String) -> Result<(), std::io::Error> {
    info!(address = %address, "api listening");
    Server::new(TcpListener::bind(address))
        .run(routes(context))
        .await
}

fn split_args(args: &str) -> Vec<String> {
    args.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

fn internal_error(err: impl std::fmt::Display) -> PoemError {
    PoemError::from_string(err.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
}

fn bad_request(message: impl Into<String>) -> PoemError {
    PoemError::from_string(message.into(), StatusCode::BAD_REQUEST)
}

#[handler]
async fn read(
    Path((function, args)): Path<(String, String)>,
    context: Data<&ApiContext>,
) -> PoemResult<Json<serde_json::Value>> {
    let result = context
        .tracker
        .read(function, split_args(&args))
        .await
        .map_err(internal_error)?;
    Ok(Json(json!({ "result": result })))
}

#[handler]
async fn prepare(Path((function, args)): Path<(String, String)>) -> String {
    let invocation = Invocation::new(function, split_args(&args));
    base64::encode(invocation.signing_bytes())
}

#[handler]
async fn run(
    Path((function, args)): Path<(String, String)>,
    Json(request): Json<RunRequest>,
    context: Data<&ApiContext>,
) -> PoemResult<Json<serde_json::Value>> {
    let signature = base64::decode(&request.signature)
        .map_err(|_| bad_request("signature is not base64"))?;
    let der = base64::decode(&request.public_key)
        .map_err(|_| bad_request("public_key is not base64"))?;
    let public_key = daisy_crypto::decode_der_public_key(&der)
        .map_err(|err| bad_request(format!("public_key is not DER SPKI: {err}")))?;

    let transaction = Transaction::signed(
        Invocation::new(function, split_args(&args)),
        SignatureBundle {
            signature,
            public_key,
        },
    );
    context
        .tracker
        .add_transaction(transaction)
        .await
        .map_err(internal_error)?;
    Ok(Json(json!({ "status": "accepted" })))
}

#[handler]
async fn read_at_block(
    Path((block_hash, function, args)): Path<(String, String, String)>,
    context: Data<&ApiContext>,
) -> PoemResult<Json<serde_json::Value>> {
    let block = block_store::load_block(
        &context.storage,
        context.serializer.as_ref(),
        &Hash::new(block_hash),
    )
    .await
    .map_err(|err| bad_request(format!("unloadable block: {err}")))?;
    let result = context
        .reader
        .read(&function, &split_args(&args), &context.storage, &block.final_storage)
        .await
        .map_err(internal_error)?;
    Ok(Json(json!({ "result": result })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use daisy_config::Mode;
    use daisy_crypto::KeyPair;
    use daisy_executor::{builder, test_utils::MockVm, TreeSerializer};
    use daisy_storage::InMemoryDag;
    use daisy_tracker::Tracker;
    use poem::test::TestClient;

    /// id-ecPublicKey + secp256k1, the wrapper an external signer's tooling
    /// would emit.
    const EC_ALGORITHM_IDENTIFIER: &[u8] = &[
        0x30, 0x10, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, 0x06, 0x05, 0x2b, 0x81,
        0x04, 0x00, 0x0a,
    ];

    fn encode_spki(public_key: &[u8]) -> Vec<u8> {
        let mut bit_string = vec![0x03, (public_key.len() + 1) as u8, 0x00];
        bit_string.extend_from_slice(public_key);
        let mut der = vec![0x30, (EC_ALGORITHM_IDENTIFIER.len() + bit_string.len()) as u8];
        der.extend_from_slice(EC_ALGORITHM_IDENTIFIER);
        der.extend_from_slice(&bit_string);
        der
    }

    async fn test_context() -> ApiContext {
        let storage = Storage::new(Arc::new(InMemoryDag::new()));
        let genesis = builder::genesis(&storage).await.unwrap();
        let serializer: Arc<dyn BlockSerializer> = Arc::new(TreeSerializer::new());
        let tracker = Tracker::spawn(
            storage.clone(),
            Arc::new(MockVm),
            Arc::new(MockVm),
            serializer.clone(),
            Mode::Leader,
            genesis,
        );
        ApiContext {
            tracker,
            storage,
            reader: Arc::new(MockVm),
            serializer,
        }
    }

    #[tokio::test]
    async fn read_returns_a_result_envelope() {
        let context = test_context().await;
        let client = TestClient::new(routes(context));
        let response = client.get("/read/get/absent").send().await;
        response.assert_status_is_ok();
        response
            .assert_json(json!({ "result": serde_json::Value::Null }))
            .await;
    }

    #[tokio::test]
    async fn prepare_returns_the_deterministic_signing_bytes() {
        let context = test_context().await;
        let client = TestClient::new(routes(context));
        let response = client.get("/prepare/test/1/2").send().await;
        response.assert_status_is_ok();
        let expected = base64::encode(
            Invocation::new("test", vec!["1".to_string(), "2".to_string()]).signing_bytes(),
        );
        response.assert_text(expected).await;
    }

    #[tokio::test]
    async fn run_accepts_an_externally_signed_transaction() {
        let context = test_context().await;
        let tracker = context.tracker.clone();
        let client = TestClient::new(routes(context));

        let keypair = KeyPair::generate();
        let invocation = Invocation::new("set", vec!["city".to_string(), "narnia".to_string()]);
        let bundle = daisy_crypto::sign(&invocation.signing_bytes(), &keypair).unwrap();

        let response = client
            .post("/run/set/city/narnia")
            .body_json(&json!({
                "signature": base64::encode(&bundle.signature),
                "public_key": base64::encode(encode_spki(&keypair.public)),
            }))
            .send()
            .await;
        response.assert_status_is_ok();

        let open = tracker.get_block().await.unwrap();
        assert_eq!(open.transactions.len(), 1);
        assert_eq!(open.transactions[0].invocation, invocation);
    }

    #[tokio::test]
    async fn run_rejects_a_malformed_public_key() {
        let context = test_context().await;
        let client = TestClient::new(routes(context));
        let response = client
            .post("/run/set/k/v")
            .body_json(&json!({
                "signature": base64::encode([1u8, 2, 3]),
                "public_key": base64::encode([0x04u8, 0x01]),
            }))
            .send()
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn read_at_block_uses_that_blocks_state() {
        let context = test_context().await;
        let keypair = KeyPair::generate();
        let invocation = Invocation::new("set", vec!["k".to_string(), "v1".to_string()]);
        let bundle = daisy_crypto::sign(&invocation.signing_bytes(), &keypair).unwrap();
        context
            .tracker
            .add_transaction(Transaction::signed(invocation, bundle))
            .await
            .unwrap();
        let block_hash = context.tracker.mint_current_block().await.unwrap();

        let client = TestClient::new(routes(context));
        let response = client
            .get(format!("/read/block/{block_hash}/get/k"))
            .send()
            .await;
        response.assert_status_is_ok();
        response.assert_json(json!({ "result": "v1" })).await;
    }
}
