// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::{
    block_store, builder,
    error::ExecutorError,
    processor, queue,
    serializer::{BlockSerializer, TreeSerializer},
    test_utils::{signed_set, system_set, MockVm},
    verifier,
};
use claims::assert_matches;
use daisy_crypto::KeyPair;
use daisy_storage::{InMemoryDag, Storage};
use daisy_types::{Hash, Invocation, Transaction, TransactionAuth};
use std::sync::Arc;

fn storage() -> Storage {
    Storage::new(Arc::new(InMemoryDag::new()))
}

#[tokio::test]
async fn first_block_atop_genesis_is_empty() {
    let storage = storage();
    let serializer = TreeSerializer::new();
    let genesis = builder::genesis(&storage).await.unwrap();
    assert_eq!(genesis.block_number, 0);
    assert_eq!(genesis.parent_block_hash, None);
    assert_eq!(genesis.initial_storage, genesis.final_storage);

    let genesis_hash = processor::save(&genesis, &storage, &serializer)
        .await
        .unwrap();
    let block = builder::build_next(&storage, &genesis_hash, vec![])
        .await
        .unwrap();
    assert_eq!(block.block_number, 1);
    assert_eq!(block.parent_block_hash, Some(genesis_hash));
    assert_eq!(block.initial_storage, genesis.final_storage);
    assert_eq!(block.final_storage, genesis.final_storage);
    assert!(block.transactions.is_empty());
    assert!(block.receipts.is_empty());
}

#[tokio::test]
async fn receipts_chain_through_storage_roots() {
    let storage = storage();
    let keypair = KeyPair::generate();
    let genesis = builder::genesis(&storage).await.unwrap();
    let genesis_hash = processor::save(&genesis, &storage, &TreeSerializer::new())
        .await
        .unwrap();

    let mut block = builder::build_next(&storage, &genesis_hash, vec![]).await.unwrap();
    block.transactions = vec![
        signed_set(&keypair, "players/5/name", "thomas"),
        signed_set(&keypair, "players/5/age", "55"),
    ];
    let processed = processor::process(&block, &storage, &MockVm).await.unwrap();

    assert_eq!(processed.receipts.len(), 2);
    assert_eq!(processed.receipts[0].initial_storage, block.initial_storage);
    assert_eq!(
        processed.receipts[0].final_storage,
        processed.receipts[1].initial_storage
    );
    assert_eq!(
        processed.receipts[1].final_storage,
        processed.final_storage
    );
    assert!(processed.receipts.iter().all(|receipt| receipt.is_ok()));

    let name = storage
        .get(&processed.final_storage, "players/5/name")
        .await
        .unwrap();
    assert_eq!(name, b"thomas".to_vec());
}

#[tokio::test]
async fn a_failed_transaction_is_receipted_not_fatal() {
    let storage = storage();
    let genesis = builder::genesis(&storage).await.unwrap();
    let genesis_hash = processor::save(&genesis, &storage, &TreeSerializer::new())
        .await
        .unwrap();

    let mut block = builder::build_next(&storage, &genesis_hash, vec![]).await.unwrap();
    block.transactions = vec![Transaction::system(
        Invocation::new("fail", vec![]),
        vec![0x01],
    )];
    let processed = processor::process(&block, &storage, &MockVm).await.unwrap();
    assert_eq!(processed.receipts.len(), 1);
    assert_eq!(processed.receipts[0].status, 1);
    assert_eq!(processed.final_storage, block.initial_storage);
}

#[tokio::test]
async fn a_tampered_signature_aborts_the_block() {
    let storage = storage();
    let keypair = KeyPair::generate();
    let genesis = builder::genesis(&storage).await.unwrap();
    let genesis_hash = processor::save(&genesis, &storage, &TreeSerializer::new())
        .await
        .unwrap();

    let mut block = builder::build_next(&storage, &genesis_hash, vec![]).await.unwrap();
    let mut tampered = signed_set(&keypair, "k", "v");
    if let TransactionAuth::Signed(bundle) = &mut tampered.auth {
        bundle.public_key[10] ^= 0xff;
    }
    block.transactions = vec![signed_set(&keypair, "a", "1"), tampered];

    let result = processor::process(&block, &storage, &MockVm).await;
    assert_matches!(result, Err(ExecutorError::SignatureRejected(_)));
}

#[tokio::test]
async fn queued_transactions_open_the_scheduled_block() {
    let storage = storage();
    let serializer = TreeSerializer::new();

    // Schedule a system transaction for block 1 in the genesis state, then
    // save a genesis whose final storage carries the queue.
    let mut genesis = builder::genesis(&storage).await.unwrap();
    let queued_root = queue::schedule(
        &storage,
        &genesis.final_storage,
        1,
        &[0x01],
        &Invocation::new("spawn", vec!["10".to_string()]),
    )
    .await
    .unwrap();
    genesis.final_storage = queued_root;
    let genesis_hash = processor::save(&genesis, &storage, &serializer)
        .await
        .unwrap();

    let block = builder::build_next(&storage, &genesis_hash, vec![]).await.unwrap();
    assert_eq!(block.block_number, 1);
    assert_eq!(block.transactions.len(), 1);
    assert_eq!(block.transactions[0].owner(), Some(&[0x01][..]));
    assert_eq!(
        block.transactions[0].invocation,
        Invocation::new("spawn", vec!["10".to_string()])
    );
}

#[tokio::test]
async fn saved_blocks_load_back_identically() {
    let storage = storage();
    let serializer = TreeSerializer::new();
    let keypair = KeyPair::generate();

    let genesis = builder::genesis(&storage).await.unwrap();
    let genesis_hash = processor::save(&genesis, &storage, &serializer)
        .await
        .unwrap();
    let mut block = builder::build_next(&storage, &genesis_hash, vec![]).await.unwrap();
    block.transactions = vec![
        signed_set(&keypair, "a", "1"),
        system_set(&[0x02], "b", "2"),
    ];
    let processed = processor::process(&block, &storage, &MockVm).await.unwrap();
    let block_hash = processor::save(&processed, &storage, &serializer)
        .await
        .unwrap();

    let loaded = block_store::load_block(&storage, &serializer, &block_hash)
        .await
        .unwrap();
    assert_eq!(loaded, processed);

    assert_eq!(
        block_store::block_number_at(&storage, &block_hash).await.unwrap(),
        1
    );
    assert_eq!(
        block_store::final_storage_at(&storage, &block_hash).await.unwrap(),
        processed.final_storage
    );
    assert_eq!(
        block_store::parent_hash_at(&storage, &block_hash).await.unwrap(),
        Some(genesis_hash)
    );
}

#[tokio::test]
async fn verifier_accepts_a_replayable_candidate() {
    let storage = storage();
    let serializer = TreeSerializer::new();
    let keypair = KeyPair::generate();

    let genesis = builder::genesis(&storage).await.unwrap();
    let genesis_hash = processor::save(&genesis, &storage, &serializer)
        .await
        .unwrap();
    let mut block = builder::build_next(&storage, &genesis_hash, vec![]).await.unwrap();
    block.transactions = vec![signed_set(&keypair, "k", "v")];
    let processed = processor::process(&block, &storage, &MockVm).await.unwrap();

    let accepted = verifier::verify_chain(&genesis, processed.clone(), &storage, &MockVm, &serializer)
        .await
        .unwrap();
    assert_eq!(accepted, processed);
}

#[tokio::test]
async fn verifier_pinpoints_a_mutated_final_storage() {
    let storage = storage();
    let serializer = TreeSerializer::new();
    let keypair = KeyPair::generate();

    let genesis = builder::genesis(&storage).await.unwrap();
    let genesis_hash = processor::save(&genesis, &storage, &serializer)
        .await
        .unwrap();
    let mut block = builder::build_next(&storage, &genesis_hash, vec![]).await.unwrap();
    block.transactions = vec![signed_set(&keypair, "k", "v")];
    let mut candidate = processor::process(&block, &storage, &MockVm).await.unwrap();
    candidate.final_storage = Hash::new(format!("{}x", candidate.final_storage));

    let result =
        verifier::verify_chain(&genesis, candidate, &storage, &MockVm, &serializer).await;
    match result {
        Err(ExecutorError::ChainMismatch { fields }) => {
            assert!(fields.contains(&"final_storage"));
        },
        other => panic!("expected a chain mismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn verifier_rejects_a_stale_candidate() {
    let storage = storage();
    let serializer = TreeSerializer::new();

    let genesis = builder::genesis(&storage).await.unwrap();
    let genesis_hash = processor::save(&genesis, &storage, &serializer)
        .await
        .unwrap();
    let block = builder::build_next(&storage, &genesis_hash, vec![]).await.unwrap();
    let head = processor::process(&block, &storage, &MockVm).await.unwrap();

    let result =
        verifier::verify_chain(&head, genesis.clone(), &storage, &MockVm, &serializer).await;
    assert_matches!(
        result,
        Err(ExecutorError::StaleCandidate {
            current: 1,
            candidate: 0
        })
    );
}

#[tokio::test]
async fn verifier_requires_a_resolvable_parent() {
    let storage = storage();
    let serializer = TreeSerializer::new();

    let genesis = builder::genesis(&storage).await.unwrap();
    let orphan = daisy_types::Block::open(
        1,
        Hash::new("QmNoSuchParent"),
        genesis.final_storage.clone(),
        vec![],
    );
    let result =
        verifier::verify_chain(&genesis, orphan, &storage, &MockVm, &serializer).await;
    assert_matches!(result, Err(ExecutorError::MissingParent { block_number: 1 }));
}

#[tokio::test]
async fn verifier_walks_multiple_blocks_back_to_the_head() {
    let storage = storage();
    let serializer = TreeSerializer::new();
    let keypair = KeyPair::generate();

    let genesis = builder::genesis(&storage).await.unwrap();
    let mut parent_hash = processor::save(&genesis, &storage, &serializer)
        .await
        .unwrap();
    let mut tip = genesis.clone();
    for index in 0..3 {
        let mut block = builder::build_next(&storage, &parent_hash, vec![]).await.unwrap();
        block.transactions = vec![signed_set(&keypair, "round", &index.to_string())];
        tip = processor::process(&block, &storage, &MockVm).await.unwrap();
        parent_hash = processor::save(&tip, &storage, &serializer).await.unwrap();
    }

    let accepted = verifier::verify_chain(&genesis, tip.clone(), &storage, &MockVm, &serializer)
        .await
        .unwrap();
    assert_eq!(accepted.block_number, 3);
    assert_eq!(accepted, tip);
}
