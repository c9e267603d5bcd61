// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

use once_cell::sync::Lazy;
use prometheus::{register_int_counter, IntCounter};

pub static MINTED_BLOCKS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "daisy_minted_blocks",
        "Number of blocks minted by this node"
    )
    .unwrap()
});

pub static EXECUTED_TRANSACTIONS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "daisy_executed_transactions",
        "Number of transactions executed into minted blocks"
    )
    .unwrap()
});

pub static ADOPTED_BLOCKS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "daisy_adopted_blocks",
        "Number of remote blocks verified and adopted"
    )
    .unwrap()
});

pub static REJECTED_CANDIDATES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "daisy_rejected_candidates",
        "Number of candidate blocks that failed verification"
    )
    .unwrap()
});

pub static PUBLISH_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "daisy_publish_failures",
        "Failed attempts to publish the chain head"
    )
    .unwrap()
});

pub static RESOLVE_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "daisy_resolve_failures",
        "Failed attempts to resolve the chain head"
    )
    .unwrap()
});
