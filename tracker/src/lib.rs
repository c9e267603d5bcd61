// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

//! Chain tracking.
//!
//! The [`Tracker`] actor owns the current block and serializes every
//! operation on it; the [`Publisher`] actor owns the mutable name. Around
//! them, the leader loop mints and publishes on an interval, and the
//! follower loop resolves, re-verifies and adopts. Components communicate
//! only through their handles; there is no shared mutable state.

pub mod error;
pub mod follower;
pub mod leader;
pub mod metrics;
pub mod publisher;
pub mod tracker;

pub use error::TrackerError;
pub use follower::spawn_follower_loop;
pub use leader::spawn_leader_loop;
pub use publisher::{Publisher, PublisherHandle};
pub use tracker::{Tracker, TrackerHandle};
