// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Door controller components.
//!
//! This module contains the control logic for the door: sensor sampling,
//! relay sequencing, request arbitration and the state machine that ties
//! them together.

pub mod arbiter;
pub mod events;
pub mod machine;
pub mod policies;
pub mod relay;
pub mod sensor;

#[cfg(test)]
pub(crate) mod testing;

pub use arbiter::{ArbiterContext, Arbitration, SetTargetCommand};
pub use events::{DoorEventEmitter, DoorFault, DoorListener, ListenerId};
pub use machine::{
    CompletionTimer, Detection, DoorEvent, DoorStateMachine, EpisodeId, EpisodeOrigin,
    MotionEpisode,
};
pub use policies::{
    retry_policy, CompletionPolicy, CompletionStrategy, FixedRetries, NoRetry, RetryPolicy,
};
pub use relay::{RelayEvent, RelayPhase, RelaySequencer};
pub use sensor::SensorReader;
