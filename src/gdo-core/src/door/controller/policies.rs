// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Door operational policies for completion detection and retries.
//!
//! This module provides the policies that control how the door controller
//! decides that a motion has finished and whether it may press the relay
//! again when the door ends up somewhere other than commanded.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::events::DoorFault;
use crate::door::config::DoorTiming;

/// How the end of a motion is detected, as chosen in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStrategy {
    /// Re-sample the sensors on a dedicated timer a bounded number of times.
    #[default]
    Poll,
    /// Rely on the regular sensor poll and arm one timer for the full travel.
    Watchdog,
}

/// Concrete completion detection timing derived from the door timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionPolicy {
    BoundedPoll { every: Duration, count: u32 },
    Watchdog { timeout: Duration },
}

impl CompletionPolicy {
    /// Split the travel budget into `travel / poll` samples (at least one).
    ///
    /// Each sample is spaced one millisecond past an even share of the
    /// budget so the last one lands after the door had its full travel time.
    pub fn bounded_poll(travel: Duration, poll_interval: Duration) -> Self {
        let travel_ms = travel.as_millis().max(1);
        let poll_ms = poll_interval.as_millis().max(1);
        let count = (travel_ms / poll_ms).clamp(1, u32::MAX as u128);
        let every_ms = travel_ms / count + 1;
        Self::BoundedPoll {
            every: Duration::from_millis(every_ms as u64),
            count: count as u32,
        }
    }

    pub fn watchdog(travel: Duration) -> Self {
        Self::Watchdog { timeout: travel }
    }

    pub fn from_strategy(strategy: CompletionStrategy, timing: &DoorTiming) -> Self {
        match strategy {
            CompletionStrategy::Poll => Self::bounded_poll(timing.travel, timing.poll_interval),
            CompletionStrategy::Watchdog => Self::watchdog(timing.travel),
        }
    }

    /// True when the regular sensor poll is paused during motion.
    pub fn owns_sampling(&self) -> bool {
        matches!(self, Self::BoundedPoll { .. })
    }
}

/// Policy for pressing the relay again after a motion went wrong.
pub trait RetryPolicy: Send + Sync {
    /// Determine if another press should be attempted.
    fn should_retry(&self, attempt: u32, fault: &DoorFault) -> bool;

    /// Get the maximum number of extra presses allowed.
    fn max_attempts(&self) -> u32;
}

/// Allow a fixed number of re-presses, only for sensor mismatches.
#[derive(Debug, Clone, Copy)]
pub struct FixedRetries {
    max_attempts: u32,
}

impl FixedRetries {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }
}

impl Default for FixedRetries {
    fn default() -> Self {
        Self::new(1)
    }
}

impl RetryPolicy for FixedRetries {
    fn should_retry(&self, attempt: u32, fault: &DoorFault) -> bool {
        attempt < self.max_attempts && fault.is_mismatch()
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// No retry policy - the observed position is adopted immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn should_retry(&self, _attempt: u32, _fault: &DoorFault) -> bool {
        false
    }

    fn max_attempts(&self) -> u32 {
        0
    }
}

/// Build the retry policy for a configured number of re-presses.
pub fn retry_policy(mismatch_retries: u32) -> Box<dyn RetryPolicy> {
    if mismatch_retries == 0 {
        Box::new(NoRetry)
    } else {
        Box::new(FixedRetries::new(mismatch_retries))
    }
}
