// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Immutable door configuration handed to the state machine.

use std::time::Duration;

use crate::door::controller::policies::CompletionStrategy;
use crate::door::response::MissingHardware;
use crate::pins::{Level, PinId, Pull};

/// Relay output wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayPin {
    pub pin: PinId,
    /// Level that engages the relay ("presses the button").
    pub active: Level,
}

impl RelayPin {
    pub fn off(&self) -> Level {
        self.active.inverted()
    }
}

/// Position sensor input wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorPin {
    pub pin: PinId,
    /// Level read when the door sits at this sensor's endpoint.
    pub active: Level,
    pub pull: Pull,
}

/// Timing of the relay and the door travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorTiming {
    pub press: Duration,
    pub idle: Duration,
    pub poll_interval: Duration,
    pub travel: Duration,
}

impl Default for DoorTiming {
    fn default() -> Self {
        Self {
            press: Duration::from_millis(500),
            idle: Duration::from_millis(500),
            poll_interval: Duration::from_millis(1000),
            travel: Duration::from_millis(15_000),
        }
    }
}

/// Everything the door controller needs, built once at startup.
#[derive(Debug, Clone)]
pub struct DoorConfig {
    pub name: String,
    pub relay: Option<RelayPin>,
    pub closed_sensor: Option<SensorPin>,
    pub open_sensor: Option<SensorPin>,
    pub timing: DoorTiming,
    pub completion: CompletionStrategy,
    /// Extra relay presses allowed when a commanded motion ends at the wrong endpoint.
    pub mismatch_retries: u32,
    /// Presses queued after the first one when reversing a door in motion.
    pub reverse_presses: u8,
}

impl Default for DoorConfig {
    fn default() -> Self {
        Self {
            name: "Garage Door".to_string(),
            relay: None,
            closed_sensor: None,
            open_sensor: None,
            timing: DoorTiming::default(),
            completion: CompletionStrategy::default(),
            mismatch_retries: 1,
            reverse_presses: 1,
        }
    }
}

impl DoorConfig {
    /// Verify that the relay and the closed sensor are wired.
    pub fn check_hardware(&self) -> Result<(RelayPin, SensorPin), MissingHardware> {
        match (self.relay, self.closed_sensor) {
            (Some(relay), Some(closed)) => Ok((relay, closed)),
            (relay, closed) => Err(MissingHardware {
                relay: relay.is_none(),
                closed_sensor: closed.is_none(),
            }),
        }
    }
}
