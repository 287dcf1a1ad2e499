// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Simulated garage door backend for development and testing.
//!
//! Models a single-button opener: every rising edge on the relay pin is one
//! button press. A door at rest starts moving toward the other endpoint, a
//! moving door stops, and a door stopped midway moves opposite to its last
//! direction. Travel is linear over the configured travel time. Sensor pins
//! report their active level only at their endpoint.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use gdo_core::door::config::{RelayPin, SensorPin};
use gdo_core::{DoorConfig, DynResult, Level, PinId, PinIo, Pull};
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Opening,
    Closing,
}

impl Direction {
    fn opposite(self) -> Self {
        match self {
            Self::Opening => Self::Closing,
            Self::Closing => Self::Opening,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Motion {
    /// 0.0 is fully closed, 1.0 fully open.
    Resting { position: f64 },
    Moving {
        from: f64,
        direction: Direction,
        since: Instant,
    },
}

/// Physical state of the simulated door.
#[derive(Debug)]
pub struct SimDoor {
    relay: Option<RelayPin>,
    closed: Option<SensorPin>,
    open: Option<SensorPin>,
    travel: Duration,
    motion: Motion,
    last_direction: Direction,
    relay_level: Option<Level>,
    presses: u64,
}

impl SimDoor {
    /// A closed door wired like `config`.
    pub fn from_config(config: &DoorConfig) -> Self {
        Self {
            relay: config.relay,
            closed: config.closed_sensor,
            open: config.open_sensor,
            travel: config.timing.travel.max(Duration::from_millis(1)),
            motion: Motion::Resting { position: 0.0 },
            last_direction: Direction::Closing,
            relay_level: None,
            presses: 0,
        }
    }

    /// Button presses seen so far, relay or manual.
    pub fn presses(&self) -> u64 {
        self.presses
    }

    pub fn position_at(&self, now: Instant) -> f64 {
        match self.motion {
            Motion::Resting { position } => position,
            Motion::Moving {
                from,
                direction,
                since,
            } => {
                let moved = now.saturating_duration_since(since).as_secs_f64()
                    / self.travel.as_secs_f64();
                match direction {
                    Direction::Opening => (from + moved).min(1.0),
                    Direction::Closing => (from - moved).max(0.0),
                }
            }
        }
    }

    /// Direction of travel, or `None` when at rest.
    pub fn direction_at(&mut self, now: Instant) -> Option<Direction> {
        self.settle(now);
        match self.motion {
            Motion::Moving { direction, .. } => Some(direction),
            Motion::Resting { .. } => None,
        }
    }

    pub fn is_closed_at(&self, now: Instant) -> bool {
        self.position_at(now) <= 0.0
    }

    pub fn is_open_at(&self, now: Instant) -> bool {
        self.position_at(now) >= 1.0
    }

    fn settle(&mut self, now: Instant) {
        if let Motion::Moving { .. } = self.motion {
            let position = self.position_at(now);
            if position <= 0.0 || position >= 1.0 {
                self.motion = Motion::Resting { position };
            }
        }
    }

    /// Press the door button, as the relay or the wall button would.
    pub fn press_at(&mut self, now: Instant) {
        self.settle(now);
        self.presses += 1;
        self.motion = match self.motion {
            Motion::Moving { .. } => {
                let position = self.position_at(now);
                debug!("Simulated door stopped at {:.0}%", position * 100.0);
                Motion::Resting { position }
            }
            Motion::Resting { position } => {
                let direction = if position <= 0.0 {
                    Direction::Opening
                } else if position >= 1.0 {
                    Direction::Closing
                } else {
                    self.last_direction.opposite()
                };
                self.last_direction = direction;
                debug!("Simulated door {:?} from {:.0}%", direction, position * 100.0);
                Motion::Moving {
                    from: position,
                    direction,
                    since: now,
                }
            }
        };
    }

    fn sensor_level(&self, sensor: SensorPin, at_endpoint: bool) -> Level {
        if at_endpoint {
            sensor.active
        } else {
            sensor.active.inverted()
        }
    }

    fn read_at(&self, pin: PinId, now: Instant) -> DynResult<Level> {
        match (self.closed, self.open) {
            (Some(closed), _) if closed.pin == pin => {
                Ok(self.sensor_level(closed, self.is_closed_at(now)))
            }
            (_, Some(open)) if open.pin == pin => Ok(self.sensor_level(open, self.is_open_at(now))),
            _ => Err(format!("simulated pin {} is not a sensor", pin).into()),
        }
    }

    fn write_at(&mut self, pin: PinId, level: Level, now: Instant) -> DynResult<()> {
        let relay = self
            .relay
            .filter(|relay| relay.pin == pin)
            .ok_or_else(|| format!("simulated pin {} is not the relay", pin))?;
        let was_active = self.relay_level == Some(relay.active);
        self.relay_level = Some(level);
        if level == relay.active && !was_active {
            self.press_at(now);
        }
        Ok(())
    }
}

/// [`PinIo`] over a shared [`SimDoor`], timed by the tokio clock.
#[derive(Clone)]
pub struct SimPins {
    door: Arc<Mutex<SimDoor>>,
}

impl SimPins {
    pub fn new(door: SimDoor) -> Self {
        Self {
            door: Arc::new(Mutex::new(door)),
        }
    }

    /// Shared handle to the simulated door, for manual moves.
    pub fn door(&self) -> Arc<Mutex<SimDoor>> {
        Arc::clone(&self.door)
    }

    fn with_door<T>(&self, f: impl FnOnce(&mut SimDoor) -> DynResult<T>) -> DynResult<T> {
        let mut door = self
            .door
            .lock()
            .map_err(|_| "simulated door lock poisoned")?;
        f(&mut door)
    }
}

impl PinIo for SimPins {
    fn configure_output(&mut self, pin: PinId, initial: Level) -> DynResult<()> {
        self.with_door(|door| {
            if door.relay.map(|r| r.pin) != Some(pin) {
                return Err(format!("simulated pin {} is not the relay", pin).into());
            }
            door.relay_level = Some(initial);
            Ok(())
        })
    }

    fn configure_input(&mut self, pin: PinId, _pull: Pull) -> DynResult<()> {
        let now = Instant::now();
        self.with_door(|door| door.read_at(pin, now).map(|_| ()))
    }

    fn read(&mut self, pin: PinId) -> DynResult<Level> {
        let now = Instant::now();
        self.with_door(|door| door.read_at(pin, now))
    }

    fn write(&mut self, pin: PinId, level: Level) -> DynResult<()> {
        let now = Instant::now();
        self.with_door(|door| door.write_at(pin, level, now))
    }
}
