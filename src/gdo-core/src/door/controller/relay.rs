// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Relay press sequencing.
//!
//! A press is a two phase cycle: the relay is held for the press duration,
//! released, then left alone for the idle duration before it may be pressed
//! again. Only one cycle is ever in flight. Extra presses requested up front
//! (used to reverse a moving door) are queued and started the moment the
//! cooldown ends.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::door::config::RelayPin;
use crate::pins::PinIo;
use crate::DynResult;

/// Where the relay is in its press cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayPhase {
    Idle,
    Pressing { release_at: Instant },
    Cooling { ready_at: Instant },
}

/// Outcome of a relay timer firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEvent {
    /// The relay was driven back to its off level.
    Released,
    /// Cooldown ended and a queued press started right away.
    Refired,
    /// Cooldown ended with nothing queued.
    Available,
}

pub struct RelaySequencer {
    pin: RelayPin,
    press: Duration,
    idle: Duration,
    phase: RelayPhase,
    queued: u8,
    max_queued: u8,
    press_count: u64,
}

impl RelaySequencer {
    pub fn new(pin: RelayPin, press: Duration, idle: Duration, max_queued: u8) -> Self {
        Self {
            pin,
            press,
            idle,
            phase: RelayPhase::Idle,
            queued: 0,
            max_queued,
            press_count: 0,
        }
    }

    /// Claim the relay pin and park it at its off level.
    pub fn configure(&self, io: &mut dyn PinIo) -> DynResult<()> {
        io.configure_output(self.pin.pin, self.pin.off())?;
        info!("Door switch pin: {}", self.pin.pin);
        info!("Door switch val: {}", self.pin.active.polarity_label());
        info!("Door switch press time in ms: {}", self.press.as_millis());
        info!("Door switch idle time in ms: {}", self.idle.as_millis());
        Ok(())
    }

    pub fn phase(&self) -> RelayPhase {
        self.phase
    }

    pub fn is_available(&self) -> bool {
        self.phase == RelayPhase::Idle
    }

    pub fn queued_presses(&self) -> u8 {
        self.queued
    }

    /// Total presses started since construction.
    pub fn press_count(&self) -> u64 {
        self.press_count
    }

    /// Start a single press cycle. Returns false if a cycle is in flight.
    pub fn try_fire(&mut self, io: &mut dyn PinIo, now: Instant) -> bool {
        self.try_fire_with_refires(io, now, 0)
    }

    /// Start a press cycle and queue up to `refires` more (capped).
    pub fn try_fire_with_refires(&mut self, io: &mut dyn PinIo, now: Instant, refires: u8) -> bool {
        if !self.is_available() {
            debug!("Relay busy ({:?}), press refused", self.phase);
            return false;
        }
        self.queued = refires.min(self.max_queued);
        self.engage(io, now);
        true
    }

    fn engage(&mut self, io: &mut dyn PinIo, now: Instant) {
        info!(
            "Turning on door relay, pin {} = {}",
            self.pin.pin, self.pin.active
        );
        if let Err(e) = io.write(self.pin.pin, self.pin.active) {
            error!("Failed to engage relay on pin {}: {}", self.pin.pin, e);
        }
        self.press_count += 1;
        self.phase = RelayPhase::Pressing {
            release_at: now + self.press,
        };
    }

    fn disengage(&mut self, io: &mut dyn PinIo) {
        info!(
            "Turning off door relay, pin {} = {}",
            self.pin.pin,
            self.pin.off()
        );
        if let Err(e) = io.write(self.pin.pin, self.pin.off()) {
            error!("Failed to release relay on pin {}: {}", self.pin.pin, e);
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match self.phase {
            RelayPhase::Idle => None,
            RelayPhase::Pressing { release_at } => Some(release_at),
            RelayPhase::Cooling { ready_at } => Some(ready_at),
        }
    }

    /// Run the pending phase transition if its deadline has passed.
    ///
    /// Follow-up deadlines are computed from the scheduled time, not `now`,
    /// so a late wakeup never stretches the cycle.
    pub fn advance(&mut self, io: &mut dyn PinIo, now: Instant) -> Option<RelayEvent> {
        match self.phase {
            RelayPhase::Pressing { release_at } if now >= release_at => {
                self.disengage(io);
                self.phase = RelayPhase::Cooling {
                    ready_at: release_at + self.idle,
                };
                Some(RelayEvent::Released)
            }
            RelayPhase::Cooling { ready_at } if now >= ready_at => {
                info!("Relay available");
                if self.queued > 0 {
                    self.queued -= 1;
                    self.engage(io, ready_at);
                    Some(RelayEvent::Refired)
                } else {
                    self.phase = RelayPhase::Idle;
                    Some(RelayEvent::Available)
                }
            }
            _ => None,
        }
    }

    /// Drop queued presses and force the relay off.
    pub fn release(&mut self, io: &mut dyn PinIo) {
        self.queued = 0;
        if matches!(self.phase, RelayPhase::Pressing { .. }) {
            self.disengage(io);
        }
        self.phase = RelayPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::door::controller::testing::FakePins;
    use crate::pins::Level;

    const PIN: RelayPin = RelayPin {
        pin: 17,
        active: Level::High,
    };

    fn sequencer(max_queued: u8) -> RelaySequencer {
        RelaySequencer::new(
            PIN,
            Duration::from_millis(500),
            Duration::from_millis(500),
            max_queued,
        )
    }

    #[test]
    fn test_configure_parks_relay_off() {
        let mut pins = FakePins::new();
        sequencer(1).configure(&mut pins).unwrap();
        assert_eq!(pins.output(17), Some(Level::Low));
    }

    #[test]
    fn test_press_cycle() {
        let mut pins = FakePins::new();
        let mut relay = sequencer(1);
        let t0 = Instant::now();

        assert!(relay.try_fire(&mut pins, t0));
        assert_eq!(pins.output(17), Some(Level::High));
        assert!(!relay.is_available());
        assert_eq!(relay.next_deadline(), Some(t0 + Duration::from_millis(500)));

        assert_eq!(relay.advance(&mut pins, t0 + Duration::from_millis(499)), None);
        assert_eq!(
            relay.advance(&mut pins, t0 + Duration::from_millis(500)),
            Some(RelayEvent::Released)
        );
        assert_eq!(pins.output(17), Some(Level::Low));
        assert!(!relay.is_available());

        assert_eq!(
            relay.advance(&mut pins, t0 + Duration::from_millis(1000)),
            Some(RelayEvent::Available)
        );
        assert!(relay.is_available());
        assert_eq!(relay.next_deadline(), None);
        assert_eq!(pins.writes(), vec![(17, Level::High), (17, Level::Low)]);
    }

    #[test]
    fn test_refuses_overlapping_press() {
        let mut pins = FakePins::new();
        let mut relay = sequencer(1);
        let t0 = Instant::now();

        assert!(relay.try_fire(&mut pins, t0));
        assert!(!relay.try_fire(&mut pins, t0 + Duration::from_millis(100)));
        relay.advance(&mut pins, t0 + Duration::from_millis(500));
        assert!(!relay.try_fire(&mut pins, t0 + Duration::from_millis(700)));

        assert_eq!(relay.press_count(), 1);
        assert_eq!(pins.writes_of(17, Level::High), 1);
    }

    #[test]
    fn test_queued_refire_runs_after_cooldown() {
        let mut pins = FakePins::new();
        let mut relay = sequencer(1);
        let t0 = Instant::now();

        assert!(relay.try_fire_with_refires(&mut pins, t0, 3));
        assert_eq!(relay.queued_presses(), 1);

        relay.advance(&mut pins, t0 + Duration::from_millis(500));
        assert_eq!(
            relay.advance(&mut pins, t0 + Duration::from_millis(1000)),
            Some(RelayEvent::Refired)
        );
        assert_eq!(relay.queued_presses(), 0);
        assert_eq!(
            relay.next_deadline(),
            Some(t0 + Duration::from_millis(1500))
        );

        relay.advance(&mut pins, t0 + Duration::from_millis(1500));
        assert_eq!(
            relay.advance(&mut pins, t0 + Duration::from_millis(2000)),
            Some(RelayEvent::Available)
        );
        assert_eq!(relay.press_count(), 2);
        assert_eq!(
            pins.writes(),
            vec![
                (17, Level::High),
                (17, Level::Low),
                (17, Level::High),
                (17, Level::Low)
            ]
        );
    }

    #[test]
    fn test_late_wakeup_keeps_schedule() {
        let mut pins = FakePins::new();
        let mut relay = sequencer(0);
        let t0 = Instant::now();

        relay.try_fire(&mut pins, t0);
        relay.advance(&mut pins, t0 + Duration::from_millis(800));
        assert_eq!(
            relay.phase(),
            RelayPhase::Cooling {
                ready_at: t0 + Duration::from_millis(1000)
            }
        );
    }

    #[test]
    fn test_release_forces_off() {
        let mut pins = FakePins::new();
        let mut relay = sequencer(1);
        let t0 = Instant::now();

        relay.try_fire_with_refires(&mut pins, t0, 1);
        relay.release(&mut pins);
        assert!(relay.is_available());
        assert_eq!(relay.queued_presses(), 0);
        assert_eq!(pins.output(17), Some(Level::Low));
    }
}
