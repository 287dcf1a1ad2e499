// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Maps raw sensor levels to a door position.

use tracing::info;

use crate::door::config::SensorPin;
use crate::pins::PinIo;
use crate::{DynResult, SensorPosition};

/// Reads the closed sensor and, when wired, the open sensor.
#[derive(Debug, Clone, Copy)]
pub struct SensorReader {
    closed: SensorPin,
    open: Option<SensorPin>,
}

impl SensorReader {
    pub fn new(closed: SensorPin, open: Option<SensorPin>) -> Self {
        Self { closed, open }
    }

    pub fn has_open_sensor(&self) -> bool {
        self.open.is_some()
    }

    /// Claim the sensor pins as inputs.
    pub fn configure(&self, io: &mut dyn PinIo) -> DynResult<()> {
        io.configure_input(self.closed.pin, self.closed.pull)?;
        info!("Door closed sensor: Configured");
        info!("    Door closed sensor pin: {}", self.closed.pin);
        info!(
            "    Door closed sensor val: {}",
            self.closed.active.polarity_label()
        );
        info!("    Door closed resistor: {}", self.closed.pull);

        if let Some(open) = self.open {
            io.configure_input(open.pin, open.pull)?;
            info!("Door open sensor: Configured");
            info!("    Door open sensor pin: {}", open.pin);
            info!("    Door open sensor val: {}", open.active.polarity_label());
            info!("    Door open resistor: {}", open.pull);
        } else {
            info!("Door open sensor: Not configured");
        }
        Ok(())
    }

    /// Sample the sensors. The closed sensor wins when both report active.
    pub fn read(&self, io: &mut dyn PinIo) -> DynResult<SensorPosition> {
        if io.read(self.closed.pin)? == self.closed.active {
            return Ok(SensorPosition::Closed);
        }
        match self.open {
            Some(open) if io.read(open.pin)? == open.active => Ok(SensorPosition::Open),
            _ => Ok(SensorPosition::Unknown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::door::controller::testing::FakePins;
    use crate::pins::{Level, Pull};

    const CLOSED: SensorPin = SensorPin {
        pin: 27,
        active: Level::Low,
        pull: Pull::Up,
    };
    const OPEN: SensorPin = SensorPin {
        pin: 22,
        active: Level::High,
        pull: Pull::Down,
    };

    #[test]
    fn test_configure_sets_pulls() {
        let mut pins = FakePins::new();
        let reader = SensorReader::new(CLOSED, Some(OPEN));
        reader.configure(&mut pins).unwrap();
        assert_eq!(pins.input_pull(27), Some(Pull::Up));
        assert_eq!(pins.input_pull(22), Some(Pull::Down));
    }

    #[test]
    fn test_two_sensors() {
        let mut pins = FakePins::new();
        let reader = SensorReader::new(CLOSED, Some(OPEN));

        pins.set_level(27, Level::Low);
        pins.set_level(22, Level::Low);
        assert_eq!(reader.read(&mut pins).unwrap(), SensorPosition::Closed);

        pins.set_level(27, Level::High);
        assert_eq!(reader.read(&mut pins).unwrap(), SensorPosition::Unknown);

        pins.set_level(22, Level::High);
        assert_eq!(reader.read(&mut pins).unwrap(), SensorPosition::Open);
    }

    #[test]
    fn test_closed_sensor_wins() {
        let mut pins = FakePins::new();
        let reader = SensorReader::new(CLOSED, Some(OPEN));
        pins.set_level(27, Level::Low);
        pins.set_level(22, Level::High);
        assert_eq!(reader.read(&mut pins).unwrap(), SensorPosition::Closed);
    }

    #[test]
    fn test_closed_sensor_only() {
        let mut pins = FakePins::new();
        let reader = SensorReader::new(CLOSED, None);
        assert!(!reader.has_open_sensor());

        pins.set_level(27, Level::High);
        assert_eq!(reader.read(&mut pins).unwrap(), SensorPosition::Unknown);
        pins.set_level(27, Level::Low);
        assert_eq!(reader.read(&mut pins).unwrap(), SensorPosition::Closed);
    }

    #[test]
    fn test_read_error_propagates() {
        let mut pins = FakePins::new();
        pins.set_fail_reads(true);
        let reader = SensorReader::new(CLOSED, None);
        assert!(reader.read(&mut pins).is_err());
    }
}
