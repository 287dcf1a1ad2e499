// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Raspberry Pi GPIO backend.

use std::collections::HashMap;

use gdo_core::{DynResult, Level, PinId, PinIo, Pull};
use rppal::gpio::{self, Gpio, InputPin, OutputPin};
use tracing::debug;

fn to_gpio(level: Level) -> gpio::Level {
    match level {
        Level::Low => gpio::Level::Low,
        Level::High => gpio::Level::High,
    }
}

fn from_gpio(level: gpio::Level) -> Level {
    match level {
        gpio::Level::Low => Level::Low,
        gpio::Level::High => Level::High,
    }
}

/// Pins claimed through `/dev/gpiomem`. Pins are released on drop.
pub struct RppalPins {
    gpio: Gpio,
    outputs: HashMap<PinId, OutputPin>,
    inputs: HashMap<PinId, InputPin>,
}

impl RppalPins {
    pub fn new() -> DynResult<Self> {
        Ok(Self {
            gpio: Gpio::new()?,
            outputs: HashMap::new(),
            inputs: HashMap::new(),
        })
    }
}

impl PinIo for RppalPins {
    fn configure_output(&mut self, pin: PinId, initial: Level) -> DynResult<()> {
        let raw = self.gpio.get(pin)?;
        let output = match initial {
            Level::Low => raw.into_output_low(),
            Level::High => raw.into_output_high(),
        };
        debug!("GPIO {} claimed as output", pin);
        self.outputs.insert(pin, output);
        Ok(())
    }

    fn configure_input(&mut self, pin: PinId, pull: Pull) -> DynResult<()> {
        let raw = self.gpio.get(pin)?;
        let input = match pull {
            Pull::Off => raw.into_input(),
            Pull::Up => raw.into_input_pullup(),
            Pull::Down => raw.into_input_pulldown(),
        };
        debug!("GPIO {} claimed as input ({})", pin, pull);
        self.inputs.insert(pin, input);
        Ok(())
    }

    fn read(&mut self, pin: PinId) -> DynResult<Level> {
        let input = self
            .inputs
            .get(&pin)
            .ok_or_else(|| format!("GPIO {} is not configured as input", pin))?;
        Ok(from_gpio(input.read()))
    }

    fn write(&mut self, pin: PinId, level: Level) -> DynResult<()> {
        let output = self
            .outputs
            .get_mut(&pin)
            .ok_or_else(|| format!("GPIO {} is not configured as output", pin))?;
        output.write(to_gpio(level));
        Ok(())
    }
}
