// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Minimal digital pin capability used by the door controller.
//!
//! The controller never talks to a GPIO library directly. Backends (real
//! hardware or the simulator) implement [`PinIo`] and the controller only
//! relies on the four operations below plus the [`Level`] and [`Pull`]
//! enumerations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::DynResult;

/// Pin number as understood by the backend (BCM numbering on a Raspberry Pi).
pub type PinId = u8;

/// Logic level of a digital line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    High,
}

impl Level {
    /// Map a configured 0/1 value to a level. Anything non-zero is high.
    pub fn from_bit(bit: u8) -> Self {
        if bit == 0 {
            Level::Low
        } else {
            Level::High
        }
    }

    pub fn as_bit(self) -> u8 {
        match self {
            Level::Low => 0,
            Level::High => 1,
        }
    }

    pub fn inverted(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }

    /// Human readable polarity when this level is the "active" one.
    pub fn polarity_label(self) -> &'static str {
        match self {
            Level::Low => "Active Low",
            Level::High => "Active High",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_bit())
    }
}

/// Internal pull resistor configuration for an input line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pull {
    #[default]
    Off,
    Down,
    Up,
}

impl fmt::Display for Pull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pull::Off => write!(f, "Disabled"),
            Pull::Down => write!(f, "Pull Down"),
            Pull::Up => write!(f, "Pull Up"),
        }
    }
}

/// Digital line access provided by a pin backend.
pub trait PinIo: Send {
    /// Claim `pin` as an output and drive it to `initial` right away.
    fn configure_output(&mut self, pin: PinId, initial: Level) -> DynResult<()>;

    /// Claim `pin` as an input with the given pull resistor mode.
    fn configure_input(&mut self, pin: PinId, pull: Pull) -> DynResult<()>;

    /// Sample the current level of an input pin.
    fn read(&mut self, pin: PinId) -> DynResult<Level>;

    /// Drive an output pin.
    fn write(&mut self, pin: PinId, level: Level) -> DynResult<()>;
}
