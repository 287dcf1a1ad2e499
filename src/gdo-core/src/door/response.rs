// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::TargetState;

/// Error codes handed back to whoever asked for a read or a target change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorErrorKind {
    /// The relay is still pressing or cooling down from a recent actuation.
    Busy,
    /// The door hardware is not usable (missing pins, failed reads).
    CommunicationFailure,
}

/// Error type returned by door requests.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct DoorError {
    pub kind: DoorErrorKind,
    pub message: String,
}

pub type DoorResult<T> = Result<T, DoorError>;

impl DoorError {
    pub fn new(kind: DoorErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn busy(target: TargetState) -> Self {
        Self::new(
            DoorErrorKind::Busy,
            format!("cannot {} the door while the relay is operating", target.verb()),
        )
    }

    pub fn communication_failure(message: impl Into<String>) -> Self {
        Self::new(DoorErrorKind::CommunicationFailure, message)
    }

    pub fn is_busy(&self) -> bool {
        self.kind == DoorErrorKind::Busy
    }
}

/// Required door hardware absent at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("missing hardware configuration (relay: {relay}, closed sensor: {closed_sensor})")]
pub struct MissingHardware {
    /// True when the relay pin is missing.
    pub relay: bool,
    /// True when the closed sensor pin is missing.
    pub closed_sensor: bool,
}

impl From<MissingHardware> for DoorError {
    fn from(value: MissingHardware) -> Self {
        DoorError::communication_failure(value.to_string())
    }
}
