// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical door state published to the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoorState {
    Open,
    Closed,
    Opening,
    Closing,
    /// Motion ceased at neither endpoint. Inferred, never sensed.
    Stopped,
}

impl DoorState {
    pub fn is_moving(self) -> bool {
        matches!(self, Self::Opening | Self::Closing)
    }
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
            Self::Opening => "OPENING",
            Self::Closing => "CLOSING",
            Self::Stopped => "STOPPED",
        };
        write!(f, "{}", s)
    }
}

/// Commanded end state of the door.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetState {
    Open,
    Closed,
}

impl TargetState {
    pub fn opposite(self) -> Self {
        match self {
            Self::Open => Self::Closed,
            Self::Closed => Self::Open,
        }
    }

    /// State reported while travelling toward this target.
    pub fn motion(self) -> DoorState {
        match self {
            Self::Open => DoorState::Opening,
            Self::Closed => DoorState::Closing,
        }
    }

    /// State reported once this target has been reached.
    pub fn rest(self) -> DoorState {
        match self {
            Self::Open => DoorState::Open,
            Self::Closed => DoorState::Closed,
        }
    }

    /// Verb used in log lines ("trying to close the door").
    pub fn verb(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "close",
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Closed => write!(f, "CLOSE"),
        }
    }
}

/// Position derived from the door sensors on a single poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorPosition {
    Closed,
    Open,
    Unknown,
}

impl SensorPosition {
    /// The rest position this reading proves, if any.
    pub fn terminal(self) -> Option<TargetState> {
        match self {
            Self::Closed => Some(TargetState::Closed),
            Self::Open => Some(TargetState::Open),
            Self::Unknown => None,
        }
    }

    /// Door state implied by this reading with no other context.
    pub fn as_door_state(self) -> DoorState {
        match self {
            Self::Closed => DoorState::Closed,
            Self::Open => DoorState::Open,
            Self::Unknown => DoorState::Stopped,
        }
    }
}

impl fmt::Display for SensorPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Read-only view of the door, sent to clients and watchers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorSnapshot {
    pub name: String,
    /// False when the relay or closed sensor is not configured.
    pub available: bool,
    pub current: DoorState,
    pub target: TargetState,
    pub sensor: SensorPosition,
    pub relay_available: bool,
    pub in_motion: bool,
    #[serde(default)]
    pub transition_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_helpers() {
        assert_eq!(TargetState::Open.opposite(), TargetState::Closed);
        assert_eq!(TargetState::Closed.motion(), DoorState::Closing);
        assert_eq!(TargetState::Open.rest(), DoorState::Open);
        assert!(TargetState::Open.motion().is_moving());
        assert!(!DoorState::Stopped.is_moving());
    }

    #[test]
    fn test_sensor_position_terminal() {
        assert_eq!(SensorPosition::Closed.terminal(), Some(TargetState::Closed));
        assert_eq!(SensorPosition::Open.terminal(), Some(TargetState::Open));
        assert_eq!(SensorPosition::Unknown.terminal(), None);
        assert_eq!(SensorPosition::Unknown.as_door_state(), DoorState::Stopped);
    }

    #[test]
    fn test_display() {
        assert_eq!(DoorState::Opening.to_string(), "OPENING");
        assert_eq!(TargetState::Closed.to_string(), "CLOSE");
        assert_eq!(TargetState::Closed.verb(), "close");
    }

    #[test]
    fn test_snapshot_json() {
        let snapshot = DoorSnapshot {
            name: "Garage".to_string(),
            available: true,
            current: DoorState::Closing,
            target: TargetState::Closed,
            sensor: SensorPosition::Unknown,
            relay_available: false,
            in_motion: true,
            transition_count: 3,
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["current"], "closing");
        assert_eq!(json["target"], "closed");
        assert_eq!(json["sensor"], "unknown");
    }
}
