// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Configuration file support for gdo-server.
//!
//! Config is loaded from the `[gdo-server]` section of `gdo-rs.toml`.
//! Default search order:
//! 1. Path specified via `--config` CLI argument
//! 2. `./gdo-rs.toml`
//! 3. `~/.config/gdo-rs/gdo-rs.toml`
//! 4. `/etc/gdo-rs/gdo-rs.toml`

use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use gdo_app::ConfigFile;
use gdo_core::door::config::{DoorTiming, RelayPin, SensorPin};
use gdo_core::door::controller::CompletionStrategy;
use gdo_core::{DoorConfig, Level, PinId, Pull};

/// Top-level server configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Door wiring and timing
    pub door: DoorSection,
    /// Motion supervision behavior
    pub behavior: BehaviorConfig,
    /// TCP listener configuration
    pub listen: ListenConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,
}

/// Door wiring and timing.
///
/// Pins are optional: a door without a relay or a closed sensor still starts
/// and answers every request with a communication failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DoorSection {
    /// Display name of the door
    pub name: String,
    /// Pin backend ("sim", "rppal")
    pub backend: String,
    pub relay_pin: Option<PinId>,
    /// Level (0/1) that engages the relay
    pub relay_value: u8,
    pub press_time_ms: u64,
    pub idle_time_ms: u64,
    pub closed_sensor_pin: Option<PinId>,
    /// Level (0/1) read when the door is closed
    pub closed_sensor_value: u8,
    pub closed_sensor_pull: Pull,
    pub open_sensor_pin: Option<PinId>,
    /// Level (0/1) read when the door is fully open
    pub open_sensor_value: u8,
    pub open_sensor_pull: Pull,
    pub poll_interval_ms: u64,
    /// Time the door needs for a full open or close
    pub travel_time_ms: u64,
}

impl Default for DoorSection {
    fn default() -> Self {
        Self {
            name: "Garage Door".to_string(),
            backend: "sim".to_string(),
            relay_pin: None,
            relay_value: 1,
            press_time_ms: 500,
            idle_time_ms: 500,
            closed_sensor_pin: None,
            closed_sensor_value: 0,
            closed_sensor_pull: Pull::Off,
            open_sensor_pin: None,
            open_sensor_value: 0,
            open_sensor_pull: Pull::Off,
            poll_interval_ms: 1000,
            travel_time_ms: 15_000,
        }
    }
}

/// Motion supervision behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// How the end of a motion is detected ("poll" or "watchdog")
    pub completion: CompletionStrategy,
    /// Extra presses when a commanded motion ends at the wrong endpoint
    pub mismatch_retries: u32,
    /// Presses queued after the first when reversing a moving door
    pub reverse_presses: u8,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            completion: CompletionStrategy::Poll,
            mismatch_retries: 1,
            reverse_presses: 1,
        }
    }
}

/// TCP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    /// Whether the listener is enabled
    pub enabled: bool,
    /// IP address to listen on
    pub listen: IpAddr,
    /// TCP port to listen on
    pub port: u16,
    /// Authentication configuration
    pub auth: AuthConfig,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
            port: 4540,
            auth: AuthConfig::default(),
        }
    }
}

/// Authentication configuration for the TCP listener.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Valid authentication tokens (empty = no auth required)
    pub tokens: Vec<String>,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_log_level(self.general.log_level.as_deref())?;

        let door = &self.door;
        if door.backend.trim().is_empty() {
            return Err("[door].backend must not be empty".to_string());
        }
        for (key, value) in [
            ("press_time_ms", door.press_time_ms),
            ("idle_time_ms", door.idle_time_ms),
            ("poll_interval_ms", door.poll_interval_ms),
            ("travel_time_ms", door.travel_time_ms),
        ] {
            if value == 0 {
                return Err(format!("[door].{key} must be > 0"));
            }
        }
        if door.travel_time_ms < door.poll_interval_ms {
            return Err("[door].travel_time_ms must be >= [door].poll_interval_ms".to_string());
        }
        for (key, value) in [
            ("relay_value", door.relay_value),
            ("closed_sensor_value", door.closed_sensor_value),
            ("open_sensor_value", door.open_sensor_value),
        ] {
            if value > 1 {
                return Err(format!("[door].{key} must be 0 or 1"));
            }
        }

        validate_tokens("[listen.auth].tokens", &self.listen.auth.tokens)?;
        if self.listen.enabled && self.listen.port == 0 {
            return Err("[listen].port must be > 0 when listener is enabled".to_string());
        }
        Ok(())
    }

    /// Build the controller configuration from the `[door]` and `[behavior]` sections.
    pub fn door_config(&self) -> DoorConfig {
        let door = &self.door;
        DoorConfig {
            name: door.name.clone(),
            relay: door.relay_pin.map(|pin| RelayPin {
                pin,
                active: Level::from_bit(door.relay_value),
            }),
            closed_sensor: door.closed_sensor_pin.map(|pin| SensorPin {
                pin,
                active: Level::from_bit(door.closed_sensor_value),
                pull: door.closed_sensor_pull,
            }),
            open_sensor: door.open_sensor_pin.map(|pin| SensorPin {
                pin,
                active: Level::from_bit(door.open_sensor_value),
                pull: door.open_sensor_pull,
            }),
            timing: DoorTiming {
                press: Duration::from_millis(door.press_time_ms),
                idle: Duration::from_millis(door.idle_time_ms),
                poll_interval: Duration::from_millis(door.poll_interval_ms),
                travel: Duration::from_millis(door.travel_time_ms),
            },
            completion: self.behavior.completion,
            mismatch_retries: self.behavior.mismatch_retries,
            reverse_presses: self.behavior.reverse_presses,
        }
    }

    pub fn example_toml() -> String {
        #[derive(Serialize)]
        struct Document<'a> {
            #[serde(rename = "gdo-server")]
            server: &'a ServerConfig,
        }

        let example = ServerConfig {
            general: GeneralConfig {
                log_level: Some("info".to_string()),
            },
            door: DoorSection {
                relay_pin: Some(17),
                closed_sensor_pin: Some(27),
                closed_sensor_pull: Pull::Up,
                open_sensor_pin: Some(22),
                open_sensor_pull: Pull::Up,
                ..DoorSection::default()
            },
            behavior: BehaviorConfig::default(),
            listen: ListenConfig::default(),
        };

        toml::to_string_pretty(&Document { server: &example }).unwrap_or_default()
    }
}

fn validate_log_level(level: Option<&str>) -> Result<(), String> {
    if let Some(level) = level {
        match level {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(format!(
                    "[general].log_level '{}' is invalid (expected one of: trace, debug, info, warn, error)",
                    level
                ))
            }
        }
    }
    Ok(())
}

fn validate_tokens(path: &str, tokens: &[String]) -> Result<(), String> {
    if tokens.iter().any(|t| t.trim().is_empty()) {
        return Err(format!("{path} must not contain empty tokens"));
    }
    Ok(())
}

impl ConfigFile for ServerConfig {
    fn section_key() -> &'static str {
        "gdo-server"
    }
}
