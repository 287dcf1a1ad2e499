// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

pub mod client;
pub mod door;
pub mod pins;

pub type DynResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub use client::{ClientCommand, ClientEnvelope, ClientResponse};
pub use door::command::DoorCommand;
pub use door::config::DoorConfig;
pub use door::request::DoorRequest;
pub use door::response::{DoorError, DoorErrorKind, DoorResult};
pub use door::state::{DoorSnapshot, DoorState, SensorPosition, TargetState};
pub use pins::{Level, PinId, PinIo, Pull};
