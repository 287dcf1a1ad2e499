// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Door task: the single owner of the door state machine.
//!
//! Timers, client requests and shutdown are multiplexed on one task, so the
//! machine never sees two events at once.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

use gdo_backend::RegistrationContext;
use gdo_core::door::controller::{DoorFault, DoorListener, DoorStateMachine};
use gdo_core::{
    DoorCommand, DoorConfig, DoorRequest, DoorState, DynResult, PinIo, TargetState,
};

use crate::door_handle::DoorStatus;

/// Configuration for the door task.
pub struct DoorTaskConfig {
    pub registry: Arc<RegistrationContext>,
    pub backend: String,
    pub door: DoorConfig,
    /// Pins built by the caller; skips the registry factory when set.
    pub prebuilt_pins: Option<Box<dyn PinIo>>,
}

impl Default for DoorTaskConfig {
    fn default() -> Self {
        let mut registry = RegistrationContext::new();
        gdo_backend::register_builtin_backends_on(&mut registry);
        Self {
            registry: Arc::new(registry),
            backend: "sim".to_string(),
            door: DoorConfig::default(),
            prebuilt_pins: None,
        }
    }
}

/// Logs what the machine reports.
struct LogListener;

impl DoorListener for LogListener {
    fn on_current_state_change(&self, old: DoorState, new: DoorState) {
        info!("State changed from {} to {}", old, new);
    }

    fn on_target_state_change(&self, old: TargetState, new: TargetState) {
        debug!("Target changed from {} to {}", old, new);
    }

    fn on_relay_change(&self, engaged: bool) {
        debug!("Relay {}", if engaged { "engaged" } else { "released" });
    }

    fn on_fault(&self, fault: &DoorFault) {
        warn!("Door fault: {}", fault);
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn publish(machine: &DoorStateMachine, state_tx: &watch::Sender<DoorStatus>) {
    let status = machine.read_snapshot();
    state_tx.send_if_modified(|current| {
        if *current == status {
            false
        } else {
            *current = status;
            true
        }
    });
}

/// Run the door task until shutdown is signalled or every sender is gone.
pub async fn run_door_task(
    config: DoorTaskConfig,
    mut rx: mpsc::Receiver<DoorRequest>,
    state_tx: watch::Sender<DoorStatus>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> DynResult<()> {
    let pins = match config.prebuilt_pins {
        Some(pins) => pins,
        None => {
            info!("Opening pin backend {}", config.backend);
            config.registry.build_pins(&config.backend, &config.door)?
        }
    };

    let mut machine = DoorStateMachine::new(config.door, pins, Instant::now())?;
    machine.register_listener(Arc::new(LogListener));
    publish(&machine, &state_tx);
    info!("Door task ready: {}", machine.name());

    loop {
        if *shutdown_rx.borrow() {
            break;
        }
        let deadline = machine.next_deadline();

        tokio::select! {
            _ = wait_until(deadline) => {
                machine.advance(Instant::now());
            }

            maybe_req = rx.recv() => {
                let Some(DoorRequest { cmd, respond_to }) = maybe_req else {
                    break;
                };
                let result = match cmd {
                    DoorCommand::GetSnapshot => machine.read_snapshot(),
                    DoorCommand::SetTarget(target) => {
                        machine.request_target(target, Instant::now())
                    }
                };
                if respond_to.send(result).is_err() {
                    debug!("Requester for {:?} went away", cmd);
                }
            }

            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    error!("Shutdown channel closed");
                    break;
                }
            }
        }

        publish(&machine, &state_tx);
    }

    machine.shutdown();
    publish(&machine, &state_tx);
    info!("door_task shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use gdo_backend::{SimDoor, SimPins};
    use gdo_core::door::config::{RelayPin, SensorPin};
    use gdo_core::{DoorError, DoorErrorKind, Level, Pull};
    use tokio::task::JoinHandle;

    use crate::door_handle::DoorHandle;

    fn door_config(open_sensor: bool) -> DoorConfig {
        DoorConfig {
            name: "Test Door".to_string(),
            relay: Some(RelayPin {
                pin: 17,
                active: Level::High,
            }),
            closed_sensor: Some(SensorPin {
                pin: 27,
                active: Level::Low,
                pull: Pull::Up,
            }),
            open_sensor: open_sensor.then_some(SensorPin {
                pin: 22,
                active: Level::Low,
                pull: Pull::Up,
            }),
            ..DoorConfig::default()
        }
    }

    struct Harness {
        handle: DoorHandle,
        shutdown_tx: watch::Sender<bool>,
        task: JoinHandle<DynResult<()>>,
    }

    fn spawn(door: DoorConfig, pins: Option<Box<dyn PinIo>>) -> Harness {
        let (door_tx, rx) = mpsc::channel(8);
        let (state_tx, state_rx) = watch::channel(Err(DoorError::communication_failure(
            "door task starting",
        )));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let config = DoorTaskConfig {
            door,
            prebuilt_pins: pins,
            ..DoorTaskConfig::default()
        };
        let task = tokio::spawn(run_door_task(config, rx, state_tx, shutdown_rx));
        Harness {
            handle: DoorHandle {
                name: "Test Door".to_string(),
                door_tx,
                state_rx,
            },
            shutdown_tx,
            task,
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_with_both_sensors() {
        let h = spawn(door_config(true), None);
        settle().await;
        assert_eq!(h.handle.status().unwrap().current, DoorState::Closed);

        let snap = h
            .handle
            .request(DoorCommand::SetTarget(TargetState::Open))
            .await
            .unwrap();
        assert_eq!(snap.current, DoorState::Opening);

        time::sleep(Duration::from_secs(8)).await;
        assert_eq!(h.handle.status().unwrap().current, DoorState::Opening);

        time::sleep(Duration::from_secs(8)).await;
        let snap = h.handle.status().unwrap();
        assert_eq!(snap.current, DoorState::Open);
        assert_eq!(snap.target, TargetState::Open);
        assert!(!snap.in_motion);

        h.shutdown_tx.send(true).unwrap();
        assert!(h.task.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_with_closed_sensor_only_ends_stopped() {
        let h = spawn(door_config(false), None);
        h.handle
            .request(DoorCommand::SetTarget(TargetState::Open))
            .await
            .unwrap();

        time::sleep(Duration::from_millis(15_010)).await;
        assert_eq!(h.handle.status().unwrap().current, DoorState::Opening);

        time::sleep(Duration::from_millis(100)).await;
        let snap = h.handle.status().unwrap();
        assert_eq!(snap.current, DoorState::Stopped);
        assert_eq!(snap.target, TargetState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_rejection() {
        let h = spawn(door_config(true), None);
        h.handle
            .request(DoorCommand::SetTarget(TargetState::Open))
            .await
            .unwrap();
        time::sleep(Duration::from_millis(100)).await;

        let err = h
            .handle
            .request(DoorCommand::SetTarget(TargetState::Closed))
            .await
            .unwrap_err();
        assert_eq!(err.kind, DoorErrorKind::Busy);
        assert_eq!(h.handle.status().unwrap().target, TargetState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wall_button_is_followed() {
        let pins = SimPins::new(SimDoor::from_config(&door_config(true)));
        let door = pins.door();
        let h = spawn(door_config(true), Some(Box::new(pins)));
        settle().await;

        door.lock().unwrap().press_at(Instant::now());
        time::sleep(Duration::from_millis(1_500)).await;
        let snap = h.handle.status().unwrap();
        assert_eq!(snap.current, DoorState::Opening);
        assert_eq!(snap.target, TargetState::Open);

        time::sleep(Duration::from_secs(16)).await;
        assert_eq!(h.handle.status().unwrap().current, DoorState::Open);
        assert_eq!(door.lock().unwrap().presses(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_hardware_reports_failure() {
        let mut cfg = door_config(true);
        cfg.closed_sensor = None;
        let h = spawn(cfg, None);
        settle().await;

        assert_eq!(
            h.handle.status().unwrap_err().kind,
            DoorErrorKind::CommunicationFailure
        );
        let err = h
            .handle
            .request(DoorCommand::SetTarget(TargetState::Open))
            .await
            .unwrap_err();
        assert_eq!(err.kind, DoorErrorKind::CommunicationFailure);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_mid_press() {
        let h = spawn(door_config(true), None);
        h.handle
            .request(DoorCommand::SetTarget(TargetState::Open))
            .await
            .unwrap();
        h.shutdown_tx.send(true).unwrap();
        assert!(h.task.await.unwrap().is_ok());

        let err = h
            .handle
            .request(DoorCommand::GetSnapshot)
            .await
            .unwrap_err();
        assert_eq!(err.kind, DoorErrorKind::CommunicationFailure);
    }
}
