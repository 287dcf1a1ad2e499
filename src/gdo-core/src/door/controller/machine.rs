// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Door state machine.
//!
//! The machine owns the published door state, the commanded target, the
//! relay sequencer and at most one motion episode. It never sleeps: every
//! timer is a deadline that the driving task waits for before calling
//! [`DoorStateMachine::advance`]. A completion timer carries the id of the
//! episode that armed it, so a timer left over from a cancelled episode can
//! never act on a newer one.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::door::config::DoorConfig;
use crate::door::response::MissingHardware;
use crate::pins::PinIo;
use crate::{DoorError, DoorResult, DoorSnapshot, DoorState, DynResult, SensorPosition, TargetState};

use super::arbiter::{ArbiterContext, Arbitration, SetTargetCommand};
use super::events::{DoorEventEmitter, DoorFault, DoorListener, ListenerId};
use super::policies::{retry_policy, CompletionPolicy, RetryPolicy};
use super::relay::{RelayEvent, RelaySequencer};
use super::sensor::SensorReader;

pub type EpisodeId = u64;

/// What started a motion episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeOrigin {
    /// An accepted target request pressed the relay.
    Command,
    /// The sensors saw the door leave a rest position on its own.
    External,
}

/// How the end of the current episode is being detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// Queued relay presses still have to start before travel is timed.
    AwaitingRelay,
    Polling { remaining: u32 },
    Watchdog,
}

/// The motion currently being supervised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionEpisode {
    pub id: EpisodeId,
    pub target: TargetState,
    pub origin: EpisodeOrigin,
    pub detection: Detection,
    /// Sensor position when the episode started.
    start: SensorPosition,
    /// Set once the sensors read `Unknown` during this episode.
    departed: bool,
    /// Relay presses spent on mismatch retries.
    attempts: u32,
}

/// The single outstanding completion timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionTimer {
    pub episode: EpisodeId,
    pub deadline: Instant,
}

/// Timer driven events processed by the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorEvent {
    RelayTimer,
    CompletionTimer(CompletionTimer),
    SensorPoll,
}

struct Wiring {
    sensor: SensorReader,
    relay: RelaySequencer,
}

/// The door state machine that reconciles sensors, commands and the relay.
pub struct DoorStateMachine {
    name: String,
    io: Box<dyn PinIo>,
    wiring: Result<Wiring, MissingHardware>,
    current: DoorState,
    target: TargetState,
    position: SensorPosition,
    completion: CompletionPolicy,
    retry: Box<dyn RetryPolicy>,
    reverse_presses: u8,
    poll_interval: Duration,
    next_poll: Instant,
    episode: Option<MotionEpisode>,
    timer: Option<CompletionTimer>,
    next_episode_id: EpisodeId,
    emitter: DoorEventEmitter,
    transition_count: u64,
}

impl DoorStateMachine {
    /// Claim the pins and determine the initial state.
    ///
    /// Missing relay or closed sensor wiring does not fail construction: the
    /// machine then stays inert and answers every request with a
    /// communication failure. Pin backend errors are returned.
    pub fn new(config: DoorConfig, mut io: Box<dyn PinIo>, now: Instant) -> DynResult<Self> {
        let timing = config.timing;
        let wiring = match config.check_hardware() {
            Ok((relay_pin, closed_pin)) => {
                let relay = RelaySequencer::new(
                    relay_pin,
                    timing.press,
                    timing.idle,
                    config.reverse_presses,
                );
                let sensor = SensorReader::new(closed_pin, config.open_sensor);
                relay.configure(io.as_mut())?;
                sensor.configure(io.as_mut())?;
                Ok(Wiring { sensor, relay })
            }
            Err(missing) => {
                if missing.relay {
                    error!("ERROR! No RELAY. Configuration is not supported.");
                }
                if missing.closed_sensor {
                    error!("ERROR! No CLOSED SENSOR. Configuration is not supported.");
                }
                error!("ERROR! The door will not work as expected. It will return communication errors.");
                Err(missing)
            }
        };

        info!("Sensor poll in ms: {}", timing.poll_interval.as_millis());
        info!("Door opens in ms: {}", timing.travel.as_millis());

        let position = match &wiring {
            Ok(w) => match w.sensor.read(io.as_mut()) {
                Ok(position) => position,
                Err(e) => {
                    warn!("Initial sensor read failed: {}", e);
                    SensorPosition::Unknown
                }
            },
            Err(_) => SensorPosition::Closed,
        };
        let current = position.as_door_state();
        let target = if current == DoorState::Closed {
            TargetState::Closed
        } else {
            TargetState::Open
        };
        info!("Initial door state: {}", current);

        Ok(Self {
            name: config.name,
            io,
            wiring,
            current,
            target,
            position,
            completion: CompletionPolicy::from_strategy(config.completion, &timing),
            retry: retry_policy(config.mismatch_retries),
            reverse_presses: config.reverse_presses,
            poll_interval: timing.poll_interval,
            next_poll: now + timing.poll_interval,
            episode: None,
            timer: None,
            next_episode_id: 1,
            emitter: DoorEventEmitter::new(),
            transition_count: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn current(&self) -> DoorState {
        self.current
    }

    pub fn target(&self) -> TargetState {
        self.target
    }

    /// Last sensor position seen by the machine.
    pub fn position(&self) -> SensorPosition {
        self.position
    }

    /// False when required hardware is missing.
    pub fn is_available(&self) -> bool {
        self.wiring.is_ok()
    }

    pub fn episode(&self) -> Option<&MotionEpisode> {
        self.episode.as_ref()
    }

    pub fn completion_timer(&self) -> Option<CompletionTimer> {
        self.timer
    }

    pub fn relay_available(&self) -> bool {
        self.wiring
            .as_ref()
            .map(|w| w.relay.is_available())
            .unwrap_or(false)
    }

    pub fn press_count(&self) -> u64 {
        self.wiring
            .as_ref()
            .map(|w| w.relay.press_count())
            .unwrap_or(0)
    }

    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    pub fn register_listener(&mut self, listener: Arc<dyn DoorListener>) -> ListenerId {
        self.emitter.register(listener)
    }

    pub fn unregister_listener(&mut self, id: ListenerId) {
        self.emitter.unregister(id);
    }

    pub fn snapshot(&self) -> DoorSnapshot {
        DoorSnapshot {
            name: self.name.clone(),
            available: self.is_available(),
            current: self.current,
            target: self.target,
            sensor: self.position,
            relay_available: self.relay_available(),
            in_motion: self.episode.is_some(),
            transition_count: self.transition_count,
        }
    }

    /// Snapshot for a reader. Fails permanently when hardware is missing.
    pub fn read_snapshot(&self) -> DoorResult<DoorSnapshot> {
        match &self.wiring {
            Ok(_) => Ok(self.snapshot()),
            Err(missing) => Err((*missing).into()),
        }
    }

    /// Earliest pending timer, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.due_event().map(|(_, at)| at)
    }

    /// Next timer event in firing order. Ties go relay, completion, poll.
    fn due_event(&self) -> Option<(DoorEvent, Instant)> {
        let wiring = self.wiring.as_ref().ok()?;
        let mut next = (DoorEvent::SensorPoll, self.next_poll);
        if let Some(timer) = self.timer {
            if timer.deadline <= next.1 {
                next = (DoorEvent::CompletionTimer(timer), timer.deadline);
            }
        }
        if let Some(at) = wiring.relay.next_deadline() {
            if at <= next.1 {
                next = (DoorEvent::RelayTimer, at);
            }
        }
        Some(next)
    }

    /// Process every timer event due at or before `now`.
    /// Returns the number of events processed.
    pub fn advance(&mut self, now: Instant) -> usize {
        let mut processed = 0;
        while let Some((event, at)) = self.due_event() {
            if at > now {
                break;
            }
            self.process_event(event, at);
            processed += 1;
        }
        processed
    }

    /// Handle one timer event scheduled for `at`.
    pub fn process_event(&mut self, event: DoorEvent, at: Instant) {
        if self.wiring.is_err() {
            return;
        }
        match event {
            DoorEvent::RelayTimer => self.on_relay_timer(at),
            DoorEvent::CompletionTimer(timer) => self.on_completion_timer(timer, at),
            DoorEvent::SensorPoll => {
                self.next_poll = at + self.poll_interval;
                self.on_sensor_poll(at);
            }
        }
    }

    /// Arbitrate and apply an external target request.
    pub fn request_target(&mut self, target: TargetState, now: Instant) -> DoorResult<DoorSnapshot> {
        if let Err(missing) = &self.wiring {
            return Err((*missing).into());
        }
        let observed = self
            .read_sensor()
            .map_err(|e| DoorError::communication_failure(format!("sensor read failed: {}", e)))?;

        let ctx = MachineView {
            target: self.target,
            observed,
            motion_target: self.episode.map(|ep| ep.target),
            relay_available: self.relay_available(),
        };

        match SetTargetCommand::new(target).arbitrate(&ctx) {
            Arbitration::Republish => {
                debug!("Door already heading to {}, nothing to do", target.rest());
                self.emitter.notify_publish(self.current, self.target);
            }
            Arbitration::Reject(err) => {
                warn!(
                    "Attempting to {} the door while relay is operating. Ignoring.",
                    target.verb()
                );
                return Err(err);
            }
            Arbitration::Move => {
                info!("Setting target state to {}", target);
                self.position = observed;
                self.cancel_completion();
                self.publish(target.motion(), target);
                self.fire_relay(now, 0);
                self.start_episode(target, EpisodeOrigin::Command, now, 0);
            }
            Arbitration::Reverse => {
                info!("Reversing door, setting target state to {}", target);
                self.position = observed;
                self.cancel_completion();
                self.publish(target.motion(), target);
                self.fire_relay(now, self.reverse_presses);
                self.start_episode(target, EpisodeOrigin::Command, now, 0);
            }
        }
        Ok(self.snapshot())
    }

    /// Force the relay off. Used when the owning task shuts down.
    pub fn shutdown(&mut self) {
        self.cancel_completion();
        self.episode = None;
        if let Ok(wiring) = self.wiring.as_mut() {
            wiring.relay.release(self.io.as_mut());
        }
    }

    fn read_sensor(&mut self) -> DynResult<SensorPosition> {
        match &self.wiring {
            Ok(wiring) => wiring.sensor.read(self.io.as_mut()),
            Err(missing) => Err(Box::new(*missing)),
        }
    }

    fn fire_relay(&mut self, now: Instant, refires: u8) -> bool {
        let fired = match self.wiring.as_mut() {
            Ok(wiring) => wiring
                .relay
                .try_fire_with_refires(self.io.as_mut(), now, refires),
            Err(_) => false,
        };
        if fired {
            self.emitter.notify_relay_change(true);
        }
        fired
    }

    fn queued_presses(&self) -> u8 {
        self.wiring
            .as_ref()
            .map(|w| w.relay.queued_presses())
            .unwrap_or(0)
    }

    /// Commit the observable pair and notify listeners.
    fn publish(&mut self, current: DoorState, target: TargetState) {
        let old_current = self.current;
        let old_target = self.target;
        self.current = current;
        self.target = target;

        if old_target != target {
            self.emitter.notify_target_state_change(old_target, target);
        }
        if old_current != current {
            self.emitter.notify_current_state_change(old_current, current);
        }
        if old_target != target || old_current != current {
            self.transition_count += 1;
        }
        self.emitter.notify_publish(current, target);
    }

    fn cancel_completion(&mut self) {
        if let Some(timer) = self.timer.take() {
            debug!("Cancelled completion timer of episode {}", timer.episode);
        }
    }

    /// Replace any running episode with a new one heading to `target`.
    fn start_episode(
        &mut self,
        target: TargetState,
        origin: EpisodeOrigin,
        at: Instant,
        attempts: u32,
    ) {
        self.cancel_completion();
        let id = self.next_episode_id;
        self.next_episode_id += 1;
        let start = self.position;
        self.episode = Some(MotionEpisode {
            id,
            target,
            origin,
            detection: Detection::AwaitingRelay,
            start,
            departed: origin == EpisodeOrigin::External || start == SensorPosition::Unknown,
            attempts,
        });
        if self.queued_presses() == 0 {
            self.arm_detection(at);
        }
    }

    fn arm_detection(&mut self, at: Instant) {
        let Some(episode) = self.episode.as_mut() else {
            return;
        };
        let (detection, deadline) = match self.completion {
            CompletionPolicy::BoundedPoll { every, count } => {
                (Detection::Polling { remaining: count }, at + every)
            }
            CompletionPolicy::Watchdog { timeout } => (Detection::Watchdog, at + timeout),
        };
        episode.detection = detection;
        self.timer = Some(CompletionTimer {
            episode: episode.id,
            deadline,
        });
    }

    fn on_relay_timer(&mut self, at: Instant) {
        let event = match self.wiring.as_mut() {
            Ok(wiring) => wiring.relay.advance(self.io.as_mut(), at),
            Err(_) => None,
        };
        let awaiting = matches!(
            self.episode,
            Some(MotionEpisode {
                detection: Detection::AwaitingRelay,
                ..
            })
        );
        match event {
            Some(RelayEvent::Released) => self.emitter.notify_relay_change(false),
            Some(RelayEvent::Refired) => {
                self.emitter.notify_relay_change(true);
                if awaiting && self.queued_presses() == 0 {
                    self.arm_detection(at);
                }
            }
            Some(RelayEvent::Available) => {
                if awaiting {
                    self.arm_detection(at);
                }
            }
            None => {}
        }
    }

    fn on_sensor_poll(&mut self, at: Instant) {
        if self.episode.is_some() && self.completion.owns_sampling() {
            return;
        }
        let reading = match self.read_sensor() {
            Ok(reading) => reading,
            Err(e) => {
                warn!("Sensor poll failed: {}", e);
                return;
            }
        };
        if self.episode.is_some() {
            self.observe_motion(reading, at, false);
            return;
        }
        if reading == self.position {
            return;
        }

        let previous = self.position;
        self.position = reading;
        match (reading.terminal(), previous.terminal()) {
            (Some(rest), _) => {
                info!("External device changed door state to {}", rest.rest());
                self.publish(rest.rest(), rest);
            }
            (None, Some(from)) => {
                let target = from.opposite();
                info!("External device changed door state to {}", target.motion());
                self.publish(target.motion(), target);
                self.start_episode(target, EpisodeOrigin::External, at, 0);
            }
            (None, None) => {}
        }
    }

    fn on_completion_timer(&mut self, timer: CompletionTimer, at: Instant) {
        let Some(episode) = self.episode else {
            debug!("Ignoring completion timer of finished episode {}", timer.episode);
            return;
        };
        if self.timer != Some(timer) || episode.id != timer.episode {
            debug!("Ignoring stale completion timer of episode {}", timer.episode);
            return;
        }
        self.timer = None;

        let reading = match self.read_sensor() {
            Ok(reading) => Some(reading),
            Err(e) => {
                warn!("Sensor read during motion failed: {}", e);
                None
            }
        };

        match (episode.detection, self.completion) {
            (Detection::Polling { remaining }, CompletionPolicy::BoundedPoll { every, .. }) => {
                let remaining = remaining.saturating_sub(1);
                if let Some(ep) = self.episode.as_mut() {
                    ep.detection = Detection::Polling { remaining };
                }
                if remaining > 0 {
                    self.timer = Some(CompletionTimer {
                        episode: episode.id,
                        deadline: at + every,
                    });
                }
                match reading {
                    Some(reading) => self.observe_motion(reading, at, remaining == 0),
                    None if remaining == 0 => self.finish_timeout(),
                    None => {}
                }
            }
            _ => match reading.and_then(SensorPosition::terminal) {
                Some(rest) => self.finish_terminal(rest, at),
                None => self.finish_timeout(),
            },
        }
    }

    /// Feed a reading taken while an episode is running.
    fn observe_motion(&mut self, reading: SensorPosition, at: Instant, exhausted: bool) {
        let Some(episode) = self.episode.as_mut() else {
            return;
        };
        self.position = reading;
        match reading.terminal() {
            None => {
                episode.departed = true;
                if exhausted {
                    self.finish_timeout();
                }
            }
            Some(rest) => {
                let still_at_start =
                    !episode.departed && reading == episode.start && rest != episode.target;
                if still_at_start && !exhausted {
                    return;
                }
                self.finish_terminal(rest, at);
            }
        }
    }

    /// The door came to rest at `rest`.
    fn finish_terminal(&mut self, rest: TargetState, at: Instant) {
        let Some(episode) = self.episode.take() else {
            return;
        };
        self.cancel_completion();

        if rest == episode.target {
            info!("The door is {}", rest.rest());
            self.publish(rest.rest(), rest);
            return;
        }

        warn!(
            "Was trying to {} the door, but it is {}",
            episode.target.verb(),
            rest.rest()
        );
        let fault = DoorFault::SensorMismatch {
            target: episode.target,
            observed: rest,
        };
        self.emitter.notify_fault(&fault);

        let may_retry = episode.origin == EpisodeOrigin::Command
            && self.retry.should_retry(episode.attempts, &fault);
        if may_retry && self.fire_relay(at, 0) {
            info!(
                "Retrying to {} the door (attempt {})",
                episode.target.verb(),
                episode.attempts + 1
            );
            self.start_episode(
                episode.target,
                EpisodeOrigin::Command,
                at,
                episode.attempts + 1,
            );
            return;
        }

        self.publish(rest.rest(), rest);
    }

    /// No terminal reading within the travel budget.
    fn finish_timeout(&mut self) {
        let Some(episode) = self.episode.take() else {
            return;
        };
        self.cancel_completion();
        warn!(
            "Door did not reach {} in time, assuming it stopped",
            episode.target.rest()
        );
        self.emitter.notify_fault(&DoorFault::MotionTimeout {
            target: episode.target,
        });
        self.position = SensorPosition::Unknown;
        self.publish(DoorState::Stopped, TargetState::Open);
    }
}

/// Arbiter view built from the machine for one request.
struct MachineView {
    target: TargetState,
    observed: SensorPosition,
    motion_target: Option<TargetState>,
    relay_available: bool,
}

impl ArbiterContext for MachineView {
    fn target(&self) -> TargetState {
        self.target
    }

    fn observed(&self) -> SensorPosition {
        self.observed
    }

    fn motion_target(&self) -> Option<TargetState> {
        self.motion_target
    }

    fn relay_available(&self) -> bool {
        self.relay_available
    }
}
