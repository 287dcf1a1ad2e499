// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Door event notification system.
//!
//! This module provides typed event notifications for door state changes,
//! allowing the server and other components to react to specific events.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::{DoorState, TargetState};

/// Unique identifier for a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Anomaly detected while supervising a motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorFault {
    /// No terminal sensor reading within the travel budget.
    MotionTimeout { target: TargetState },
    /// The door came to rest at the other endpoint.
    SensorMismatch {
        target: TargetState,
        observed: TargetState,
    },
}

impl DoorFault {
    pub fn is_mismatch(&self) -> bool {
        matches!(self, Self::SensorMismatch { .. })
    }
}

impl fmt::Display for DoorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MotionTimeout { target } => {
                write!(f, "door did not reach {} in time", target.rest())
            }
            Self::SensorMismatch { target, observed } => write!(
                f,
                "was trying to {} the door, but it is {}",
                target.verb(),
                observed.rest()
            ),
        }
    }
}

/// Trait for components that want to receive door events.
///
/// All methods have default no-op implementations, so listeners can
/// selectively override only the events they care about.
pub trait DoorListener: Send + Sync {
    /// Called for every publish of the observable pair, changed or not.
    fn on_publish(&self, _current: DoorState, _target: TargetState) {}

    /// Called when the current door state changes.
    fn on_current_state_change(&self, _old: DoorState, _new: DoorState) {}

    /// Called when the target door state changes.
    fn on_target_state_change(&self, _old: TargetState, _new: TargetState) {}

    /// Called when the relay is engaged or released.
    fn on_relay_change(&self, _engaged: bool) {}

    /// Called when a motion ends badly.
    fn on_fault(&self, _fault: &DoorFault) {}
}

/// Manages registered listeners and dispatches events.
pub struct DoorEventEmitter {
    listeners: Vec<(ListenerId, Arc<dyn DoorListener>)>,
}

impl Default for DoorEventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl DoorEventEmitter {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Register a listener to receive events.
    /// Returns an ID that can be used to unregister the listener.
    pub fn register(&mut self, listener: Arc<dyn DoorListener>) -> ListenerId {
        let id = ListenerId::new();
        self.listeners.push((id, listener));
        id
    }

    pub fn unregister(&mut self, id: ListenerId) {
        self.listeners.retain(|(lid, _)| *lid != id);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn notify_publish(&self, current: DoorState, target: TargetState) {
        for (_, listener) in &self.listeners {
            listener.on_publish(current, target);
        }
    }

    pub fn notify_current_state_change(&self, old: DoorState, new: DoorState) {
        for (_, listener) in &self.listeners {
            listener.on_current_state_change(old, new);
        }
    }

    pub fn notify_target_state_change(&self, old: TargetState, new: TargetState) {
        for (_, listener) in &self.listeners {
            listener.on_target_state_change(old, new);
        }
    }

    pub fn notify_relay_change(&self, engaged: bool) {
        for (_, listener) in &self.listeners {
            listener.on_relay_change(engaged);
        }
    }

    pub fn notify_fault(&self, fault: &DoorFault) {
        for (_, listener) in &self.listeners {
            listener.on_fault(fault);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    struct TestListener {
        current_changed: AtomicBool,
        relay_engaged: AtomicBool,
    }

    impl TestListener {
        fn new() -> Self {
            Self {
                current_changed: AtomicBool::new(false),
                relay_engaged: AtomicBool::new(false),
            }
        }
    }

    impl DoorListener for TestListener {
        fn on_current_state_change(&self, _old: DoorState, _new: DoorState) {
            self.current_changed.store(true, Ordering::Relaxed);
        }

        fn on_relay_change(&self, engaged: bool) {
            self.relay_engaged.store(engaged, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_register_and_notify() {
        let mut emitter = DoorEventEmitter::new();
        let listener = Arc::new(TestListener::new());
        let id = emitter.register(listener.clone());

        assert_eq!(emitter.listener_count(), 1);

        emitter.notify_current_state_change(DoorState::Closed, DoorState::Opening);
        assert!(listener.current_changed.load(Ordering::Relaxed));
        assert!(!listener.relay_engaged.load(Ordering::Relaxed));

        emitter.notify_relay_change(true);
        assert!(listener.relay_engaged.load(Ordering::Relaxed));

        emitter.unregister(id);
        assert_eq!(emitter.listener_count(), 0);
    }

    #[test]
    fn test_fault_display() {
        let fault = DoorFault::SensorMismatch {
            target: TargetState::Closed,
            observed: TargetState::Open,
        };
        assert!(fault.is_mismatch());
        assert_eq!(
            fault.to_string(),
            "was trying to close the door, but it is OPEN"
        );
    }
}
