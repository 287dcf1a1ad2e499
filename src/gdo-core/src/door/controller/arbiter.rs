// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Arbitration of externally requested target changes.
//!
//! The arbiter only decides; the state machine carries the decision out.
//! Keeping the rules here as a pure function of an [`ArbiterContext`] makes
//! every combination of door and relay state easy to check in isolation.

use crate::{DoorError, SensorPosition, TargetState};

/// What the state machine should do with a target request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arbitration {
    /// Nothing to do; publish the current values again.
    Republish,
    /// Press the relay once and start supervising a new motion.
    Move,
    /// Door is travelling the other way: cancel that motion and reverse it.
    Reverse,
    /// Refuse without touching any state.
    Reject(DoorError),
}

impl Arbitration {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Self::Reject(_))
    }
}

/// View of the door the arbiter decides on.
pub trait ArbiterContext {
    /// Currently commanded target.
    fn target(&self) -> TargetState;

    /// Position sampled for this request.
    fn observed(&self) -> SensorPosition;

    /// Target of the motion being supervised, if any.
    fn motion_target(&self) -> Option<TargetState>;

    /// True when the relay can be pressed right now.
    fn relay_available(&self) -> bool;
}

/// A request to drive the door to `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetTargetCommand {
    pub target: TargetState,
}

impl SetTargetCommand {
    pub fn new(target: TargetState) -> Self {
        Self { target }
    }

    pub fn arbitrate(&self, ctx: &dyn ArbiterContext) -> Arbitration {
        let heading = ctx.motion_target();
        if heading.is_none()
            && self.target == ctx.target()
            && ctx.observed().terminal() == Some(self.target)
        {
            return Arbitration::Republish;
        }

        if !ctx.relay_available() {
            return Arbitration::Reject(DoorError::busy(self.target));
        }

        match heading {
            // Already travelling there; pressing again would stop the door.
            Some(heading) if heading == self.target => Arbitration::Republish,
            Some(_) => Arbitration::Reverse,
            None => Arbitration::Move,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DoorErrorKind;

    struct Ctx {
        target: TargetState,
        observed: SensorPosition,
        motion_target: Option<TargetState>,
        relay_available: bool,
    }

    impl ArbiterContext for Ctx {
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

    fn at_rest_closed() -> Ctx {
        Ctx {
            target: TargetState::Closed,
            observed: SensorPosition::Closed,
            motion_target: None,
            relay_available: true,
        }
    }

    #[test]
    fn test_same_target_at_rest_is_noop() {
        let ctx = at_rest_closed();
        assert_eq!(
            SetTargetCommand::new(TargetState::Closed).arbitrate(&ctx),
            Arbitration::Republish
        );
    }

    #[test]
    fn test_noop_wins_over_busy_relay() {
        let mut ctx = at_rest_closed();
        ctx.relay_available = false;
        assert_eq!(
            SetTargetCommand::new(TargetState::Closed).arbitrate(&ctx),
            Arbitration::Republish
        );
    }

    #[test]
    fn test_move_from_rest() {
        let ctx = at_rest_closed();
        let decision = SetTargetCommand::new(TargetState::Open).arbitrate(&ctx);
        assert_eq!(decision, Arbitration::Move);
        assert!(decision.is_accepted());
    }

    #[test]
    fn test_move_when_sensor_disagrees_with_target() {
        let mut ctx = at_rest_closed();
        ctx.observed = SensorPosition::Unknown;
        assert_eq!(
            SetTargetCommand::new(TargetState::Closed).arbitrate(&ctx),
            Arbitration::Move
        );
    }

    #[test]
    fn test_busy_relay_rejects() {
        let mut ctx = at_rest_closed();
        ctx.relay_available = false;
        match SetTargetCommand::new(TargetState::Open).arbitrate(&ctx) {
            Arbitration::Reject(err) => assert_eq!(err.kind, DoorErrorKind::Busy),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_reverse_mid_travel() {
        let ctx = Ctx {
            target: TargetState::Open,
            observed: SensorPosition::Unknown,
            motion_target: Some(TargetState::Open),
            relay_available: true,
        };
        assert_eq!(
            SetTargetCommand::new(TargetState::Closed).arbitrate(&ctx),
            Arbitration::Reverse
        );
    }

    #[test]
    fn test_same_heading_mid_travel_is_noop() {
        let ctx = Ctx {
            target: TargetState::Open,
            observed: SensorPosition::Unknown,
            motion_target: Some(TargetState::Open),
            relay_available: true,
        };
        assert_eq!(
            SetTargetCommand::new(TargetState::Open).arbitrate(&ctx),
            Arbitration::Republish
        );
    }

    #[test]
    fn test_same_heading_while_relay_busy_rejects() {
        let ctx = Ctx {
            target: TargetState::Open,
            observed: SensorPosition::Closed,
            motion_target: Some(TargetState::Open),
            relay_available: false,
        };
        match SetTargetCommand::new(TargetState::Open).arbitrate(&ctx) {
            Arbitration::Reject(err) => assert_eq!(err.kind, DoorErrorKind::Busy),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_reverse_while_relay_busy_rejects() {
        let ctx = Ctx {
            target: TargetState::Open,
            observed: SensorPosition::Closed,
            motion_target: Some(TargetState::Open),
            relay_available: false,
        };
        assert!(!SetTargetCommand::new(TargetState::Closed)
            .arbitrate(&ctx)
            .is_accepted());
    }
}
