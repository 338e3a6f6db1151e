// Four-phase walking gait: right leg swings, rests, left leg swings, rests
//
// The controller never sleeps. Each poll either fires the single pending
// transition (one leg write) or returns immediately.

use serde::Serialize;
use tracing::{debug, warn};

use crate::clock::{elapsed_ms, Millis};
use crate::legs::{LegActuator, LegId, ServoCommand};

/// Phase of the walking cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GaitState {
    LeftStop,
    RightMoving,
    RightStop,
    LeftMoving,
}

impl GaitState {
    /// Dwell required before leaving this phase
    fn dwell(self, motion_dwell: Millis, stop_dwell: Millis) -> Millis {
        match self {
            GaitState::RightMoving | GaitState::LeftMoving => motion_dwell,
            GaitState::LeftStop | GaitState::RightStop => stop_dwell,
        }
    }

    /// Leg write performed on leaving this phase, and the phase entered
    fn transition(self) -> (LegId, ServoCommand, GaitState) {
        match self {
            GaitState::LeftStop => (LegId::Right, ServoCommand::MoveRight, GaitState::RightMoving),
            GaitState::RightMoving => (LegId::Right, ServoCommand::Stop, GaitState::RightStop),
            GaitState::RightStop => (LegId::Left, ServoCommand::MoveLeft, GaitState::LeftMoving),
            GaitState::LeftMoving => (LegId::Left, ServoCommand::Stop, GaitState::LeftStop),
        }
    }
}

/// Non-blocking right/left alternating gait
#[derive(Debug, Clone)]
pub struct GaitController {
    state: GaitState,
    last_transition: Millis,
}

impl GaitController {
    pub fn new() -> Self {
        Self {
            state: GaitState::LeftStop,
            last_transition: 0,
        }
    }

    /// Restart the cycle at `LeftStop`, counting dwell from `now`
    pub fn reset(&mut self, now: Millis) {
        self.state = GaitState::LeftStop;
        self.last_transition = now;
    }

    pub fn state(&self) -> GaitState {
        self.state
    }

    pub fn last_transition(&self) -> Millis {
        self.last_transition
    }

    /// Advance the gait by at most one step
    ///
    /// `motion_dwell` is how long a leg stays actuated and `stop_dwell` how
    /// long both legs rest between swings; both may change from call to call.
    /// Returns the leg write that fired, or `None` if the current phase has
    /// not lasted long enough yet.
    ///
    /// A failed write is logged and the cycle still advances.
    pub fn poll<A: LegActuator + ?Sized>(
        &mut self,
        legs: &mut A,
        now: Millis,
        motion_dwell: Millis,
        stop_dwell: Millis,
    ) -> Option<(LegId, ServoCommand)> {
        let required = self.state.dwell(motion_dwell, stop_dwell);
        if elapsed_ms(now, self.last_transition) < required {
            return None;
        }

        let (leg, command, next) = self.state.transition();
        if let Err(e) = legs.act(leg, command) {
            warn!("Gait step {:?} -> {:?} write failed: {}", self.state, next, e);
        }
        debug!("Gait {:?} -> {:?} at {}ms", self.state, next, now);

        self.state = next;
        self.last_transition = now;
        Some((leg, command))
    }
}

impl Default for GaitController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legs::testing::RecordingBus;
    use crate::legs::Legs;

    const MOTION: Millis = 500;
    const STOP: Millis = 250;

    fn legs() -> Legs<RecordingBus> {
        Legs::with_channels(RecordingBus::default(), 0, 1)
    }

    #[test]
    fn test_full_cycle_order() {
        let mut legs = legs();
        let mut gait = GaitController::new();
        assert_eq!(gait.state(), GaitState::LeftStop);

        let steps = [
            (250, GaitState::RightMoving, (LegId::Right, ServoCommand::MoveRight)),
            (750, GaitState::RightStop, (LegId::Right, ServoCommand::Stop)),
            (1000, GaitState::LeftMoving, (LegId::Left, ServoCommand::MoveLeft)),
            (1500, GaitState::LeftStop, (LegId::Left, ServoCommand::Stop)),
        ];
        for (now, state, fired) in steps {
            assert_eq!(gait.poll(&mut legs, now, MOTION, STOP), Some(fired));
            assert_eq!(gait.state(), state);
        }

        // One write per transition, in table order
        assert_eq!(legs.bus().writes, vec![(0, 0), (0, 90), (1, 180), (1, 90)]);
    }

    #[test]
    fn test_never_two_legs_moving() {
        let mut legs = legs();
        let mut gait = GaitController::new();
        let mut moving = [false; 2];

        // Poll every 10ms across several cycles
        for now in (0..6000).step_by(10) {
            if let Some((leg, command)) = gait.poll(&mut legs, now, MOTION, STOP) {
                let idx = match leg {
                    LegId::Right => 0,
                    LegId::Left => 1,
                };
                moving[idx] = command.is_moving();
                assert!(!(moving[0] && moving[1]), "both legs moving at {}ms", now);
            }
        }
    }

    #[test]
    fn test_poll_below_dwell_is_noop() {
        let mut legs = legs();
        let mut gait = GaitController::new();
        gait.poll(&mut legs, 250, MOTION, STOP).unwrap();

        // RightMoving needs 500ms of motion dwell
        for now in [250, 251, 600, 749] {
            assert_eq!(gait.poll(&mut legs, now, MOTION, STOP), None);
            assert_eq!(gait.state(), GaitState::RightMoving);
            assert_eq!(gait.last_transition(), 250);
        }
        assert_eq!(legs.bus().writes.len(), 1);
    }

    #[test]
    fn test_timer_resets_to_poll_time() {
        let mut legs = legs();
        let mut gait = GaitController::new();

        // Late poll: the timer takes `now`, not last + dwell
        gait.poll(&mut legs, 900, MOTION, STOP).unwrap();
        assert_eq!(gait.last_transition(), 900);
        assert_eq!(gait.poll(&mut legs, 1399, MOTION, STOP), None);
        assert!(gait.poll(&mut legs, 1400, MOTION, STOP).is_some());
    }

    #[test]
    fn test_dwell_across_clock_wraparound() {
        let mut legs = legs();
        let mut gait = GaitController::new();
        gait.reset(u32::MAX - 99);

        // 200ms after the reset, across the overflow
        assert_eq!(gait.poll(&mut legs, 100, MOTION, STOP), None);
        // 250ms after the reset
        assert_eq!(
            gait.poll(&mut legs, 150, MOTION, STOP),
            Some((LegId::Right, ServoCommand::MoveRight))
        );
    }

    #[test]
    fn test_dwell_supplied_per_call() {
        let mut legs = legs();
        let mut gait = GaitController::new();
        gait.reset(1000);

        assert_eq!(gait.poll(&mut legs, 1100, MOTION, STOP), None);
        // Shorter stop dwell on the next call takes effect immediately
        assert!(gait.poll(&mut legs, 1100, MOTION, 100).is_some());
        // Zero motion dwell fires on the very next poll
        assert!(gait.poll(&mut legs, 1100, 0, STOP).is_some());
        assert_eq!(gait.state(), GaitState::RightStop);
    }

    #[test]
    fn test_unconfigured_leg_still_advances() {
        let mut legs = Legs::new(RecordingBus::default());
        let mut gait = GaitController::new();

        assert_eq!(
            gait.poll(&mut legs, 250, MOTION, STOP),
            Some((LegId::Right, ServoCommand::MoveRight))
        );
        assert_eq!(gait.state(), GaitState::RightMoving);
        assert!(legs.bus().writes.is_empty());
    }
}
