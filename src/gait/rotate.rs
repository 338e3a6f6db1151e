// Rotation in place: one leg swings forward and rests, repeatedly

use serde::Serialize;
use tracing::{debug, warn};

use crate::clock::{elapsed_ms, Millis};
use crate::legs::{LegActuator, LegId, ServoCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RotateState {
    LegStop,
    LegMoving,
}

/// Non-blocking single-leg rotation
///
/// The state is shared by whichever leg is passed to `poll`. Callers that
/// switch legs must `reset` first, otherwise the new leg may receive a Stop
/// for a swing it never started while the old leg keeps moving.
#[derive(Debug, Clone)]
pub struct RotationController {
    state: RotateState,
    last_transition: Millis,
}

impl RotationController {
    pub fn new() -> Self {
        Self {
            state: RotateState::LegStop,
            last_transition: 0,
        }
    }

    pub fn reset(&mut self, now: Millis) {
        self.state = RotateState::LegStop;
        self.last_transition = now;
    }

    pub fn state(&self) -> RotateState {
        self.state
    }

    pub fn last_transition(&self) -> Millis {
        self.last_transition
    }

    /// Advance the rotation of `leg` by at most one step
    pub fn poll<A: LegActuator + ?Sized>(
        &mut self,
        legs: &mut A,
        leg: LegId,
        now: Millis,
        motion_dwell: Millis,
        stop_dwell: Millis,
    ) -> Option<ServoCommand> {
        let (required, command, next) = match self.state {
            RotateState::LegStop => (
                stop_dwell,
                ServoCommand::forward(leg),
                RotateState::LegMoving,
            ),
            RotateState::LegMoving => (motion_dwell, ServoCommand::Stop, RotateState::LegStop),
        };
        if elapsed_ms(now, self.last_transition) < required {
            return None;
        }

        if let Err(e) = legs.act(leg, command) {
            warn!("Rotate step on {:?} leg failed: {}", leg, e);
        }
        debug!("Rotate {:?} leg {:?} -> {:?} at {}ms", leg, self.state, next, now);

        self.state = next;
        self.last_transition = now;
        Some(command)
    }
}

impl Default for RotationController {
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

    #[test]
    fn test_rotation_cycle_move_then_stop() {
        let mut legs = Legs::with_channels(RecordingBus::default(), 0, 1);
        let mut rotate = RotationController::new();

        assert_eq!(
            rotate.poll(&mut legs, LegId::Left, 250, MOTION, STOP),
            Some(ServoCommand::MoveLeft)
        );
        assert_eq!(rotate.state(), RotateState::LegMoving);
        assert_eq!(
            rotate.poll(&mut legs, LegId::Left, 750, MOTION, STOP),
            Some(ServoCommand::Stop)
        );
        assert_eq!(rotate.state(), RotateState::LegStop);

        assert_eq!(legs.bus().writes, vec![(1, 180), (1, 90)]);
    }

    #[test]
    fn test_right_leg_uses_its_forward_command() {
        let mut legs = Legs::with_channels(RecordingBus::default(), 0, 1);
        let mut rotate = RotationController::new();

        assert_eq!(
            rotate.poll(&mut legs, LegId::Right, 300, MOTION, STOP),
            Some(ServoCommand::MoveRight)
        );
        assert_eq!(legs.bus().writes, vec![(0, 0)]);
    }

    #[test]
    fn test_poll_below_dwell_is_noop() {
        let mut legs = Legs::with_channels(RecordingBus::default(), 0, 1);
        let mut rotate = RotationController::new();
        rotate.reset(1000);

        assert_eq!(rotate.poll(&mut legs, LegId::Right, 1249, MOTION, STOP), None);
        assert_eq!(rotate.state(), RotateState::LegStop);
        assert_eq!(rotate.last_transition(), 1000);
        assert!(legs.bus().writes.is_empty());
    }

    #[test]
    fn test_swing_held_for_motion_dwell() {
        let mut legs = Legs::with_channels(RecordingBus::default(), 0, 1);
        let mut rotate = RotationController::new();
        rotate.reset(1000);
        rotate.poll(&mut legs, LegId::Left, 1250, MOTION, STOP).unwrap();

        // Still swinging one tick short of the motion dwell
        assert_eq!(rotate.poll(&mut legs, LegId::Left, 1749, MOTION, STOP), None);
        assert_eq!(rotate.state(), RotateState::LegMoving);
        assert_eq!(rotate.last_transition(), 1250);
        assert_eq!(legs.bus().writes, vec![(1, 180)]);
    }

    #[test]
    fn test_dwell_across_clock_wraparound() {
        let mut legs = Legs::with_channels(RecordingBus::default(), 0, 1);
        let mut rotate = RotationController::new();
        rotate.reset(u32::MAX - 2);

        // elapsed = 8
        assert_eq!(
            rotate.poll(&mut legs, LegId::Right, 5, MOTION, 8),
            Some(ServoCommand::MoveRight)
        );
        assert_eq!(rotate.poll(&mut legs, LegId::Right, 10, MOTION, STOP), None);
    }
}
