// Leg dispatch for the biped
//
// Binds each leg to a servo channel and writes angle commands through a
// `ServoBus`. A leg that was never bound suppresses the write and reports
// `LegError::Unconfigured` instead of touching the hardware.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Physical leg a command targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegId {
    Right,
    Left,
}

impl LegId {
    pub const ALL: [LegId; 2] = [LegId::Right, LegId::Left];
}

/// Angle-equivalent command for one leg servo
///
/// Forward motion is direction specific: the right leg swings forward at
/// 0 degrees and the left leg at 180 degrees. Both rest at 90.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServoCommand {
    MoveRight,
    MoveLeft,
    Stop,
}

impl ServoCommand {
    /// Forward command for `leg`
    pub const fn forward(leg: LegId) -> Self {
        match leg {
            LegId::Right => ServoCommand::MoveRight,
            LegId::Left => ServoCommand::MoveLeft,
        }
    }

    /// Raw servo angle in degrees
    pub const fn angle(self) -> u8 {
        match self {
            ServoCommand::MoveRight => 0,
            ServoCommand::MoveLeft => 180,
            ServoCommand::Stop => 90,
        }
    }

    pub const fn is_moving(self) -> bool {
        !matches!(self, ServoCommand::Stop)
    }
}

/// Error types for leg actuation
#[derive(Debug, thiserror::Error)]
pub enum LegError {
    #[error("{0:?} leg is not configured")]
    Unconfigured(LegId),

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout waiting for servo controller response")]
    Timeout,

    #[error("Servo channel {channel} out of range")]
    InvalidChannel { channel: u8 },

    #[error("Servo controller reported error flags 0x{flags:04X}")]
    ControllerFault { flags: u16 },
}

/// Raw actuator primitive: fire-and-forget angle write to one channel
pub trait ServoBus {
    fn write(&mut self, channel: u8, angle: u8) -> Result<(), LegError>;
}

/// Anything that can command a leg by identity
pub trait LegActuator {
    fn act(&mut self, leg: LegId, command: ServoCommand) -> Result<(), LegError>;

    /// Command Stop on both legs
    ///
    /// Both writes are attempted; the first failure is returned.
    fn halt(&mut self) -> Result<(), LegError> {
        debug!("Halting both legs");
        let right = self.act(LegId::Right, ServoCommand::Stop);
        let left = self.act(LegId::Left, ServoCommand::Stop);
        right.and(left)
    }
}

/// Binding state of one leg
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegSlot {
    Unconfigured,
    Configured(u8),
}

/// Both legs of the robot on one servo bus
pub struct Legs<B: ServoBus> {
    bus: B,
    right: LegSlot,
    left: LegSlot,
}

impl<B: ServoBus> Legs<B> {
    /// Create with both legs unconfigured
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            right: LegSlot::Unconfigured,
            left: LegSlot::Unconfigured,
        }
    }

    /// Create with both legs bound
    pub fn with_channels(bus: B, right: u8, left: u8) -> Self {
        let mut legs = Self::new(bus);
        legs.bind(LegId::Right, right);
        legs.bind(LegId::Left, left);
        legs
    }

    /// Bind `leg` to a servo channel. Must happen before the leg is polled.
    pub fn bind(&mut self, leg: LegId, channel: u8) {
        info!("Binding {:?} leg to servo channel {}", leg, channel);
        *self.slot_mut(leg) = LegSlot::Configured(channel);
    }

    pub fn slot(&self, leg: LegId) -> LegSlot {
        match leg {
            LegId::Right => self.right,
            LegId::Left => self.left,
        }
    }

    fn slot_mut(&mut self, leg: LegId) -> &mut LegSlot {
        match leg {
            LegId::Right => &mut self.right,
            LegId::Left => &mut self.left,
        }
    }

    /// True when both legs are bound
    pub fn is_ready(&self) -> bool {
        LegId::ALL
            .iter()
            .all(|&leg| matches!(self.slot(leg), LegSlot::Configured(_)))
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<B: ServoBus> LegActuator for Legs<B> {
    fn act(&mut self, leg: LegId, command: ServoCommand) -> Result<(), LegError> {
        match self.slot(leg) {
            LegSlot::Configured(channel) => {
                debug!(
                    "{:?} leg -> {:?} ({} deg) on channel {}",
                    leg,
                    command,
                    command.angle(),
                    channel
                );
                self.bus.write(channel, command.angle())
            }
            LegSlot::Unconfigured => {
                warn!("{:?} leg is not attached, dropping {:?}", leg, command);
                Err(LegError::Unconfigured(leg))
            }
        }
    }
}

impl<B: ServoBus> Drop for Legs<B> {
    fn drop(&mut self) {
        // Leave the servos at rest; unbound legs are skipped silently
        for leg in LegId::ALL {
            if let LegSlot::Configured(channel) = self.slot(leg) {
                if let Err(e) = self.bus.write(channel, ServoCommand::Stop.angle()) {
                    warn!("Failed to stop {:?} leg on drop: {}", leg, e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legs::testing::RecordingBus;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Bus whose writes outlive the `Legs` that own it
    struct SharedBus(Rc<RefCell<Vec<(u8, u8)>>>);

    impl ServoBus for SharedBus {
        fn write(&mut self, channel: u8, angle: u8) -> Result<(), LegError> {
            self.0.borrow_mut().push((channel, angle));
            Ok(())
        }
    }

    #[test]
    fn test_command_angles() {
        assert_eq!(ServoCommand::MoveRight.angle(), 0);
        assert_eq!(ServoCommand::MoveLeft.angle(), 180);
        assert_eq!(ServoCommand::Stop.angle(), 90);
        assert_eq!(ServoCommand::forward(LegId::Right), ServoCommand::MoveRight);
        assert_eq!(ServoCommand::forward(LegId::Left), ServoCommand::MoveLeft);
        assert!(!ServoCommand::Stop.is_moving());
    }

    #[test]
    fn test_configured_leg_writes_to_its_channel() {
        let mut legs = Legs::with_channels(RecordingBus::default(), 3, 7);
        legs.act(LegId::Left, ServoCommand::MoveLeft).unwrap();
        legs.act(LegId::Right, ServoCommand::Stop).unwrap();
        assert_eq!(legs.bus().writes, vec![(7, 180), (3, 90)]);
    }

    #[test]
    fn test_unconfigured_leg_never_reaches_bus() {
        let mut legs = Legs::new(RecordingBus::default());
        legs.bind(LegId::Right, 0);

        let err = legs.act(LegId::Left, ServoCommand::MoveLeft).unwrap_err();
        assert!(matches!(err, LegError::Unconfigured(LegId::Left)));
        assert!(legs.bus().writes.is_empty());
        assert!(!legs.is_ready());

        // The other leg is unaffected
        legs.act(LegId::Right, ServoCommand::MoveRight).unwrap();
        assert_eq!(legs.bus().writes, vec![(0, 0)]);
    }

    #[test]
    fn test_halt_attempts_both_legs() {
        let mut legs = Legs::new(RecordingBus::default());
        legs.bind(LegId::Left, 1);

        // Right is unbound: error reported, left still stopped
        assert!(legs.halt().is_err());
        assert_eq!(legs.bus().writes, vec![(1, 90)]);
    }

    #[test]
    fn test_drop_rests_bound_legs() {
        let writes = Rc::new(RefCell::new(Vec::new()));
        let mut legs = Legs::new(SharedBus(Rc::clone(&writes)));
        legs.bind(LegId::Left, 4);
        legs.act(LegId::Left, ServoCommand::MoveLeft).unwrap();

        drop(legs);
        // Only the bound leg is sent to rest
        assert_eq!(*writes.borrow(), vec![(4, 180), (4, 90)]);
    }
}
