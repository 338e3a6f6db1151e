// Define message types for the runtime

use serde::{Deserialize, Serialize};

use crate::clock::Millis;
use crate::legs::{LegId, ServoCommand};
use crate::sensor::Reading;

/// Command from the host (teleop, face tracker) -> runtime
///
/// On the wire either a single ASCII byte (`F B L R S C X`, any case) or the
/// JSON string form, e.g. `"turn_left"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveCommand {
    Forward,
    Backward,
    TurnLeft,
    TurnRight,
    Stop,
    Center,
    EmergencyStop,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Empty command payload")]
    Empty,

    #[error("Unknown command byte 0x{0:02X}")]
    UnknownByte(u8),

    #[error("Invalid command JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl DriveCommand {
    pub fn from_byte(byte: u8) -> Result<Self, CommandError> {
        match byte.to_ascii_uppercase() {
            b'F' => Ok(DriveCommand::Forward),
            b'B' => Ok(DriveCommand::Backward),
            b'L' => Ok(DriveCommand::TurnLeft),
            b'R' => Ok(DriveCommand::TurnRight),
            b'S' => Ok(DriveCommand::Stop),
            b'C' => Ok(DriveCommand::Center),
            b'X' => Ok(DriveCommand::EmergencyStop),
            _ => Err(CommandError::UnknownByte(byte)),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            DriveCommand::Forward => b'F',
            DriveCommand::Backward => b'B',
            DriveCommand::TurnLeft => b'L',
            DriveCommand::TurnRight => b'R',
            DriveCommand::Stop => b'S',
            DriveCommand::Center => b'C',
            DriveCommand::EmergencyStop => b'X',
        }
    }

    /// Decode a received payload (single byte or JSON string)
    pub fn parse(payload: &[u8]) -> Result<Self, CommandError> {
        let payload = payload.trim_ascii();
        match payload {
            [] => Err(CommandError::Empty),
            [byte] => Self::from_byte(*byte),
            _ => Ok(serde_json::from_slice(payload)?),
        }
    }
}

/// One leg write performed by a controller, published for observers
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LegActuation {
    pub leg: LegId,
    pub command: ServoCommand,
    pub angle: u8,
    pub at_ms: Millis,
}

impl LegActuation {
    pub fn new(leg: LegId, command: ServoCommand, at_ms: Millis) -> Self {
        Self {
            leg,
            command,
            angle: command.angle(),
            at_ms,
        }
    }
}

/// Latest obstacle reading; `distance_cm` is -1 when nothing is in range
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RangeReport {
    pub distance_cm: f32,
    pub obstacle: bool,
}

impl RangeReport {
    pub fn new(reading: Reading, threshold_cm: f32) -> Self {
        Self {
            distance_cm: reading.as_sentinel(),
            obstacle: reading.is_within(threshold_cm),
        }
    }
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
    Halted,
}
