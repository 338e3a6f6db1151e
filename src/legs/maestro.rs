// Pololu Maestro serial servo controller, compact protocol
//
// Command format: [Command, Channel, Data...]. Every data byte carries 7
// bits, so 14-bit values are split into (low 7, high 7). Targets are in
// quarter-microseconds.

use serialport::{self, SerialPort};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::{debug, warn};

use super::actuator::{LegError, ServoBus};

/// Default serial configuration for the controller's command port
pub const DEFAULT_BAUDRATE: u32 = 115_200;
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

/// Largest Maestro variant has 24 channels
pub const MAX_CHANNELS: u8 = 24;

/// Hobby servo pulse range mapped onto 0..=180 degrees
pub const SERVO_MIN_US: u16 = 500;
pub const SERVO_MAX_US: u16 = 2_500;

/// Compact protocol command bytes
#[repr(u8)]
#[derive(Debug, Clone, Copy)]
pub enum Command {
    SetTarget = 0x84,
    GetPosition = 0x90,
    GetErrors = 0xA1,
}

pub type Result<T> = std::result::Result<T, LegError>;

/// Serial link to the servo controller
pub struct MaestroBus {
    port: Box<dyn SerialPort>,
}

impl MaestroBus {
    /// Open a connection to the controller's command port
    pub fn open(port_name: &str) -> Result<Self> {
        Self::open_with_baudrate(port_name, DEFAULT_BAUDRATE)
    }

    /// Open with custom baudrate
    pub fn open_with_baudrate(port_name: &str, baudrate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .open()?;

        Ok(Self { port })
    }

    fn send(&mut self, packet: &[u8]) -> Result<()> {
        self.port.write_all(packet)?;
        self.port.flush()?;
        Ok(())
    }

    /// Read a two byte little-endian reply
    fn read_u16(&mut self) -> Result<u16> {
        let mut reply = [0u8; 2];
        self.port.read_exact(&mut reply).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                LegError::Timeout
            } else {
                LegError::Io(e)
            }
        })?;
        Ok(u16::from_le_bytes(reply))
    }

    /// Set a raw target in quarter-microseconds
    pub fn set_target(&mut self, channel: u8, target_qus: u16) -> Result<()> {
        check_channel(channel)?;
        debug!("Set target ch={} target={}qus", channel, target_qus);
        self.send(&build_set_target(channel, target_qus))
    }

    /// Set a servo angle in degrees (clamped to 180)
    pub fn set_angle(&mut self, channel: u8, angle: u8) -> Result<()> {
        self.set_target(channel, angle_to_target(angle))
    }

    /// Read the current pulse target of a channel (quarter-microseconds)
    pub fn get_position(&mut self, channel: u8) -> Result<u16> {
        check_channel(channel)?;
        self.send(&[Command::GetPosition as u8, channel])?;
        self.read_u16()
    }

    /// Read and clear the controller error flags
    pub fn get_errors(&mut self) -> Result<u16> {
        self.send(&[Command::GetErrors as u8])?;
        self.read_u16()
    }

    /// Check the controller answers and has no pending faults
    ///
    /// `Ok(false)` when it does not answer at all.
    pub fn ping(&mut self) -> Result<bool> {
        check_errors(|| self.get_errors())
    }
}

impl ServoBus for MaestroBus {
    fn write(&mut self, channel: u8, angle: u8) -> Result<()> {
        self.set_angle(channel, angle)
    }
}

/// Interpret up to two error-flag reads
///
/// Reading the flags clears them, so flags left over from before the port
/// was opened (e.g. a serial signal error during USB enumeration) are gone
/// on the second read. Only flags that come back are a fault.
fn check_errors(mut read: impl FnMut() -> Result<u16>) -> Result<bool> {
    match read() {
        Ok(0) => return Ok(true),
        Ok(flags) => warn!("Stale controller error flags 0x{:04X}, rechecking", flags),
        Err(LegError::Timeout) => return Ok(false),
        Err(e) => return Err(e),
    }
    match read() {
        Ok(0) => Ok(true),
        Ok(flags) => Err(LegError::ControllerFault { flags }),
        Err(LegError::Timeout) => Ok(false),
        Err(e) => Err(e),
    }
}

fn check_channel(channel: u8) -> Result<()> {
    if channel >= MAX_CHANNELS {
        return Err(LegError::InvalidChannel { channel });
    }
    Ok(())
}

/// Map 0..=180 degrees linearly onto the servo pulse range
pub fn angle_to_target(angle: u8) -> u16 {
    let angle = u32::from(angle.min(180));
    let span = u32::from(SERVO_MAX_US - SERVO_MIN_US);
    let pulse_us = u32::from(SERVO_MIN_US) + angle * span / 180;
    (pulse_us * 4) as u16
}

/// Build a Set Target packet
fn build_set_target(channel: u8, target_qus: u16) -> [u8; 4] {
    [
        Command::SetTarget as u8,
        channel,
        (target_qus & 0x7F) as u8,
        ((target_qus >> 7) & 0x7F) as u8,
    ]
}
