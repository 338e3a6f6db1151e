// Servo bus stand-in for running without hardware

use tracing::info;

use super::actuator::{LegError, ServoBus};

/// Logs every write and remembers the last angle per channel
#[derive(Debug, Default)]
pub struct SimBus {
    angles: Vec<Option<u8>>,
    writes: u64,
}

impl SimBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last angle written to `channel`
    pub fn angle(&self, channel: u8) -> Option<u8> {
        self.angles.get(usize::from(channel)).copied().flatten()
    }

    pub fn write_count(&self) -> u64 {
        self.writes
    }
}

impl ServoBus for SimBus {
    fn write(&mut self, channel: u8, angle: u8) -> Result<(), LegError> {
        let idx = usize::from(channel);
        if self.angles.len() <= idx {
            self.angles.resize(idx + 1, None);
        }
        self.angles[idx] = Some(angle);
        self.writes += 1;
        info!("[SIM] servo ch={} -> {} deg", channel, angle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_bus_tracks_last_angle() {
        let mut bus = SimBus::new();
        assert_eq!(bus.angle(2), None);

        bus.write(2, 0).unwrap();
        bus.write(2, 90).unwrap();
        assert_eq!(bus.angle(2), Some(90));
        assert_eq!(bus.angle(0), None);
        assert_eq!(bus.write_count(), 2);
    }
}
