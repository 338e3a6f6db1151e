// Leg actuation for the biped
//
// Provides:
// - Leg identities, servo commands and their raw angle mapping
// - Per-leg channel binding with an unconfigured-leg gate
// - Pololu Maestro serial backend and a simulated backend

mod actuator;
pub mod maestro;
pub mod sim;

pub use actuator::{LegActuator, LegError, LegId, LegSlot, Legs, ServoBus, ServoCommand};
pub use maestro::MaestroBus;
pub use sim::SimBus;

#[cfg(test)]
pub(crate) mod testing {
    use super::{LegError, ServoBus};

    /// Records every (channel, angle) write in order
    #[derive(Debug, Default)]
    pub struct RecordingBus {
        pub writes: Vec<(u8, u8)>,
    }

    impl ServoBus for RecordingBus {
        fn write(&mut self, channel: u8, angle: u8) -> Result<(), LegError> {
            self.writes.push((channel, angle));
            Ok(())
        }
    }
}
