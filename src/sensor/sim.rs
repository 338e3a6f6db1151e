// Host-side sensor backends for running without the ultrasonic module

use std::convert::Infallible;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};

use super::ultrasonic::{EchoInput, RangeSensor, Reading, SensorError, CM_PER_US};

/// Trigger pin with nothing attached
#[derive(Debug, Default)]
pub struct SimTrigger;

impl ErrorType for SimTrigger {
    type Error = Infallible;
}

impl OutputPin for SimTrigger {
    fn set_low(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

/// Echo from a fixed simulated obstacle, or none
#[derive(Debug, Default)]
pub struct SimEcho {
    obstacle_cm: Option<f32>,
}

impl SimEcho {
    pub fn new(obstacle_cm: Option<f32>) -> Self {
        Self { obstacle_cm }
    }

    pub fn set_obstacle(&mut self, obstacle_cm: Option<f32>) {
        self.obstacle_cm = obstacle_cm;
    }
}

impl EchoInput for SimEcho {
    type Error = Infallible;

    fn pulse_high_us(&mut self, timeout_us: u32) -> Result<u32, Infallible> {
        let Some(cm) = self.obstacle_cm else {
            return Ok(0);
        };
        let round_trip_us = (cm * 2.0 / CM_PER_US).round();
        if round_trip_us <= 0.0 || round_trip_us >= timeout_us as f32 {
            return Ok(0);
        }
        Ok(round_trip_us as u32)
    }
}

/// Microsecond delays on the host; plain thread sleep is far too coarse
#[derive(Debug, Default)]
pub struct SpinDelay;

impl DelayNs for SpinDelay {
    fn delay_ns(&mut self, ns: u32) {
        spin_sleep::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

/// Ranging switched off: nothing is ever in the way
#[derive(Debug, Default)]
pub struct NoSensor;

impl RangeSensor for NoSensor {
    fn measure(&mut self) -> Result<Reading, SensorError> {
        Ok(Reading::NoObstacle)
    }
}
