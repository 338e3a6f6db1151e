// Obstacle sensing for the biped
//
// Provides:
// - Timeout-bounded ultrasonic ranging over embedded-hal pins
// - Simulated trigger/echo pins and a spin-sleep delay for host runs
// - A disabled sensor that never reports an obstacle

pub mod sim;
pub mod ultrasonic;

pub use sim::{NoSensor, SimEcho, SimTrigger, SpinDelay};
pub use ultrasonic::{
    DistanceSensor, EchoInput, RangeSensor, Reading, SensorError, ECHO_TIMEOUT_US, NO_OBSTACLE,
};
