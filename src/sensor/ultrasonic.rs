// HC-SR04 style ultrasonic ranging
//
// Trigger: hold low 2us, pulse high 10us, release. The echo pin then stays
// high for the round-trip time of the ping. The wait for that pulse is
// bounded, so a missing echo costs at most the timeout plus setup (~2.4ms).

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use serde::Serialize;
use tracing::trace;

/// Trigger line held low before the pulse
pub const SETTLE_US: u32 = 2;
/// Width of the trigger pulse
pub const TRIGGER_PULSE_US: u32 = 10;
/// Longest echo accepted; about 40cm of range
pub const ECHO_TIMEOUT_US: u32 = 2332;
/// Speed of sound, centimeters per microsecond
pub const CM_PER_US: f32 = 0.0343;
/// Numeric form of `Reading::NoObstacle`
pub const NO_OBSTACLE: f32 = -1.0;

/// Echo line pulse-width measurement
pub trait EchoInput {
    type Error: core::fmt::Debug;

    /// Duration of the next high pulse in microseconds
    ///
    /// Returns 0 if no pulse completed within `timeout_us`.
    fn pulse_high_us(&mut self, timeout_us: u32) -> Result<u32, Self::Error>;
}

/// Outcome of one measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reading {
    Distance(f32),
    /// Nothing within range before the echo timeout. Not an error.
    NoObstacle,
}

impl Reading {
    /// Convert an echo duration, treating 0 or anything past the timeout as no echo
    pub fn from_echo_us(duration_us: u32, timeout_us: u32) -> Self {
        if duration_us == 0 || duration_us >= timeout_us {
            Reading::NoObstacle
        } else {
            Reading::Distance(duration_us as f32 * CM_PER_US / 2.0)
        }
    }

    pub fn distance_cm(self) -> Option<f32> {
        match self {
            Reading::Distance(cm) => Some(cm),
            Reading::NoObstacle => None,
        }
    }

    /// Distance in cm, or `-1` when nothing is in range
    pub fn as_sentinel(self) -> f32 {
        self.distance_cm().unwrap_or(NO_OBSTACLE)
    }

    /// True for a real reading at or under `threshold_cm`
    pub fn is_within(self, threshold_cm: f32) -> bool {
        matches!(self, Reading::Distance(cm) if cm <= threshold_cm)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("Trigger pin error: {0}")]
    Trigger(String),

    #[error("Echo pin error: {0}")]
    Echo(String),
}

/// Anything that yields a range reading on demand
pub trait RangeSensor {
    fn measure(&mut self) -> Result<Reading, SensorError>;
}

impl<S: RangeSensor + ?Sized> RangeSensor for Box<S> {
    fn measure(&mut self) -> Result<Reading, SensorError> {
        (**self).measure()
    }
}

/// Ultrasonic sensor on a trigger output and an echo input
pub struct DistanceSensor<T, E, D> {
    trigger: T,
    echo: E,
    delay: D,
    timeout_us: u32,
}

impl<T, E, D> DistanceSensor<T, E, D>
where
    T: OutputPin,
    E: EchoInput,
    D: DelayNs,
{
    pub fn new(trigger: T, echo: E, delay: D) -> Self {
        Self::with_timeout(trigger, echo, delay, ECHO_TIMEOUT_US)
    }

    pub fn with_timeout(trigger: T, echo: E, delay: D, timeout_us: u32) -> Self {
        Self {
            trigger,
            echo,
            delay,
            timeout_us,
        }
    }

    /// Fire one ping and wait (bounded) for its echo
    pub fn measure(&mut self) -> Result<Reading, SensorError> {
        self.trigger.set_low().map_err(trigger_err)?;
        self.delay.delay_us(SETTLE_US);
        self.trigger.set_high().map_err(trigger_err)?;
        self.delay.delay_us(TRIGGER_PULSE_US);
        self.trigger.set_low().map_err(trigger_err)?;

        let duration_us = self
            .echo
            .pulse_high_us(self.timeout_us)
            .map_err(|e| SensorError::Echo(format!("{:?}", e)))?;

        let reading = Reading::from_echo_us(duration_us, self.timeout_us);
        trace!("Echo {}us -> {:?}", duration_us, reading);
        Ok(reading)
    }
}

impl<T, E, D> RangeSensor for DistanceSensor<T, E, D>
where
    T: OutputPin,
    E: EchoInput,
    D: DelayNs,
{
    fn measure(&mut self) -> Result<Reading, SensorError> {
        DistanceSensor::measure(self)
    }
}

fn trigger_err<Err: core::fmt::Debug>(e: Err) -> SensorError {
    SensorError::Trigger(format!("{:?}", e))
}
