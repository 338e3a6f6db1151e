// Control runtime for a two-legged hobby walker
//
// Legs are two hobby servos driven through a serial servo controller; an
// ultrasonic sensor supplies obstacle readings. The gait controllers are
// polled from a single loop and never block.

pub mod clock;
pub mod config;
pub mod gait;
pub mod legs;
pub mod messages;
pub mod runtime;
pub mod sensor;
