// Gait controllers for the biped
//
// Both controllers are polled from the control loop and emit at most one leg
// write per poll. Dwell times are passed on every call.

pub mod rotate;
pub mod walk;

pub use rotate::{RotateState, RotationController};
pub use walk::{GaitController, GaitState};
