// Timeouts, topics, gait pacing and hardware defaults
//
// Pacing, watchdog, sensor period, threshold, port and channels can be
// overridden on the command line (see main.rs). Loop rate and topics are fixed.
use std::time::Duration;

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// Command timeout for watchdog
// The face tracker resends its command at least every few frames
pub const CMD_TIMEOUT: Duration = Duration::from_millis(500);

// Zenoh topics
pub const TOPIC_CMD_DRIVE: &str = "biped/cmd/drive"; // commands
pub const TOPIC_RT_LEGS: &str = "biped/rt/legs"; // leg writes
pub const TOPIC_RANGE: &str = "biped/state/range"; // obstacle readings
pub const TOPIC_HEALTH: &str = "biped/state/health"; // health status

// Gait pacing (ms)
pub const MOTION_DWELL_MS: u32 = 500; // leg held in its forward swing
pub const STOP_DWELL_MS: u32 = 250; // both legs at rest between swings

// Obstacle avoidance
pub const SENSOR_PERIOD_MS: u32 = 100;
pub const OBSTACLE_THRESHOLD_CM: f32 = 20.0;

// Servo controller
// Serial command port of the Maestro
pub const SERVO_PORT: &str = "/dev/ttyACM0";
pub const RIGHT_LEG_CHANNEL: u8 = 0;
pub const LEFT_LEG_CHANNEL: u8 = 1;
