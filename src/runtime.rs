// 50 Hz control loop with watchdog and obstacle check
//
// Each tick: drain drive commands, refresh the range reading when due,
// pick an action, and poll the matching gait controller. Only the range
// measurement can block, for at most its echo timeout.

use serde::Serialize;
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};

use crate::clock::{elapsed_ms, Clock, Millis, SystemClock};
use crate::config::{
    CMD_TIMEOUT, LOOP_HZ, MOTION_DWELL_MS, OBSTACLE_THRESHOLD_CM, SENSOR_PERIOD_MS, STOP_DWELL_MS,
    TOPIC_CMD_DRIVE, TOPIC_HEALTH, TOPIC_RANGE, TOPIC_RT_LEGS,
};
use crate::gait::{GaitController, RotationController};
use crate::legs::{LegActuator, LegId, Legs, MaestroBus, ServoBus, SimBus};
use crate::messages::{DriveCommand, LegActuation, RangeReport, RuntimeHealth};
use crate::sensor::{
    DistanceSensor, NoSensor, RangeSensor, Reading, SimEcho, SimTrigger, SpinDelay,
};

/// Pacing and thresholds, all in milliseconds except the distance
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub motion_dwell_ms: Millis,
    pub stop_dwell_ms: Millis,
    pub sensor_period_ms: Millis,
    pub cmd_timeout_ms: Millis,
    pub obstacle_threshold_cm: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            motion_dwell_ms: MOTION_DWELL_MS,
            stop_dwell_ms: STOP_DWELL_MS,
            sensor_period_ms: SENSOR_PERIOD_MS,
            cmd_timeout_ms: CMD_TIMEOUT.as_millis() as Millis,
            obstacle_threshold_cm: OBSTACLE_THRESHOLD_CM,
        }
    }
}

/// What the legs are doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Idle,
    Walk,
    Rotate(LegId),
    /// Emergency stop, held until Stop or Center
    Halted,
}

/// Result of one control tick
#[derive(Debug, Default)]
pub struct Tick {
    pub fired: Option<LegActuation>,
    pub range: Option<RangeReport>,
}

/// Leg that swings to turn the robot; the other leg is the pivot
fn pivot_leg(cmd: DriveCommand) -> Option<LegId> {
    match cmd {
        DriveCommand::TurnLeft => Some(LegId::Right),
        DriveCommand::TurnRight => Some(LegId::Left),
        _ => None,
    }
}

/// Walks are turned right when something is in the way
const AVOID_TURN: DriveCommand = DriveCommand::TurnRight;

pub struct Runtime<A: LegActuator, S: RangeSensor> {
    legs: A,
    sensor: S,
    settings: Settings,
    gait: GaitController,
    rotation: RotationController,
    action: Action,
    latest_cmd: Option<DriveCommand>,
    cmd_received_at: Millis,
    estop: bool,
    reading: Reading,
    last_measure: Option<Millis>,
    health: RuntimeHealth,
}

impl<A: LegActuator, S: RangeSensor> Runtime<A, S> {
    pub fn new(legs: A, sensor: S, settings: Settings) -> Self {
        Self {
            legs,
            sensor,
            settings,
            gait: GaitController::new(),
            rotation: RotationController::new(),
            action: Action::Idle,
            latest_cmd: None,
            cmd_received_at: 0,
            estop: false,
            reading: Reading::NoObstacle,
            last_measure: None,
            health: RuntimeHealth::CmdStale, // Start stale until first cmd
        }
    }

    /// Process incoming command
    pub fn on_command(&mut self, cmd: DriveCommand, now: Millis) {
        info!("Received command: {:?}", cmd);
        match cmd {
            DriveCommand::EmergencyStop => self.estop = true,
            DriveCommand::Stop | DriveCommand::Center => self.estop = false,
            DriveCommand::Backward => warn!("Backward walking is not supported, holding still"),
            _ => {}
        }
        self.latest_cmd = Some(cmd);
        self.cmd_received_at = now;
    }

    /// Run one control tick at `now`
    pub fn step(&mut self, now: Millis) -> Tick {
        let range = self.refresh_range(now);
        let action = self.select_action(now);
        self.enter(action, now);

        let Settings {
            motion_dwell_ms,
            stop_dwell_ms,
            ..
        } = self.settings;

        let fired = match self.action {
            Action::Walk => self
                .gait
                .poll(&mut self.legs, now, motion_dwell_ms, stop_dwell_ms)
                .map(|(leg, command)| LegActuation::new(leg, command, now)),
            Action::Rotate(leg) => self
                .rotation
                .poll(&mut self.legs, leg, now, motion_dwell_ms, stop_dwell_ms)
                .map(|command| LegActuation::new(leg, command, now)),
            Action::Idle | Action::Halted => None,
        };

        Tick { fired, range }
    }

    /// Measure if the sensor period has elapsed since the last attempt
    fn refresh_range(&mut self, now: Millis) -> Option<RangeReport> {
        if let Some(last) = self.last_measure {
            if elapsed_ms(now, last) < self.settings.sensor_period_ms {
                return None;
            }
        }
        self.last_measure = Some(now);

        match self.sensor.measure() {
            Ok(reading) => {
                self.reading = reading;
                Some(RangeReport::new(reading, self.settings.obstacle_threshold_cm))
            }
            Err(e) => {
                // Keep the previous reading
                warn!("Range measurement failed: {}", e);
                None
            }
        }
    }

    /// Pick an action from the latest command, watchdog and obstacle state
    fn select_action(&mut self, now: Millis) -> Action {
        if self.estop {
            self.health = RuntimeHealth::Halted;
            return Action::Halted;
        }

        let cmd_age = elapsed_ms(now, self.cmd_received_at);
        let cmd = match self.latest_cmd {
            Some(cmd) if cmd_age <= self.settings.cmd_timeout_ms => cmd,
            Some(_) => {
                // Watchdog triggered - stop the robot
                if self.health != RuntimeHealth::CmdStale {
                    warn!("Command stale ({}ms old), stopping robot", cmd_age);
                }
                self.health = RuntimeHealth::CmdStale;
                return Action::Idle;
            }
            None => {
                // No command ever received
                self.health = RuntimeHealth::CmdStale;
                return Action::Idle;
            }
        };
        self.health = RuntimeHealth::Ok;

        match cmd {
            DriveCommand::Forward if self.obstacle_ahead() => {
                pivot_leg(AVOID_TURN).map_or(Action::Idle, Action::Rotate)
            }
            DriveCommand::Forward => Action::Walk,
            DriveCommand::TurnLeft | DriveCommand::TurnRight => {
                pivot_leg(cmd).map_or(Action::Idle, Action::Rotate)
            }
            DriveCommand::Backward
            | DriveCommand::Stop
            | DriveCommand::Center
            | DriveCommand::EmergencyStop => Action::Idle,
        }
    }

    fn obstacle_ahead(&self) -> bool {
        self.reading.is_within(self.settings.obstacle_threshold_cm)
    }

    /// Switch actions: both legs rest and the controllers restart from `now`
    fn enter(&mut self, action: Action, now: Millis) {
        if action == self.action {
            return;
        }
        info!("Action {:?} -> {:?}", self.action, action);
        if let Err(e) = self.legs.halt() {
            warn!("Failed to halt legs: {}", e);
        }
        self.gait.reset(now);
        self.rotation.reset(now);
        self.action = action;
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    pub fn reading(&self) -> Reading {
        self.reading
    }

    pub fn legs(&self) -> &A {
        &self.legs
    }

    pub fn legs_mut(&mut self) -> &mut A {
        &mut self.legs
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }
}

/// Where obstacle readings come from
///
/// The host has no GPIO backend for the ultrasonic module, so the choices
/// are a simulated echo or no ranging at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorBackend {
    /// Echo from a fixed simulated obstacle; `None` reports nothing in range
    Simulated { obstacle_cm: Option<f32> },
    /// Never measures; walks are never diverted
    Disabled,
}

impl SensorBackend {
    pub fn select(disabled: bool, sim_obstacle_cm: Option<f32>) -> Self {
        if disabled {
            SensorBackend::Disabled
        } else {
            SensorBackend::Simulated {
                obstacle_cm: sim_obstacle_cm,
            }
        }
    }

    pub fn build(self) -> Box<dyn RangeSensor> {
        match self {
            SensorBackend::Simulated { obstacle_cm } => Box::new(DistanceSensor::new(
                SimTrigger::default(),
                SimEcho::new(obstacle_cm),
                SpinDelay,
            )),
            SensorBackend::Disabled => Box::new(NoSensor),
        }
    }
}

/// Hardware selection for `run`
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Serial port of the servo controller; simulated legs when `None`
    pub servo_port: Option<String>,
    pub right_channel: u8,
    pub left_channel: u8,
    pub sensor: SensorBackend,
    pub settings: Settings,
}

impl RunOptions {
    /// Startup warning for real legs walking without real obstacle readings
    pub fn sensor_warning(&self) -> Option<&'static str> {
        self.servo_port.as_ref()?;
        match self.sensor {
            SensorBackend::Simulated { .. } => {
                Some("Real legs with a simulated range sensor: avoidance ignores real obstacles")
            }
            SensorBackend::Disabled => Some("Real legs with ranging disabled: avoidance is off"),
        }
    }
}

pub async fn run(options: RunOptions) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Range sensor: {:?}", options.sensor);
    if let Some(warning) = options.sensor_warning() {
        warn!("{}", warning);
    }
    let sensor = options.sensor.build();

    match &options.servo_port {
        Some(port) => {
            info!("Opening servo controller on {}", port);
            let mut bus = MaestroBus::open(port)?;
            if !bus.ping()? {
                warn!("Servo controller on {} did not answer", port);
            }
            let legs = bind_legs(bus, &options);
            serve(legs, sensor, options.settings).await
        }
        None => {
            info!("No servo port given, running with simulated legs");
            let legs = bind_legs(SimBus::new(), &options);
            serve(legs, sensor, options.settings).await
        }
    }
}

fn bind_legs<B: ServoBus>(bus: B, options: &RunOptions) -> Legs<B> {
    let legs = Legs::with_channels(bus, options.right_channel, options.left_channel);
    if !legs.is_ready() {
        warn!("One or both legs are not attached");
    }
    legs
}

async fn serve<A: LegActuator, S: RangeSensor>(
    legs: A,
    sensor: S,
    settings: Settings,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let subscriber = session.declare_subscriber(TOPIC_CMD_DRIVE).await?;
    let pub_legs = session.declare_publisher(TOPIC_RT_LEGS).await?;
    let pub_range = session.declare_publisher(TOPIC_RANGE).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let clock = SystemClock::new();
    let mut runtime = Runtime::new(legs, sensor, settings);
    // Stabilize before the first step
    if let Err(e) = runtime.legs_mut().halt() {
        warn!("Failed to halt legs at startup: {}", e);
    }

    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        "Runtime started: {}Hz loop, {}ms watchdog timeout, dwell {}ms/{}ms",
        LOOP_HZ, settings.cmd_timeout_ms, settings.motion_dwell_ms, settings.stop_dwell_ms
    );
    info!("Subscribed to: {}", TOPIC_CMD_DRIVE);
    info!(
        "Publishing to: {}, {}, {}",
        TOPIC_RT_LEGS, TOPIC_RANGE, TOPIC_HEALTH
    );

    loop {
        tokio::select! {
            _ = tick.tick() => {}
            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
        }
        let now = clock.now_ms();

        // 1. Drain all pending commands (non-blocking), keep latest
        while let Ok(Some(sample)) = subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            match DriveCommand::parse(&payload) {
                Ok(cmd) => runtime.on_command(cmd, now),
                Err(e) => warn!("Failed to parse command: {}", e),
            }
        }

        // 2. Range check, action selection, controller poll
        let step = runtime.step(now);

        // 3. Publish what happened
        if let Some(actuation) = step.fired {
            pub_legs.put(serde_json::to_string(&actuation)?).await?;
        }
        if let Some(range) = step.range {
            pub_range.put(serde_json::to_string(&range)?).await?;
        }
        let health_json = serde_json::to_string(&runtime.health())?;
        pub_health.put(health_json).await?;
    }

    if let Err(e) = runtime.legs_mut().halt() {
        warn!("Failed to halt legs on shutdown: {}", e);
    }
    Ok(())
}
