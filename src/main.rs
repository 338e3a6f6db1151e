use clap::Parser;
use tracing_subscriber::EnvFilter;

use biped_runtime::config::{LEFT_LEG_CHANNEL, RIGHT_LEG_CHANNEL, SERVO_PORT};
use biped_runtime::runtime::{RunOptions, SensorBackend, Settings};

/// Biped walker runtime
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Serial port of the servo controller
    #[arg(long, default_value = SERVO_PORT)]
    port: String,

    /// Run with simulated legs instead of the servo controller
    #[arg(long)]
    sim: bool,

    #[arg(long, default_value_t = RIGHT_LEG_CHANNEL)]
    right_channel: u8,

    #[arg(long, default_value_t = LEFT_LEG_CHANNEL)]
    left_channel: u8,

    /// How long a leg holds its forward swing (ms)
    #[arg(long)]
    motion_dwell: Option<u32>,

    /// How long both legs rest between swings (ms)
    #[arg(long)]
    stop_dwell: Option<u32>,

    /// Stop when no command arrives for this long (ms)
    #[arg(long)]
    cmd_timeout: Option<u32>,

    /// Time between range measurements (ms)
    #[arg(long)]
    sensor_period: Option<u32>,

    /// Walks turn away from anything closer than this (cm)
    #[arg(long)]
    obstacle_cm: Option<f32>,

    /// Distance the simulated ultrasonic echo reports (cm)
    #[arg(long)]
    sim_obstacle: Option<f32>,

    /// Turn ranging off; walks are never diverted
    #[arg(long, conflicts_with = "sim_obstacle")]
    no_sensor: bool,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init(); // installs the subscriber globally

    let args = Args::parse();

    let mut settings = Settings::default();
    if let Some(ms) = args.motion_dwell {
        settings.motion_dwell_ms = ms;
    }
    if let Some(ms) = args.stop_dwell {
        settings.stop_dwell_ms = ms;
    }
    if let Some(ms) = args.cmd_timeout {
        settings.cmd_timeout_ms = ms;
    }
    if let Some(ms) = args.sensor_period {
        settings.sensor_period_ms = ms;
    }
    if let Some(cm) = args.obstacle_cm {
        settings.obstacle_threshold_cm = cm;
    }

    let options = RunOptions {
        servo_port: (!args.sim).then_some(args.port),
        right_channel: args.right_channel,
        left_channel: args.left_channel,
        sensor: SensorBackend::select(args.no_sensor, args.sim_obstacle),
        settings,
    };

    if let Err(e) = biped_runtime::runtime::run(options).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
