// Leg test: careful, step-by-step check of both leg servos
//
// Usage: cargo run --example leg_test -- [port]
// Example: cargo run --example leg_test -- /dev/ttyACM0
//
// Safety features:
// - Explicit confirmation before any writes
// - Legs start at rest
// - One leg at a time, back to rest after each swing

use biped_runtime::config::{LEFT_LEG_CHANNEL, MOTION_DWELL_MS, RIGHT_LEG_CHANNEL, SERVO_PORT};
use biped_runtime::legs::maestro::angle_to_target;
use biped_runtime::legs::{LegActuator, LegId, Legs, MaestroBus, ServoCommand};
use std::io::{self, Write};
use std::thread::sleep;
use std::time::Duration;

fn confirm(prompt: &str) -> bool {
    print!("{} [y/N]: ", prompt);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }
    input.trim().eq_ignore_ascii_case("y")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().unwrap()),
        )
        .init();

    // Get port from args or use default
    let port = std::env::args()
        .nth(1)
        .unwrap_or_else(|| SERVO_PORT.to_string());

    println!("Biped leg test (WITH WRITES)");
    println!("  This tool WILL move the leg servos.");
    println!("  Lift the robot so its feet are off the ground.");
    println!();
    println!("Serial port: {}", port);
    println!();

    if !confirm("Is the robot lifted with both legs free to swing?") {
        println!("Please lift the robot before running this test.");
        return Ok(());
    }

    println!("Opening serial port...");
    let mut bus = MaestroBus::open(&port)?;
    println!("  Connected");

    // ========== STEP 1: Controller check (read-only) ==========
    println!("Step 1: Checking servo controller...");
    match bus.ping() {
        Ok(true) => println!("  Controller responding, no errors"),
        Ok(false) => {
            println!("  Controller NOT responding - aborting");
            return Ok(());
        }
        Err(e) => {
            println!("  Controller error: {} - aborting", e);
            return Ok(());
        }
    }
    for (name, channel) in [("Right", RIGHT_LEG_CHANNEL), ("Left", LEFT_LEG_CHANNEL)] {
        let target = bus.get_position(channel)?;
        println!("  {} leg (ch {}) target: {} qus", name, channel, target);
    }
    println!();

    let mut legs = Legs::with_channels(bus, RIGHT_LEG_CHANNEL, LEFT_LEG_CHANNEL);

    // ========== STEP 2: Rest position ==========
    println!("Step 2: Sending both legs to rest (90 deg)...");
    if !confirm("Send rest command?") {
        return Ok(());
    }
    legs.halt()?;
    sleep(Duration::from_millis(500));
    println!("  Rest sent ({} qus)", angle_to_target(ServoCommand::Stop.angle()));
    println!();

    // ========== STEP 3: One swing per leg ==========
    println!("Step 3: Swinging each leg forward once");
    println!("  Press Ctrl+C at any time to abort!");
    if !confirm("Proceed with swing test?") {
        legs.halt()?;
        return Ok(());
    }

    let swing = Duration::from_millis(u64::from(MOTION_DWELL_MS));
    for leg in LegId::ALL {
        let command = ServoCommand::forward(leg);
        println!("  {:?} leg -> {:?} ({} deg)", leg, command, command.angle());
        legs.act(leg, command)?;
        sleep(swing);
        legs.act(leg, ServoCommand::Stop)?;
        sleep(swing);
    }

    println!();
    println!("Step 4: Resting legs...");
    legs.halt()?;
    println!("  Done. Try the full runtime with: cargo run -- --port {}", port);

    Ok(())
}
