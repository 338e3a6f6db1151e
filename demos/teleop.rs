// Keyboard teleop: W forward, A/D turn, S back, Space stop, C center, X e-stop, Q quit
use biped_runtime::config::TOPIC_CMD_DRIVE;
use biped_runtime::messages::DriveCommand;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::{Duration, Instant};
use tracing::info;

const INPUT_TIMEOUT_MS: u64 = 150; // Fall back to Stop after this much time with no input

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD_DRIVE).await?;

    info!("Controls: W=forward, A/D=turn, S=back, Space=stop, C=center, X=e-stop, Q=quit");

    enable_raw_mode()?;
    let result = run_teleop(&publisher).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut current = DriveCommand::Stop;
    let mut last_movement_input = Instant::now();

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;

                let next = match code {
                    KeyCode::Char('w') if pressed => Some(DriveCommand::Forward),
                    KeyCode::Char('s') if pressed => Some(DriveCommand::Backward),
                    KeyCode::Char('a') if pressed => Some(DriveCommand::TurnLeft),
                    KeyCode::Char('d') if pressed => Some(DriveCommand::TurnRight),
                    KeyCode::Char(' ') if pressed => Some(DriveCommand::Stop),
                    KeyCode::Char('c') if pressed => Some(DriveCommand::Center),
                    KeyCode::Char('x') if pressed => Some(DriveCommand::EmergencyStop),

                    // Quit
                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => None,
                };

                if let Some(cmd) = next {
                    if cmd != current {
                        info!("Command: {:?}", cmd);
                    }
                    current = cmd;
                    last_movement_input = Instant::now();
                }
            }
        }

        // Motion needs a held key; stop and latch commands stay as sent
        let is_motion = matches!(
            current,
            DriveCommand::Forward
                | DriveCommand::Backward
                | DriveCommand::TurnLeft
                | DriveCommand::TurnRight
        );
        if is_motion && last_movement_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            current = DriveCommand::Stop;
        }

        // Always publish at ~50Hz so the runtime watchdog stays fed
        publisher.put(vec![current.as_byte()]).await?;
    }

    // Leave the robot at rest
    publisher.put(vec![DriveCommand::Stop.as_byte()]).await?;
    Ok(())
}
