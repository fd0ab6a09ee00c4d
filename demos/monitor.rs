//! Watch an Oppo player and drive it from the terminal
//!
//! ```text
//! cargo run --example monitor -- 192.168.1.60
//! ```
//!
//! Every state change is printed. Lines typed on stdin are commands:
//! `on`, `off`, `play`, `pause`, `stop`, `next`, `prev`, `up`/`down` (volume),
//! `vol <0-100>`, `mute`, `unmute`, `src <name>`, `key <up|down|left|right|enter|home>`;
//! `help` lists the navigation keys; anything else is sent as a raw protocol
//! command. Set `RUST_LOG=debug` to
//! see the wire traffic.

use oppo_ipcontrol::{DeviceAddress, DeviceState, DriverConfig, NavKey, OppoDriver, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

fn describe(state: &DeviceState) -> String {
    let source = state
        .current_source
        .map(|s| s.name())
        .unwrap_or("-");
    let volume = if state.muted {
        "muted".to_string()
    } else {
        format!("{}%", state.volume_percent)
    };
    let mut line = format!("{:?} | {} | {}", state.power, source, volume);
    if let Some(meta) = &state.extended_metadata {
        for (key, value) in meta {
            line.push_str(&format!(" | {}={}", key, value));
        }
    }
    line
}

async fn run_command(driver: &OppoDriver, line: &str) -> Result<()> {
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    match word {
        "on" => driver.turn_on().await,
        "off" => driver.turn_off().await,
        "play" => driver.play().await,
        "pause" => driver.pause().await,
        "stop" => driver.stop_playback().await,
        "next" => driver.next_track().await,
        "prev" => driver.previous_track().await,
        "up" => driver.volume_up().await,
        "down" => driver.volume_down().await,
        "mute" => driver.mute(true).await,
        "unmute" => driver.mute(false).await,
        "vol" => match rest.trim().parse::<f64>() {
            Ok(percent) => driver.set_volume(percent / 100.0).await,
            Err(_) => {
                println!("usage: vol <0-100>");
                Ok(())
            }
        },
        "src" => driver.select_source_by_name(rest).await,
        "key" => driver.send_preset(rest).await,
        "help" => {
            for key in NavKey::ALL {
                println!("key {:<6} {}", key.name(), key.description());
            }
            Ok(())
        }
        _ => driver.send_raw(line).await,
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let host = std::env::args()
        .nth(1)
        .ok_or("usage: monitor <host> [--metadata]")?;
    let metadata = std::env::args().any(|a| a == "--metadata");

    let config = DriverConfig::default().with_extended_metadata(metadata);
    let driver = OppoDriver::with_config(DeviceAddress::new(host), config);
    driver.on_state_change(|state| println!("{}", describe(state)));
    driver.start()?;

    println!("Sources: {:?}", driver.source_list().iter().map(|s| s.name()).collect::<Vec<_>>());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if let Err(e) = run_command(&driver, line).await {
                    println!("{}: {}", line, e);
                }
            }
        }
    }

    driver.stop().await;
    Ok(())
}
