#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]
//! Mock Oppo UDP-20x for testing
//!
//! Simulates the IP control protocol: one command per connection, `\r`
//! terminated, `@OK ...` replies. Individual commands can be overridden to
//! reply with arbitrary text, stay silent, or reset the connection.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use oppo_ipcontrol::DeviceAddress;

/// How the mock answers an overridden command
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Reply with this text instead of the simulated answer
    Reply(String),
    /// Read the command, never answer
    Silent,
    /// Read the command, then reset the connection
    Reset,
}

/// Mock player state
#[derive(Debug, Clone)]
pub struct MockOppoState {
    pub power: bool,
    pub volume: u8,
    pub muted: bool,
    pub source: u8,
    /// Play status word reported by #QPL
    pub status: String,
    pub track_title: String,
    pub album: String,
    pub performer: String,
    pub elapsed: String,
    pub remaining: String,
    pub firmware: String,
    pub disc_type: String,
    pub repeat_mode: String,
    /// Every command line received, in order
    pub received: Vec<String>,
    pub overrides: HashMap<String, Behavior>,
}

impl Default for MockOppoState {
    fn default() -> Self {
        Self {
            power: false,
            volume: 20,
            muted: false,
            source: 0,
            status: "STOP".to_string(),
            track_title: "So What".to_string(),
            album: "Kind of Blue".to_string(),
            performer: "Miles Davis".to_string(),
            elapsed: "00:01:05".to_string(),
            remaining: "00:08:17".to_string(),
            firmware: "UDP20X-54-0130".to_string(),
            disc_type: "CDDA".to_string(),
            repeat_mode: "00 Off".to_string(),
            received: Vec::new(),
            overrides: HashMap::new(),
        }
    }
}

/// Mock player listening on a random local port
pub struct MockOppo {
    addr: SocketAddr,
    state: Arc<Mutex<MockOppoState>>,
    handle: JoinHandle<()>,
}

impl MockOppo {
    pub async fn start() -> Self {
        Self::start_with(MockOppoState::default()).await
    }

    pub async fn start_with(initial: MockOppoState) -> Self {
        let state = Arc::new(Mutex::new(initial));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let state_clone = state.clone();
        let handle = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _)) => {
                        let state = state_clone.clone();
                        tokio::spawn(async move {
                            handle_connection(stream, state).await;
                        });
                    }
                    Err(_) => break,
                }
            }
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn address(&self) -> DeviceAddress {
        DeviceAddress::with_port("127.0.0.1", self.addr.port())
    }

    /// Mutate the simulated player
    pub fn update(&self, f: impl FnOnce(&mut MockOppoState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn snapshot(&self) -> MockOppoState {
        self.state.lock().unwrap().clone()
    }

    pub fn received(&self) -> Vec<String> {
        self.state.lock().unwrap().received.clone()
    }

    pub fn clear_received(&self) {
        self.state.lock().unwrap().received.clear();
    }

    pub fn set_override(&self, command: &str, behavior: Behavior) {
        self.state
            .lock()
            .unwrap()
            .overrides
            .insert(command.to_string(), behavior);
    }

    pub fn clear_overrides(&self) {
        self.state.lock().unwrap().overrides.clear();
    }

    /// Stop listening; later connects are refused
    pub async fn stop(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}

async fn handle_connection(mut stream: TcpStream, state: Arc<Mutex<MockOppoState>>) {
    let mut line = Vec::new();
    {
        let mut reader = BufReader::new(&mut stream);
        if reader.read_until(b'\r', &mut line).await.is_err() {
            return;
        }
    }
    let command = String::from_utf8_lossy(&line).trim().to_string();
    if command.is_empty() {
        return;
    }

    let outcome = {
        let mut state = state.lock().unwrap();
        state.received.push(command.clone());
        match state.overrides.get(&command).cloned() {
            Some(behavior) => behavior,
            None => Behavior::Reply(simulate(&mut state, &command)),
        }
    };

    match outcome {
        Behavior::Reply(reply) => {
            let _ = stream.write_all(format!("{}\r", reply).as_bytes()).await;
            let _ = stream.shutdown().await;
        }
        Behavior::Silent => {
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
        Behavior::Reset => {
            #[allow(deprecated)]
            let _ = stream.set_linger(Some(Duration::ZERO));
            drop(stream);
        }
    }
}

/// Apply a command to the simulated player and build its reply
fn simulate(state: &mut MockOppoState, command: &str) -> String {
    let mut parts = command.split_whitespace();
    let code = parts.next().unwrap_or_default();
    let arg = parts.next();

    match code {
        "#QPW" => return format!("@OK {}", if state.power { "ON" } else { "OFF" }),
        "#PON" => {
            state.power = true;
            return "@OK ON".to_string();
        }
        "#POF" => {
            state.power = false;
            return "@OK OFF".to_string();
        }
        _ => {}
    }

    if !state.power {
        return "@ER OFF".to_string();
    }

    match code {
        "#QVL" => {
            if state.muted {
                "@OK MUTE".to_string()
            } else {
                format!("@OK {}", state.volume)
            }
        }
        "#SVL" => match arg.and_then(|a| a.parse::<u8>().ok()) {
            Some(volume) if volume <= 100 => {
                state.volume = volume;
                state.muted = false;
                format!("@OK {}", volume)
            }
            _ => "@ER INVALID".to_string(),
        },
        "#VUP" => {
            state.volume = (state.volume + 1).min(100);
            state.muted = false;
            format!("@OK {}", state.volume)
        }
        "#VDN" => {
            state.volume = state.volume.saturating_sub(1);
            state.muted = false;
            format!("@OK {}", state.volume)
        }
        "#MUT" => {
            state.muted = !state.muted;
            format!("@OK {}", if state.muted { "MUTE" } else { "UNMUTE" })
        }
        "#QIS" => format!("@OK {}", state.source),
        "#SIS" => match arg.and_then(|a| a.parse::<u8>().ok()) {
            Some(source) if source <= 2 => {
                state.source = source;
                format!("@OK {}", source)
            }
            _ => "@ER INVALID".to_string(),
        },
        "#QPL" => format!("@OK {}", state.status),
        "#PLA" => {
            state.status = "PLAY".to_string();
            "@OK PLAY".to_string()
        }
        "#PAU" => {
            state.status = "PAUSE".to_string();
            "@OK PAUSE".to_string()
        }
        "#STP" => {
            state.status = "STOP".to_string();
            "@OK STOP".to_string()
        }
        "#QTN" => format!("@OK {}", state.track_title),
        "#QTA" => format!("@OK {}", state.album),
        "#QTP" => format!("@OK {}", state.performer),
        "#QEL" => format!("@OK {}", state.elapsed),
        "#QRE" => format!("@OK {}", state.remaining),
        "#QVR" => format!("@OK {}", state.firmware),
        "#QDT" => format!("@OK {}", state.disc_type),
        "#QRP" => format!("@OK {}", state.repeat_mode),
        _ => "@OK".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_player_ignores_queries_while_off() {
        let mut state = MockOppoState::default();
        assert_eq!(simulate(&mut state, "#QPW"), "@OK OFF");
        assert_eq!(simulate(&mut state, "#QVL"), "@ER OFF");
        assert_eq!(simulate(&mut state, "#PON"), "@OK ON");
        assert_eq!(simulate(&mut state, "#QVL"), "@OK 20");
    }

    #[test]
    fn simulated_mute_toggles() {
        let mut state = MockOppoState {
            power: true,
            ..Default::default()
        };
        assert_eq!(simulate(&mut state, "#MUT"), "@OK MUTE");
        assert_eq!(simulate(&mut state, "#QVL"), "@OK MUTE");
        assert_eq!(simulate(&mut state, "#MUT"), "@OK UNMUTE");
    }
}
