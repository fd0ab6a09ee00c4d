//! Rust library for controlling Oppo UDP-20x media players over the IP
//! control protocol
//!
//! The players expose a plaintext, line-oriented control port (TCP 23). This
//! library keeps an eventually-consistent model of a player by polling it and
//! lets you issue commands without corrupting that model when the player
//! times out, answers garbage or drops off the network. It supports:
//!
//! - Power on/off with a settle delay and a full state refresh on power-on
//! - Transport control (play, pause, stop, next, previous)
//! - Absolute and stepped volume, mute
//! - Input source selection (Disc, HDMI In, ARC: HDMI Out)
//! - Menu navigation and raw command passthrough
//! - Optional track and disc metadata polling
//! - State change callbacks and subscriptions
//!
//! # Quick Start
//!
//! ```no_run
//! use oppo_ipcontrol::{DeviceAddress, OppoDriver};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let driver = OppoDriver::new(DeviceAddress::new("192.168.1.60"));
//!     driver.start()?;
//!
//!     let mut updates = driver.subscribe();
//!     driver.turn_on().await?;
//!
//!     while let Ok(update) = updates.recv().await {
//!         println!("{:?} -> {:?}", update.previous.power, update.current.power);
//!         if update.current.current_source.is_some() {
//!             break;
//!         }
//!     }
//!
//!     driver.set_volume(0.25).await?;
//!     driver.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Driver**: public API, one method per remote-control operation
//! - **Poller**: background task that queries the player every interval
//! - **Session**: serialized access to the state model, change publishing
//! - **State**: reconciliation rules for merging query results
//! - **Connection**: one TCP connection per command, bounded by timeouts
//! - **Protocol**: response decoding
//! - **Catalog**: command strings and code tables

mod catalog;
mod config;
mod connection;
mod driver;
mod error;
mod poller;
mod protocol;
mod session;
mod state;
mod subscription;
mod types;

// Public exports
pub use catalog::{normalize_raw, preset_command, Command, NavKey, Query, COMMAND_PREFIX};
pub use config::{DriverConfig, DEFAULT_PORT};
pub use connection::{Connection, Reply};
pub use driver::OppoDriver;
pub use error::{OppoError, Result};
pub use protocol::{
    parse, AckMarker, ParsedResponse, PowerReading, VolumeReading, ACK_MARKER,
    VOLUME_UPDATE_MARKER,
};
pub use session::StateObserver;
pub use subscription::{StateReceiver, StateUpdate};
pub use types::{metadata, DeviceAddress, DeviceState, Metadata, PowerState, Source, VolumePercent};
