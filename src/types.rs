use crate::config::DEFAULT_PORT;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Volume in whole percent (0-100)
pub type VolumePercent = u8;

/// Extended metadata keyed by the names in [`metadata`]
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Keys used in [`DeviceState::extended_metadata`]
pub mod metadata {
    pub const TRACK_TITLE: &str = "track_title";
    pub const ALBUM: &str = "album";
    pub const PERFORMER: &str = "performer";
    pub const ELAPSED_SECONDS: &str = "elapsed_seconds";
    pub const REMAINING_SECONDS: &str = "remaining_seconds";
    pub const FIRMWARE_VERSION: &str = "firmware_version";
    pub const DISC_TYPE: &str = "disc_type";
    pub const REPEAT_MODE: &str = "repeat_mode";
}

/// Network location of a player's control port
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceAddress {
    host: String,
    port: u16,
}

impl DeviceAddress {
    /// Address on the standard control port (23)
    pub fn new(host: impl Into<String>) -> Self {
        Self::with_port(host, DEFAULT_PORT)
    }

    /// Address on a non-standard port, e.g. behind a serial-to-IP bridge
    pub fn with_port(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Power and transport state as one value
///
/// `Idle` means powered on but not playing (stopped, menus, no disc).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    #[default]
    Off,
    Idle,
    Playing,
    Paused,
}

impl PowerState {
    pub fn is_on(self) -> bool {
        self != PowerState::Off
    }
}

/// Input sources of the UDP-20x series, in `#SIS` index order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Source {
    Disc,
    HdmiIn,
    HdmiArc,
}

impl Source {
    /// All sources in index order
    pub const ALL: [Source; 3] = [Source::Disc, Source::HdmiIn, Source::HdmiArc];

    /// Index used by `#SIS` and reported by `#QIS`
    pub fn index(self) -> u8 {
        match self {
            Source::Disc => 0,
            Source::HdmiIn => 1,
            Source::HdmiArc => 2,
        }
    }

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            Source::Disc => "Disc",
            Source::HdmiIn => "HDMI In",
            Source::HdmiArc => "ARC: HDMI Out",
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.index() == index)
    }

    /// Case-insensitive lookup by display name
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Snapshot of everything known about the player
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub power: PowerState,

    pub volume_percent: VolumePercent,

    pub muted: bool,

    /// Always `None` while `power` is `Off`
    pub current_source: Option<Source>,

    /// Only populated when extended metadata polling is enabled
    pub extended_metadata: Option<Metadata>,
}

impl DeviceState {
    /// Volume normalized to 0.0..=1.0
    pub fn volume_level(&self) -> f64 {
        f64::from(self.volume_percent) / 100.0
    }

    /// Look up one extended metadata entry
    pub fn metadata(&self, key: &str) -> Option<&serde_json::Value> {
        self.extended_metadata.as_ref().and_then(|m| m.get(key))
    }
}
