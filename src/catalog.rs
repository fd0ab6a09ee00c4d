//! Mapping between logical operations and IP control command lines

use crate::error::{OppoError, Result};
use crate::types::{metadata, Source, VolumePercent};
use std::fmt;

/// Lead character of every command line
pub const COMMAND_PREFIX: char = '#';

/// Logical operations understood by the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    PowerOn,
    PowerOff,
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    SetVolume(VolumePercent),
    VolumeUp,
    VolumeDown,
    /// The device only offers a toggle
    ToggleMute,
    SelectSource(Source),
    Navigate(NavKey),
    Query(Query),
}

impl Command {
    /// Command line without the trailing carriage return
    pub fn to_wire(&self) -> String {
        match self {
            Command::PowerOn => "#PON".to_string(),
            Command::PowerOff => "#POF".to_string(),
            Command::Play => "#PLA".to_string(),
            Command::Pause => "#PAU".to_string(),
            Command::Stop => "#STP".to_string(),
            Command::Next => "#NXT".to_string(),
            Command::Previous => "#PRE".to_string(),
            Command::SetVolume(percent) => format!("#SVL {}", percent),
            Command::VolumeUp => "#VUP".to_string(),
            Command::VolumeDown => "#VDN".to_string(),
            Command::ToggleMute => "#MUT".to_string(),
            Command::SelectSource(source) => format!("#SIS {}", source.index()),
            Command::Navigate(key) => key.code().to_string(),
            Command::Query(query) => query.code().to_string(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

/// Status queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    Power,
    Volume,
    Source,
    PlayStatus,
    TrackTitle,
    Album,
    Performer,
    Elapsed,
    Remaining,
    Firmware,
    DiscType,
    RepeatMode,
}

impl Query {
    /// Queries issued once per power-on edge when metadata is enabled
    pub const METADATA: [Query; 8] = [
        Query::TrackTitle,
        Query::Album,
        Query::Performer,
        Query::Elapsed,
        Query::Remaining,
        Query::Firmware,
        Query::DiscType,
        Query::RepeatMode,
    ];

    /// Queries that change while media is loaded
    pub const TRACK: [Query; 5] = [
        Query::TrackTitle,
        Query::Album,
        Query::Performer,
        Query::Elapsed,
        Query::Remaining,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Query::Power => "#QPW",
            Query::Volume => "#QVL",
            Query::Source => "#QIS",
            Query::PlayStatus => "#QPL",
            Query::TrackTitle => "#QTN",
            Query::Album => "#QTA",
            Query::Performer => "#QTP",
            Query::Elapsed => "#QEL",
            Query::Remaining => "#QRE",
            Query::Firmware => "#QVR",
            Query::DiscType => "#QDT",
            Query::RepeatMode => "#QRP",
        }
    }

    /// Key the answer is stored under in the extended metadata map
    pub fn metadata_key(self) -> Option<&'static str> {
        match self {
            Query::TrackTitle => Some(metadata::TRACK_TITLE),
            Query::Album => Some(metadata::ALBUM),
            Query::Performer => Some(metadata::PERFORMER),
            Query::Elapsed => Some(metadata::ELAPSED_SECONDS),
            Query::Remaining => Some(metadata::REMAINING_SECONDS),
            Query::Firmware => Some(metadata::FIRMWARE_VERSION),
            Query::DiscType => Some(metadata::DISC_TYPE),
            Query::RepeatMode => Some(metadata::REPEAT_MODE),
            Query::Power | Query::Volume | Query::Source | Query::PlayStatus => None,
        }
    }

    /// Whether the answer is an `HH:MM:SS` time
    pub fn is_time(self) -> bool {
        matches!(self, Query::Elapsed | Query::Remaining)
    }
}

/// Remote-control navigation buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavKey {
    Up,
    Down,
    Left,
    Right,
    Enter,
    Home,
}

impl NavKey {
    pub const ALL: [NavKey; 6] = [
        NavKey::Up,
        NavKey::Down,
        NavKey::Left,
        NavKey::Right,
        NavKey::Enter,
        NavKey::Home,
    ];

    pub fn code(self) -> &'static str {
        match self {
            NavKey::Up => "#NUP",
            NavKey::Down => "#NDN",
            NavKey::Left => "#NLT",
            NavKey::Right => "#NRT",
            NavKey::Enter => "#SEL",
            NavKey::Home => "#HOM",
        }
    }

    /// Short name used by the passthrough preset table
    pub fn name(self) -> &'static str {
        match self {
            NavKey::Up => "up",
            NavKey::Down => "down",
            NavKey::Left => "left",
            NavKey::Right => "right",
            NavKey::Enter => "enter",
            NavKey::Home => "home",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            NavKey::Up => "Move cursor up",
            NavKey::Down => "Move cursor down",
            NavKey::Left => "Move cursor left",
            NavKey::Right => "Move cursor right",
            NavKey::Enter => "Select/Enter",
            NavKey::Home => "Return to home screen",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|key| key.name().eq_ignore_ascii_case(name))
    }
}

/// Resolve a passthrough preset name (`"up"`, `"home"`, ...) to its command
pub fn preset_command(name: &str) -> Result<Command> {
    NavKey::from_name(name)
        .map(Command::Navigate)
        .ok_or_else(|| OppoError::UnknownPreset(name.to_string()))
}

/// Prepare a caller-supplied command for the wire
///
/// Surrounding whitespace is dropped and the command prefix is added when
/// missing. Everything else is forwarded verbatim.
pub fn normalize_raw(command: &str) -> Result<String> {
    let command = command.trim();
    if command.is_empty() || command == COMMAND_PREFIX.to_string() {
        return Err(OppoError::EmptyCommand);
    }

    if command.starts_with(COMMAND_PREFIX) {
        Ok(command.to_string())
    } else {
        Ok(format!("{}{}", COMMAND_PREFIX, command))
    }
}
