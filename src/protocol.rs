//! Response decoding
//!
//! Replies are a single free-text line. A reply counts only when it carries
//! the acknowledgment marker; the whitespace-separated tokens after the
//! marker are the payload. Field readers never panic: a payload in the wrong
//! shape comes back as [`OppoError::UnparsableField`] so the caller can skip
//! that one update.

use crate::catalog::Query;
use crate::error::{OppoError, Result};
use crate::types::{PowerState, Source, VolumePercent};
use serde_json::Value;

/// Positive acknowledgment marker
pub const ACK_MARKER: &str = "@OK";

/// Unsolicited volume update marker, accepted as an acknowledgment
pub const VOLUME_UPDATE_MARKER: &str = "@UVL";

/// Which marker acknowledged a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckMarker {
    Ok,
    VolumeUpdate,
}

/// Tagged result of decoding one reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedResponse {
    /// Marker found; `payload` holds the tokens that follow it
    Ack {
        marker: AckMarker,
        payload: Vec<String>,
        raw: String,
    },
    /// Non-empty text without a marker (error reply, garbage, truncation)
    NoAck(String),
    /// Nothing was read
    Empty,
}

/// Volume line reading; the two cases are mutually exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeReading {
    Muted,
    Level(VolumePercent),
}

/// Power query reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerReading {
    On,
    Off,
}

/// Decode raw reply text
pub fn parse(raw: &str) -> ParsedResponse {
    let raw = raw.trim();
    if raw.is_empty() {
        return ParsedResponse::Empty;
    }

    let tokens: Vec<&str> = raw.split_whitespace().collect();
    for (index, token) in tokens.iter().enumerate() {
        let marker = if token.contains(ACK_MARKER) {
            AckMarker::Ok
        } else if token.contains(VOLUME_UPDATE_MARKER) {
            AckMarker::VolumeUpdate
        } else {
            continue;
        };

        return ParsedResponse::Ack {
            marker,
            payload: tokens[index + 1..].iter().map(|t| t.to_string()).collect(),
            raw: raw.to_string(),
        };
    }

    ParsedResponse::NoAck(raw.to_string())
}

impl ParsedResponse {
    pub fn is_ack(&self) -> bool {
        matches!(self, ParsedResponse::Ack { .. })
    }

    /// Payload tokens, or `MalformedResponse` when the reply was not acknowledged
    pub fn payload(&self) -> Result<&[String]> {
        match self {
            ParsedResponse::Ack { payload, .. } => Ok(payload),
            ParsedResponse::NoAck(raw) => Err(OppoError::MalformedResponse(raw.clone())),
            ParsedResponse::Empty => Err(OppoError::MalformedResponse(String::new())),
        }
    }

    /// Raw text for diagnostics
    pub fn raw(&self) -> &str {
        match self {
            ParsedResponse::Ack { raw, .. } | ParsedResponse::NoAck(raw) => raw,
            ParsedResponse::Empty => "",
        }
    }

    fn unparsable(&self, field: &'static str) -> OppoError {
        OppoError::UnparsableField {
            field,
            raw: self.raw().to_string(),
        }
    }

    fn first_token(&self, field: &'static str) -> Result<&str> {
        self.payload()?
            .first()
            .map(String::as_str)
            .ok_or_else(|| self.unparsable(field))
    }

    /// `#QPW`: on iff the payload mentions "ON"
    pub fn power(&self) -> Result<PowerReading> {
        let on = self
            .payload()?
            .iter()
            .any(|token| token.to_ascii_uppercase().contains("ON"));
        Ok(if on { PowerReading::On } else { PowerReading::Off })
    }

    /// `#QVL`, `#SVL`, `#VUP`, `#VDN` and `@UVL` updates
    pub fn volume(&self) -> Result<VolumeReading> {
        let token = self.first_token("volume")?;
        if token.eq_ignore_ascii_case("MUTE") {
            return Ok(VolumeReading::Muted);
        }

        match token.parse::<u16>() {
            Ok(value) if value <= 100 => Ok(VolumeReading::Level(value as VolumePercent)),
            _ => Err(self.unparsable("volume")),
        }
    }

    /// `#QPL`: `None` for statuses that say nothing about the transport
    /// (menus, loading, tray open, ...)
    pub fn play_status(&self) -> Result<Option<PowerState>> {
        let status = self.payload()?.join(" ").to_ascii_lowercase();
        if status.contains("play") {
            Ok(Some(PowerState::Playing))
        } else if status.contains("pause") {
            Ok(Some(PowerState::Paused))
        } else if status.contains("stop") {
            Ok(Some(PowerState::Idle))
        } else {
            Ok(None)
        }
    }

    /// `#QIS`: numeric source index
    pub fn source(&self) -> Result<Source> {
        let token = self.first_token("source")?;
        token
            .parse::<u8>()
            .ok()
            .and_then(Source::from_index)
            .ok_or_else(|| self.unparsable("source"))
    }

    /// `#MUT` reply: `Some(true)` for MUTE, `Some(false)` for UNMUTE
    pub fn mute(&self) -> Result<Option<bool>> {
        let payload = self.payload()?.join(" ").to_ascii_uppercase();
        if payload.contains("UNMUTE") {
            Ok(Some(false))
        } else if payload.contains("MUTE") {
            Ok(Some(true))
        } else {
            Ok(None)
        }
    }

    /// Metadata query answer as a JSON value (seconds for time queries,
    /// the payload text otherwise)
    pub fn metadata_value(&self, query: Query) -> Result<Value> {
        let field = query.metadata_key().unwrap_or("metadata");
        let payload = self.payload()?;
        if payload.is_empty() {
            return Err(self.unparsable(field));
        }

        if query.is_time() {
            parse_seconds(&payload[0])
                .map(Value::from)
                .ok_or_else(|| self.unparsable(field))
        } else {
            Ok(Value::String(payload.join(" ")))
        }
    }
}

/// `HH:MM:SS`, `MM:SS` or plain seconds
fn parse_seconds(token: &str) -> Option<u64> {
    let mut total = 0u64;
    for (index, part) in token.split(':').enumerate() {
        let part: u64 = part.parse().ok()?;
        if index > 0 && part >= 60 {
            return None;
        }
        total = total * 60 + part;
    }
    Some(total)
}
