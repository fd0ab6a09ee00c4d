use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default control port of the IP control protocol
pub const DEFAULT_PORT: u16 = 23;

/// Driver tuning
///
/// Every transport call is bounded by the three I/O timeouts; the poller
/// sleeps `poll_interval` between cycles and power commands wait
/// `settle_delay` before the device is queried again.
///
/// Durations serialize as whole milliseconds so the config can be kept in a
/// JSON file next to the host application's other settings:
///
/// ```
/// use oppo_ipcontrol::DriverConfig;
///
/// let config: DriverConfig =
///     serde_json::from_str(r#"{ "poll_interval_ms": 5000, "extended_metadata": true }"#).unwrap();
/// assert_eq!(config.poll_interval.as_secs(), 5);
/// assert_eq!(config.read_timeout.as_secs(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    #[serde(rename = "connect_timeout_ms", with = "millis")]
    pub connect_timeout: Duration,

    #[serde(rename = "write_timeout_ms", with = "millis")]
    pub write_timeout: Duration,

    #[serde(rename = "read_timeout_ms", with = "millis")]
    pub read_timeout: Duration,

    /// Maximum bytes read for one response
    pub read_buffer_size: usize,

    #[serde(rename = "poll_interval_ms", with = "millis")]
    pub poll_interval: Duration,

    #[serde(rename = "settle_delay_ms", with = "millis")]
    pub settle_delay: Duration,

    /// Query track/disc metadata (firmware that answers #QTN, #QEL, ...)
    pub extended_metadata: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(3),
            write_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_secs(2),
            read_buffer_size: 2048,
            poll_interval: Duration::from_secs(2),
            settle_delay: Duration::from_secs(2),
            extended_metadata: false,
        }
    }
}

impl DriverConfig {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_extended_metadata(mut self, enabled: bool) -> Self {
        self.extended_metadata = enabled;
        self
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_recommendations() {
        let config = DriverConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.write_timeout, Duration::from_secs(1));
        assert_eq!(config.read_timeout, Duration::from_secs(2));
        assert_eq!(config.read_buffer_size, 2048);
        assert!(!config.extended_metadata);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: DriverConfig = serde_json::from_str(r#"{ "settle_delay_ms": 250 }"#).unwrap();
        assert_eq!(config.settle_delay, Duration::from_millis(250));
        assert_eq!(config.poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn serializes_durations_as_millis() {
        let json = serde_json::to_value(DriverConfig::default()).unwrap();
        assert_eq!(json["connect_timeout_ms"], 3000);
        assert_eq!(json["poll_interval_ms"], 2000);
    }
}
