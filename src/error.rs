use thiserror::Error;

/// Result type for Oppo operations
pub type Result<T> = std::result::Result<T, OppoError>;

/// Errors that can occur when talking to an Oppo player
#[derive(Error, Debug)]
pub enum OppoError {
    /// TCP connect did not complete in time
    #[error("Connect timeout")]
    ConnectTimeout,

    /// Writing the command line did not complete in time
    #[error("Write timeout")]
    WriteTimeout,

    /// No response arrived in time
    #[error("Read timeout")]
    ReadTimeout,

    /// Connection refused, unreachable host or any other socket failure
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// Response did not carry the acknowledgment marker
    #[error("Malformed response: {0:?}")]
    MalformedResponse(String),

    /// Response was acknowledged but a payload token had the wrong shape
    #[error("Unparsable {field} in response: {raw:?}")]
    UnparsableField {
        /// Logical field being decoded (e.g. "volume")
        field: &'static str,
        /// Raw response text for diagnostics
        raw: String,
    },

    /// Source name not in the device's source list
    #[error("Unknown source: {0}")]
    UnknownSource(String),

    /// Passthrough preset name not in the key table
    #[error("Unknown preset command: {0}")]
    UnknownPreset(String),

    /// Passthrough command was blank
    #[error("Empty command")]
    EmptyCommand,

    /// Requested volume level outside 0.0..=1.0
    #[error("Invalid volume level: {0}")]
    InvalidVolume(f64),

    /// Polling loop already started for this driver
    #[error("Driver already running")]
    AlreadyRunning,

    /// Driver was dropped; no more state updates will arrive
    #[error("Driver closed")]
    DriverClosed,

    /// Subscriber fell behind and missed updates
    #[error("Lagged by {0} state updates")]
    ChannelLagged(u64),
}

impl OppoError {
    /// Whether this error is one of the bounded-timeout failures
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            OppoError::ConnectTimeout | OppoError::WriteTimeout | OppoError::ReadTimeout
        )
    }

    /// Whether this error came from the transport rather than from parsing
    /// or argument validation
    pub fn is_transport(&self) -> bool {
        self.is_timeout() || matches!(self, OppoError::Connection(_))
    }
}
