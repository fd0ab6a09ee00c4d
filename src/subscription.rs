use crate::error::{OppoError, Result};
use crate::types::DeviceState;
use tokio::sync::broadcast;

/// A reconciled change of the device state
#[derive(Debug, Clone, PartialEq)]
pub struct StateUpdate {
    /// Snapshot published before this change
    pub previous: DeviceState,

    /// Snapshot after this change
    pub current: DeviceState,
}

/// Receiver for state updates
pub struct StateReceiver {
    rx: broadcast::Receiver<StateUpdate>,
}

impl StateReceiver {
    pub(crate) fn new(rx: broadcast::Receiver<StateUpdate>) -> Self {
        Self { rx }
    }

    /// Receive the next state update
    ///
    /// Fails with `DriverClosed` once the driver is dropped, or with
    /// `ChannelLagged` if this receiver fell behind.
    pub async fn recv(&mut self) -> Result<StateUpdate> {
        self.rx.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => OppoError::DriverClosed,
            broadcast::error::RecvError::Lagged(n) => OppoError::ChannelLagged(n),
        })
    }

    /// Try to receive a state update without blocking
    ///
    /// Returns `None` if no update is queued.
    pub fn try_recv(&mut self) -> Result<Option<StateUpdate>> {
        match self.rx.try_recv() {
            Ok(update) => Ok(Some(update)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Closed) => Err(OppoError::DriverClosed),
            Err(broadcast::error::TryRecvError::Lagged(n)) => Err(OppoError::ChannelLagged(n)),
        }
    }
}
