//! Periodic status polling
//!
//! One cycle:
//!
//! 1. `#QPW`. No reply, an empty reply or an acknowledged reply without
//!    "ON" forces the device off and ends the cycle. A reply without the
//!    acknowledgment marker is not authoritative and also ends the cycle,
//!    leaving the state as it was.
//! 2. "ON" while off or unsynced is a rising edge: Idle plus the full
//!    cascade (volume, source, metadata). A cascade that could not read
//!    volume or source leaves the model unsynced and runs again next cycle.
//! 3. Otherwise the volume is refreshed, since the physical remote can
//!    change it at any time.
//! 4. `#QPL` updates Playing / Paused / Idle.
//! 5. Track metadata is refreshed while media is loaded.
//!
//! A connection failure anywhere in the cycle forces the device off; a
//! silent device cannot be told apart from a powered-off one.

use crate::catalog::Query;
use crate::error::Result;
use crate::protocol::{ParsedResponse, PowerReading};
use crate::session::Session;
use crate::state::StateModel;
use crate::types::PowerState;
use std::sync::Arc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Run one cycle under the session guard and publish the outcome
pub(crate) async fn run_cycle(session: &Session) {
    let mut model = session.lock().await;

    if let Err(e) = poll_cycle(session, &mut model).await {
        tracing::error!("Error polling {}: {}", session.address(), e);
        if model.fail_safe() {
            tracing::info!("{} unreachable, assuming it is off", session.address());
        }
    }

    session.publish(&mut model);
}

async fn poll_cycle(session: &Session, model: &mut StateModel) -> Result<()> {
    let response = match session.query_power().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("No reply to {} from {}: {}", Query::Power.code(), session.address(), e);
            if model.fail_safe() {
                tracing::info!("{} stopped answering, assuming it is off", session.address());
            }
            return Ok(());
        }
    };

    let reading = match &response {
        ParsedResponse::Empty => {
            if model.fail_safe() {
                tracing::info!("Empty power reply from {}, assuming it is off", session.address());
            }
            return Ok(());
        }
        ParsedResponse::NoAck(raw) => {
            tracing::debug!("Ignoring unacknowledged power reply {:?}", raw);
            return Ok(());
        }
        ParsedResponse::Ack { .. } => response.power()?,
    };

    if reading == PowerReading::Off {
        if model.confirm_off() {
            tracing::info!("{} confirmed off", session.address());
        }
        return Ok(());
    }

    if model.needs_cascade() {
        tracing::info!("{} powered on, refreshing full state", session.address());
        model.power_on();
        session.cascade(model).await?;
    } else {
        session.refresh_volume(model).await?;
    }

    session.refresh_play_status(model).await?;

    if session.config().extended_metadata
        && matches!(model.power(), PowerState::Playing | PowerState::Paused)
    {
        session.refresh_metadata(model, &Query::TRACK).await?;
    }

    Ok(())
}

/// Poll until `shutdown` is cancelled
///
/// Cancellation is observed between cycles; a cycle in progress always
/// runs to completion.
pub(crate) async fn run(session: Arc<Session>, shutdown: CancellationToken) {
    let interval = session.config().poll_interval;
    tracing::info!("Polling {} every {:?}", session.address(), interval);

    loop {
        run_cycle(&session).await;

        if shutdown.is_cancelled() {
            break;
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = sleep(interval) => {}
        }
    }

    tracing::info!("Polling of {} stopped", session.address());
}
