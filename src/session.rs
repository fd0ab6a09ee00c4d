use crate::catalog::{Command, Query};
use crate::config::DriverConfig;
use crate::connection::Connection;
use crate::error::{OppoError, Result};
use crate::protocol::ParsedResponse;
use crate::state::StateModel;
use crate::subscription::{StateReceiver, StateUpdate};
use crate::types::{DeviceAddress, DeviceState};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, watch, MutexGuard};

/// Callback invoked with every published state
pub type StateObserver = Arc<dyn Fn(&DeviceState) + Send + Sync>;

/// Everything one device session shares between the poller and commands
///
/// The model sits behind an async mutex that is held for a whole poll cycle
/// or command, including its network round-trips. Polls and commands are
/// therefore serialized and never have two calls in flight to the device.
/// Readers use the published snapshot instead and never wait on the guard.
pub(crate) struct Session {
    connection: Connection,
    config: DriverConfig,
    model: tokio::sync::Mutex<StateModel>,
    snapshot_tx: watch::Sender<DeviceState>,
    update_tx: broadcast::Sender<StateUpdate>,
    observers: Mutex<Vec<StateObserver>>,
}

impl Session {
    pub fn new(address: DeviceAddress, config: DriverConfig) -> Self {
        let model = StateModel::new(config.extended_metadata);
        let (snapshot_tx, _) = watch::channel(model.state().clone());
        let (update_tx, _) = broadcast::channel(100);

        Self {
            connection: Connection::new(address, &config),
            config,
            model: tokio::sync::Mutex::new(model),
            snapshot_tx,
            update_tx,
            observers: Mutex::new(Vec::new()),
        }
    }

    pub fn address(&self) -> &DeviceAddress {
        self.connection.address()
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Exclusive access to the model for one cycle or command
    pub async fn lock(&self) -> MutexGuard<'_, StateModel> {
        self.model.lock().await
    }

    pub fn snapshot(&self) -> DeviceState {
        self.snapshot_tx.borrow().clone()
    }

    pub fn add_observer(&self, observer: StateObserver) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    pub fn subscribe(&self) -> StateReceiver {
        StateReceiver::new(self.update_tx.subscribe())
    }

    /// Notify observers and subscribers if the model changed since the last
    /// publish
    pub fn publish(&self, model: &mut StateModel) {
        if !model.take_dirty() {
            return;
        }

        let current = model.state().clone();
        let previous = self.snapshot_tx.send_replace(current.clone());
        tracing::debug!("State of {} is now {:?}", self.address(), current);

        let observers: Vec<StateObserver> = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in observers {
            observer(&current);
        }

        // No subscribers is fine
        let _ = self.update_tx.send(StateUpdate { previous, current });
    }

    /// Fire-and-forget command
    pub async fn send(&self, command: &str) -> Result<()> {
        self.connection.send(command).await.inspect_err(|e| {
            tracing::error!("Failed to send {} to {}: {}", command, self.address(), e);
        })
    }

    /// Command whose reply must carry the acknowledgment marker
    pub async fn send_acknowledged(&self, command: Command) -> Result<ParsedResponse> {
        let wire = command.to_wire();
        let response = self.connection.request(&wire).await.inspect_err(|e| {
            tracing::error!("Failed to send {} to {}: {}", wire, self.address(), e);
        })?;

        if !response.is_ack() {
            tracing::error!("{} was not acknowledged: {:?}", wire, response.raw());
            return Err(OppoError::MalformedResponse(response.raw().to_string()));
        }
        Ok(response)
    }

    /// Raw power query; the poller interprets every outcome itself
    pub async fn query_power(&self) -> Result<ParsedResponse> {
        self.connection.request(Query::Power.code()).await
    }

    /// Run one follow-up query and fold its answer into the model
    ///
    /// Only a connection-level failure is returned. A timeout, a reply
    /// without acknowledgment or a payload of the wrong shape keeps the
    /// previous value of the field and yields `Ok(false)`.
    async fn refresh<F>(&self, model: &mut StateModel, query: Query, apply: F) -> Result<bool>
    where
        F: FnOnce(&mut StateModel, &ParsedResponse) -> Result<()>,
    {
        let code = query.code();
        let response = match self.connection.request(code).await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                tracing::debug!("{} timed out ({}), keeping previous value", code, e);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        if !response.is_ack() {
            tracing::debug!("No valid reply to {}: {:?}, skipping update", code, response.raw());
            return Ok(false);
        }

        match apply(model, &response) {
            Ok(()) => Ok(true),
            Err(e) => {
                tracing::warn!("Skipping {} update: {}", code, e);
                Ok(false)
            }
        }
    }

    pub async fn refresh_volume(&self, model: &mut StateModel) -> Result<bool> {
        self.refresh(model, Query::Volume, |model, response| {
            model.apply_volume(response.volume()?);
            Ok(())
        })
        .await
    }

    pub async fn refresh_source(&self, model: &mut StateModel) -> Result<bool> {
        self.refresh(model, Query::Source, |model, response| {
            model.set_source(response.source()?);
            Ok(())
        })
        .await
    }

    pub async fn refresh_play_status(&self, model: &mut StateModel) -> Result<bool> {
        self.refresh(model, Query::PlayStatus, |model, response| {
            if let Some(transport) = response.play_status()? {
                model.set_transport(transport);
            }
            Ok(())
        })
        .await
    }

    pub async fn refresh_metadata(&self, model: &mut StateModel, queries: &[Query]) -> Result<()> {
        for &query in queries {
            let Some(key) = query.metadata_key() else {
                continue;
            };
            self.refresh(model, query, |model, response| {
                model.set_metadata(key, response.metadata_value(query)?);
                Ok(())
            })
            .await?;
        }
        Ok(())
    }

    /// Bring every field current after a power-on edge
    ///
    /// The model only counts as synced once volume and source both
    /// resolved; otherwise the next poll cycle runs the cascade again.
    pub async fn cascade(&self, model: &mut StateModel) -> Result<()> {
        let volume = self.refresh_volume(model).await?;
        let source = self.refresh_source(model).await?;
        if self.config.extended_metadata {
            self.refresh_metadata(model, &Query::METADATA).await?;
        }

        if volume && source {
            model.mark_synced();
        } else {
            tracing::debug!("State of {} incomplete after power on, retrying next cycle", self.address());
            model.mark_incomplete();
        }
        Ok(())
    }
}
