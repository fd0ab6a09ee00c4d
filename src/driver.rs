use crate::catalog::{self, Command, NavKey};
use crate::config::DriverConfig;
use crate::error::{OppoError, Result};
use crate::poller;
use crate::protocol::VolumeReading;
use crate::session::Session;
use crate::state::StateModel;
use crate::subscription::StateReceiver;
use crate::types::{DeviceAddress, DeviceState, PowerState, Source, VolumePercent};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Running poll task
struct Poller {
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

/// Driver for one Oppo UDP-20x player
///
/// The driver keeps a model of the player's state, refreshed by a background
/// poll task between [`start`](Self::start) and [`stop`](Self::stop), and
/// exposes one async method per remote-control operation. Every method
/// returns `Ok(())` only when the player took the command; on failure the
/// state is left untouched and the next poll cycle is the retry path.
///
/// # Example
///
/// ```no_run
/// use oppo_ipcontrol::{DeviceAddress, OppoDriver, Source};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let driver = OppoDriver::new(DeviceAddress::new("192.168.1.60"));
///     driver.on_state_change(|state| println!("{:?}", state));
///     driver.start()?;
///
///     driver.turn_on().await?;
///     driver.select_source(Source::HdmiIn).await?;
///     driver.set_volume(0.3).await?;
///
///     driver.stop().await;
///     Ok(())
/// }
/// ```
pub struct OppoDriver {
    session: Arc<Session>,
    poller: Mutex<Option<Poller>>,
}

impl OppoDriver {
    /// Create a driver with default timeouts and poll interval
    pub fn new(address: DeviceAddress) -> Self {
        Self::with_config(address, DriverConfig::default())
    }

    pub fn with_config(address: DeviceAddress, config: DriverConfig) -> Self {
        Self {
            session: Arc::new(Session::new(address, config)),
            poller: Mutex::new(None),
        }
    }

    /// Get the player address
    pub fn address(&self) -> &DeviceAddress {
        self.session.address()
    }

    pub fn config(&self) -> &DriverConfig {
        self.session.config()
    }

    /// Sources offered by [`select_source`](Self::select_source)
    pub fn source_list(&self) -> &'static [Source] {
        &Source::ALL
    }

    // ========== Lifecycle ==========

    /// Start the background poll task
    ///
    /// Must be called from within a Tokio runtime. The first cycle runs
    /// immediately and brings the state current if the player is on.
    pub fn start(&self) -> Result<()> {
        let mut poller = self.poller.lock().unwrap_or_else(PoisonError::into_inner);
        if poller.as_ref().is_some_and(|p| !p.handle.is_finished()) {
            return Err(OppoError::AlreadyRunning);
        }

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(poller::run(self.session.clone(), shutdown.clone()));
        *poller = Some(Poller { shutdown, handle });
        Ok(())
    }

    /// Stop the poll task and wait for it to finish its current cycle
    pub async fn stop(&self) {
        let poller = self
            .poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(poller) = poller {
            poller.shutdown.cancel();
            if let Err(e) = poller.handle.await {
                tracing::error!("Poll task for {} ended abnormally: {}", self.address(), e);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|p| !p.handle.is_finished())
    }

    /// Run one poll cycle now, independent of the background task
    pub async fn refresh(&self) {
        poller::run_cycle(&self.session).await;
    }

    // ========== State ==========

    /// Snapshot of the last published state
    pub fn current_state(&self) -> DeviceState {
        self.session.snapshot()
    }

    /// Register a callback invoked after every materially different state
    ///
    /// Callbacks run on the task that produced the change and must not
    /// block.
    pub fn on_state_change<F>(&self, callback: F)
    where
        F: Fn(&DeviceState) + Send + Sync + 'static,
    {
        self.session.add_observer(Arc::new(callback));
    }

    /// Subscribe to state updates as a stream of before/after pairs
    pub fn subscribe(&self) -> StateReceiver {
        self.session.subscribe()
    }

    /// Send a fire-and-forget command and apply `update` if it was written
    async fn dispatch<F>(&self, command: Command, update: F) -> Result<()>
    where
        F: FnOnce(&mut StateModel),
    {
        let mut model = self.session.lock().await;
        self.session.send(&command.to_wire()).await?;
        update(&mut model);
        self.session.publish(&mut model);
        Ok(())
    }

    // ========== Power ==========

    /// Power on, wait for the player to settle, then refresh volume and
    /// source
    pub async fn turn_on(&self) -> Result<()> {
        let mut model = self.session.lock().await;
        self.session.send(&Command::PowerOn.to_wire()).await?;

        model.power_on();
        self.session.publish(&mut model);
        tracing::debug!("{} turned on, waiting for it to settle", self.address());

        sleep(self.config().settle_delay).await;

        if let Err(e) = self.session.cascade(&mut model).await {
            tracing::warn!("State refresh after power on failed: {}", e);
        }
        self.session.publish(&mut model);
        Ok(())
    }

    /// Power off; the guard is held through the settle delay so a poll does
    /// not observe the player mid-transition
    pub async fn turn_off(&self) -> Result<()> {
        let mut model = self.session.lock().await;
        self.session.send(&Command::PowerOff.to_wire()).await?;

        model.power_off();
        self.session.publish(&mut model);
        tracing::debug!("{} turned off, waiting for it to settle", self.address());

        sleep(self.config().settle_delay).await;
        Ok(())
    }

    // ========== Transport ==========

    pub async fn play(&self) -> Result<()> {
        self.dispatch(Command::Play, |model| {
            model.set_transport(PowerState::Playing);
        })
        .await
    }

    pub async fn pause(&self) -> Result<()> {
        self.dispatch(Command::Pause, |model| {
            model.set_transport(PowerState::Paused);
        })
        .await
    }

    pub async fn stop_playback(&self) -> Result<()> {
        self.dispatch(Command::Stop, |model| {
            model.set_transport(PowerState::Idle);
        })
        .await
    }

    pub async fn next_track(&self) -> Result<()> {
        self.dispatch(Command::Next, |_| {}).await
    }

    pub async fn previous_track(&self) -> Result<()> {
        self.dispatch(Command::Previous, |_| {}).await
    }

    // ========== Volume ==========

    /// Set the volume from a 0.0-1.0 level
    ///
    /// The player echoes the level it applied; that value wins over the
    /// requested one.
    pub async fn set_volume(&self, level: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&level) {
            return Err(OppoError::InvalidVolume(level));
        }
        let percent = (level * 100.0).round() as VolumePercent;

        let mut model = self.session.lock().await;
        let response = self
            .session
            .send_acknowledged(Command::SetVolume(percent))
            .await?;

        let reading = response.volume().unwrap_or(VolumeReading::Level(percent));
        model.apply_volume(reading);
        tracing::debug!("Volume of {} set to {}%", self.address(), percent);

        self.session.publish(&mut model);
        Ok(())
    }

    pub async fn volume_up(&self) -> Result<()> {
        self.step_volume(Command::VolumeUp).await
    }

    pub async fn volume_down(&self) -> Result<()> {
        self.step_volume(Command::VolumeDown).await
    }

    /// The step reply normally carries the new level; if it does not, the
    /// level is queried
    async fn step_volume(&self, command: Command) -> Result<()> {
        let mut model = self.session.lock().await;
        let response = self.session.send_acknowledged(command).await?;

        match response.volume() {
            Ok(reading) => {
                model.apply_volume(reading);
            }
            Err(e) => {
                tracing::debug!("{} reply without level ({}), querying volume", command, e);
                if let Err(e) = self.session.refresh_volume(&mut model).await {
                    tracing::warn!("Volume refresh after {} failed: {}", command, e);
                }
            }
        }

        self.session.publish(&mut model);
        Ok(())
    }

    /// Mute or unmute
    ///
    /// The player only offers a toggle, so nothing is sent when the model
    /// already reports the requested state.
    pub async fn mute(&self, muted: bool) -> Result<()> {
        let mut model = self.session.lock().await;
        if model.muted() == muted {
            return Ok(());
        }

        let response = self.session.send_acknowledged(Command::ToggleMute).await?;
        let confirmed = response.mute().ok().flatten().unwrap_or(muted);
        model.set_muted(confirmed);

        self.session.publish(&mut model);
        Ok(())
    }

    // ========== Source ==========

    pub async fn select_source(&self, source: Source) -> Result<()> {
        let mut model = self.session.lock().await;
        self.session
            .send_acknowledged(Command::SelectSource(source))
            .await?;

        model.set_source(source);
        tracing::debug!("{} switched to {}", self.address(), source);

        self.session.publish(&mut model);
        Ok(())
    }

    /// Select a source by display name, e.g. `"HDMI In"`
    pub async fn select_source_by_name(&self, name: &str) -> Result<()> {
        let source = Source::from_name(name).ok_or_else(|| {
            tracing::error!("Unknown source: {}", name);
            OppoError::UnknownSource(name.to_string())
        })?;
        self.select_source(source).await
    }

    // ========== Navigation & passthrough ==========

    pub async fn navigate(&self, key: NavKey) -> Result<()> {
        self.dispatch(Command::Navigate(key), |_| {}).await
    }

    /// Forward a protocol command verbatim (the `#` prefix is optional)
    pub async fn send_raw(&self, command: &str) -> Result<()> {
        let command = catalog::normalize_raw(command)?;
        let _model = self.session.lock().await;
        self.session.send(&command).await?;
        tracing::debug!("Custom command {:?} sent", command);
        Ok(())
    }

    /// Send a named passthrough preset (`"up"`, `"enter"`, `"home"`, ...)
    pub async fn send_preset(&self, name: &str) -> Result<()> {
        let command = catalog::preset_command(name)?;
        self.dispatch(command, |_| {}).await
    }
}

impl Drop for OppoDriver {
    fn drop(&mut self) {
        if let Some(poller) = self
            .poller
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            poller.shutdown.cancel();
        }
    }
}
