use crate::protocol::VolumeReading;
use crate::types::{metadata, DeviceState, Metadata, PowerState, Source};
use serde_json::Value;

/// Owned device state plus reconciliation bookkeeping
///
/// Every mutator touches only the fields its reading covers and reports
/// whether anything changed. Changes accumulate in a dirty flag that the
/// driver drains once per poll cycle or command, so a burst of updates
/// produces a single notification.
#[derive(Debug, Clone)]
pub(crate) struct StateModel {
    state: DeviceState,
    /// Cleared at start and by the fail-safe; the next power-on reading is
    /// then a rising edge even if the model never saw `Off`
    synced: bool,
    dirty: bool,
}

impl StateModel {
    pub fn new(extended_metadata: bool) -> Self {
        Self {
            state: DeviceState {
                extended_metadata: extended_metadata.then(Metadata::new),
                ..Default::default()
            },
            synced: false,
            dirty: false,
        }
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn power(&self) -> PowerState {
        self.state.power
    }

    pub fn muted(&self) -> bool {
        self.state.muted
    }

    /// Whether a power-on reading must run the full cascade
    pub fn needs_cascade(&self) -> bool {
        !self.synced || self.state.power == PowerState::Off
    }

    fn touch(&mut self, changed: bool) -> bool {
        self.dirty |= changed;
        changed
    }

    /// Drain the pending-notification flag
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Complete observation finished; always notifies
    pub fn mark_synced(&mut self) {
        self.synced = true;
        self.dirty = true;
    }

    /// A power-on cascade left a field unresolved; the next "on" reading
    /// runs it again
    pub fn mark_incomplete(&mut self) {
        self.synced = false;
    }

    /// Authoritative off reading; the first one after start or a fail-safe
    /// always notifies
    pub fn confirm_off(&mut self) -> bool {
        let changed = self.power_off();
        if !self.synced {
            self.mark_synced();
        }
        changed
    }

    /// Off: source and per-disc metadata are dropped
    pub fn power_off(&mut self) -> bool {
        let mut changed = self.state.power != PowerState::Off;
        self.state.power = PowerState::Off;

        if self.state.current_source.take().is_some() {
            changed = true;
        }

        if let Some(meta) = self.state.extended_metadata.as_mut() {
            let before = meta.len();
            meta.retain(|key, _| key == metadata::FIRMWARE_VERSION);
            changed |= meta.len() != before;
        }

        self.touch(changed)
    }

    /// Unreachable device: same as off, and the next "on" is a fresh edge
    pub fn fail_safe(&mut self) -> bool {
        self.synced = false;
        self.power_off()
    }

    /// Off → Idle; any on-state is left as it is
    pub fn power_on(&mut self) -> bool {
        let changed = self.state.power == PowerState::Off;
        if changed {
            self.state.power = PowerState::Idle;
        }
        self.touch(changed)
    }

    /// Playing / Paused / Idle; ignored while off
    pub fn set_transport(&mut self, transport: PowerState) -> bool {
        if transport == PowerState::Off {
            return self.power_off();
        }
        if self.state.power == PowerState::Off {
            return false;
        }

        let changed = self.state.power != transport;
        self.state.power = transport;
        self.touch(changed)
    }

    /// Mute and level are exclusive readings of the same volume line
    ///
    /// Volume is stored in whole percent, so the 0.01 normalized
    /// suppression threshold reduces to an equality check here.
    pub fn apply_volume(&mut self, reading: VolumeReading) -> bool {
        let changed = match reading {
            VolumeReading::Muted => {
                let changed = !self.state.muted;
                self.state.muted = true;
                changed
            }
            VolumeReading::Level(percent) => {
                let changed = self.state.volume_percent != percent || self.state.muted;
                self.state.volume_percent = percent;
                self.state.muted = false;
                changed
            }
        };
        self.touch(changed)
    }

    pub fn set_muted(&mut self, muted: bool) -> bool {
        let changed = self.state.muted != muted;
        self.state.muted = muted;
        self.touch(changed)
    }

    /// Ignored while off so the no-source-when-off invariant holds
    pub fn set_source(&mut self, source: Source) -> bool {
        if self.state.power == PowerState::Off {
            return false;
        }
        let changed = self.state.current_source != Some(source);
        self.state.current_source = Some(source);
        self.touch(changed)
    }

    /// No-op unless extended metadata is enabled
    pub fn set_metadata(&mut self, key: &str, value: Value) -> bool {
        let Some(meta) = self.state.extended_metadata.as_mut() else {
            return false;
        };
        let changed = meta.get(key) != Some(&value);
        if changed {
            meta.insert(key.to_string(), value);
        }
        self.touch(changed)
    }
}
