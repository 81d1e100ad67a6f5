//! Settings store: the single owner of the current settings in a context.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    Result,
    gateway::StorageGateway,
    model::{LOAD_KEYS, SETTINGS_KEY, Settings, SettingsPatch, Snapshot, derive_settings},
};

/// Outcome of [`SettingsStore::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Loaded {
    /// Effective settings.
    pub settings: Settings,
    /// True when no canonical record existed and one was derived.
    pub migrated: bool,
}

/// Outcome of [`SettingsStore::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Saved {
    /// Settings now in effect.
    pub settings: Settings,
    /// False when the change was a no-op and nothing was written.
    pub written: bool,
}

/// Loads, migrates, and saves settings through a [`StorageGateway`].
pub struct SettingsStore {
    /// Storage access.
    gateway: StorageGateway,
    /// Last known-good settings.
    current: Settings,
}

/// Storage items holding `settings` under the canonical key.
fn canonical_record(settings: &Settings) -> Snapshot {
    let mut items = Snapshot::new();
    items.insert(SETTINGS_KEY.to_string(), settings.to_value());
    items
}

impl SettingsStore {
    /// Create a store; current settings start at the defaults.
    pub fn new(gateway: StorageGateway) -> Self {
        Self {
            gateway,
            current: Settings::default(),
        }
    }

    /// Last known-good settings.
    pub fn current(&self) -> Settings {
        self.current
    }

    /// Read settings, migrating legacy keys and writing back a canonical
    /// record when none exists. A failed write-back is logged only.
    ///
    /// A failed read leaves the current settings untouched and returns the
    /// error; callers fall back to [`Self::current`].
    pub async fn load(&mut self) -> Result<Loaded> {
        let data = self.gateway.get(&LOAD_KEYS).await?;
        let snapshot = (!data.is_empty()).then_some(&data);
        let derived = derive_settings(snapshot);

        if derived.needs_persist {
            match self.gateway.set(canonical_record(&derived.settings)).await {
                Ok(()) => info!(
                    enabled = derived.settings.enabled(),
                    interval = derived.settings.interval_seconds(),
                    "settings record created"
                ),
                Err(e) => warn!(error = %e, "could not persist derived settings"),
            }
        }

        self.current = derived.settings;
        Ok(Loaded {
            settings: derived.settings,
            migrated: derived.needs_persist,
        })
    }

    /// Merge `patch` over the current settings and persist the result if it
    /// differs. Current settings only change after a successful write.
    pub async fn save(&mut self, patch: SettingsPatch) -> Result<Saved> {
        let next = self.current.merged(&patch);
        if next == self.current {
            debug!("settings unchanged, skipping write");
            return Ok(Saved {
                settings: next,
                written: false,
            });
        }
        self.gateway.set(canonical_record(&next)).await?;
        self.current = next;
        Ok(Saved {
            settings: next,
            written: true,
        })
    }

    /// Raw canonical record as currently stored, for diagnostics.
    pub async fn stored_record(&self) -> Result<Option<Value>> {
        let mut data = self.gateway.get(&[SETTINGS_KEY]).await?;
        Ok(data.remove(SETTINGS_KEY))
    }
}
