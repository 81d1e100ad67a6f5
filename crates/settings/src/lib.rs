//! Auto-refresh settings: the canonical model, the storage areas that hold it,
//! and the store that loads, migrates, and saves it.
//!
//! - [`model`]: `Settings`, normalization, legacy migration, input validation
//! - [`area`]: storage area traits and the in-memory and JSON-file areas
//! - [`gateway`]: ordered fallback across areas
//! - [`store`]: `SettingsStore`, the per-context owner of current settings

pub mod area;
mod error;
pub mod gateway;
pub mod model;
pub mod store;

pub use area::{CallbackAdapter, CallbackArea, JsonFileArea, MemoryArea, StorageArea};
pub use error::{AreaError, Error, Op, Result};
pub use gateway::StorageGateway;
pub use model::{
    Settings, SettingsPatch, Snapshot, derive_settings, normalize, parse_interval_input,
};
pub use store::{Loaded, Saved, SettingsStore};
