//! # ferry-settings
//!
//! Typed, immutable conversion settings with file loading and env overrides.
//!
//! Every session captures a [`FerrySettings`] snapshot at start time and
//! never mutates it mid-run; resuming reuses the original snapshot unless a
//! caller explicitly overrides it. Validation happens once, at session
//! creation, not per chunk.

#![deny(unsafe_code)]

mod errors;
mod loader;
mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::{
    AiSettings, AiStrategy, BackupSettings, ConversionSettings, CostSettings, DeliverySettings,
    FerrySettings, PerformanceSettings,
};
