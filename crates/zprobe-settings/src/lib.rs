//! zprobe Settings Crate
//!
//! Loads, validates and saves the survey configuration.

pub mod config;
pub mod error;

pub use config::{Config, ConnectionSettings, OutputSettings, StreamingSettings};
pub use error::{ConfigError, SettingsError, SettingsResult};
