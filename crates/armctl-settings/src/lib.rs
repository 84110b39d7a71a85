//! armctl Settings Crate
//!
//! Handles application configuration and the sequence catalog file.

pub mod catalog;
pub mod config;
pub mod error;

pub use catalog::{load_catalog, save_catalog, CatalogFile};
pub use config::{Config, ConnectionSettings, ConnectionType, EventSettings, MotionSettings};
pub use error::{SettingsError, SettingsResult};
