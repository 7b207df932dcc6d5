//! TogglePub firmware library.
//!
//! A user button on an ESP32-S3 publishes "TURN ON" / "TURN OFF" toggles to
//! an MQTT broker. Exposes the pure-logic modules for integration testing;
//! all ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod pins;
pub mod queue;

pub use error::{Error, Result};
