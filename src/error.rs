//! Unified error types for the TogglePub firmware.
//!
//! `Error` covers what can stop the firmware: hardware setup and
//! configuration. Publish and session failures are transient and keep their
//! own types; the coordinator escalates them and the supervisor recovers.
//! Everything is `Copy` so it can cross task boundaries and be logged from
//! anywhere without allocation.

use core::fmt;

pub use crate::drivers::hw_init::HwInitError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Fatal and startup errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Peripheral or interrupt controller setup failed. Fatal.
    Init(HwInitError),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(e) => write!(f, "init: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<HwInitError> for Error {
    fn from(e: HwInitError) -> Self {
        Self::Init(e)
    }
}

// ---------------------------------------------------------------------------
// Publish errors
// ---------------------------------------------------------------------------

/// Why a single publish attempt failed. Transient by definition: the
/// coordinator reports it and moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    /// No broker session is currently established.
    NotConnected,
    /// The client stack rejected the publish (raw ESP error code).
    Rejected(i32),
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::Rejected(code) => write!(f, "rejected (0x{code:X})"),
        }
    }
}

impl core::error::Error for PublishError {}

// ---------------------------------------------------------------------------
// Session errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// The broker refused or dropped the connection (raw ESP error code).
    ConnectFailed(i32),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed(code) => write!(f, "broker connect failed (0x{code:X})"),
        }
    }
}

impl core::error::Error for SessionError {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
