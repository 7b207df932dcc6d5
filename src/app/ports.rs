//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ PublishCoordinator / ConnectionSupervisor
//! ```
//!
//! Driven adapters (MQTT session, button interrupt control, clock) implement
//! these traits. The domain consumes them via generics, so the publish path
//! never touches ESP-IDF directly and runs unchanged against mocks.

use crate::app::publish::PublishRecord;
use crate::error::{PublishError, SessionError};
use crate::drivers::hw_init::HwInitError;

// ───────────────────────────────────────────────────────────────
// Session port (driven adapter: domain → broker)
// ───────────────────────────────────────────────────────────────

/// An already-connected publish handle owned by the connection layer.
///
/// The call may block on network I/O; from the coordinator's point of view
/// it is opaque.
pub trait SessionPort {
    fn publish(&mut self, record: &PublishRecord<'_>) -> Result<(), PublishError>;
}

// ───────────────────────────────────────────────────────────────
// Connection port (driven adapter: supervisor → broker session)
// ───────────────────────────────────────────────────────────────

/// Session lifecycle as seen by the connection supervisor.
pub trait ConnectionPort {
    /// Whether the broker session is currently up.
    fn is_connected(&self) -> bool;

    /// Tear down and re-establish the broker session.
    fn reconnect(&mut self) -> Result<(), SessionError>;
}

// ───────────────────────────────────────────────────────────────
// Interrupt line control (driven adapter: coordinator → GPIO/IRQ)
// ───────────────────────────────────────────────────────────────

/// Task-side control over the button interrupt.
///
/// This only arms and disarms the interrupt; it never touches the debounce
/// state, which belongs to the interrupt handler alone.
pub trait InterruptLinePort {
    /// Clear stale pending status on every button of the line and enable the
    /// interrupt. Failure is fatal for the caller.
    fn enable(&mut self) -> Result<(), HwInitError>;

    /// Disable the interrupt.
    fn disable(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Monotonic clock
// ───────────────────────────────────────────────────────────────

/// Millisecond tick counter. Must be callable from interrupt context.
pub trait Clock {
    /// Milliseconds since boot, wrapping at `u32::MAX`.
    fn now_ms(&self) -> u32;
}
