//! Last known on/off state of the remote device.
//!
//! Written by whoever handles the broker's echo of the toggle messages
//! (the subscribe side of the session) and read by the button interrupt to
//! pick the next payload. A single atomic bit, so the interrupt can read it
//! without a lock.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::config::{DEVICE_OFF_MESSAGE, DEVICE_ON_MESSAGE};

pub struct DeviceState {
    on: AtomicBool,
}

impl DeviceState {
    /// Devices start out off.
    pub const fn new() -> Self {
        Self {
            on: AtomicBool::new(false),
        }
    }

    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::Acquire)
    }

    pub fn set(&self, on: bool) {
        self.on.store(on, Ordering::Release);
    }

    /// Update the bit from a received toggle message.
    /// Returns `false` (and leaves the state alone) for anything else.
    pub fn apply_message(&self, payload: &[u8]) -> bool {
        if payload == DEVICE_ON_MESSAGE.as_bytes() {
            self.set(true);
            true
        } else if payload == DEVICE_OFF_MESSAGE.as_bytes() {
            self.set(false);
            true
        } else {
            false
        }
    }

    /// Payload that flips the device away from its current state.
    pub fn toggle_message(&self) -> &'static str {
        if self.is_on() {
            DEVICE_OFF_MESSAGE
        } else {
            DEVICE_ON_MESSAGE
        }
    }
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::new()
    }
}
