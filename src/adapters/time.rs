//! Monotonic time and blocking delays.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic, safe
//!   to read from interrupt context). Delays come from
//!   `esp_idf_hal::delay::FreeRtos`.
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` and
//!   [`StdDelay`] for host-side testing and simulation.

use crate::app::ports::Clock;

/// Millisecond tick counter since construction (host) or boot (ESP).
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    #[cfg(target_os = "espidf")]
    fn now_ms(&self) -> u32 {
        // Truncation is the wrap.
        ((unsafe { esp_idf_svc::sys::esp_timer_get_time() }) / 1_000) as u32
    }

    #[cfg(not(target_os = "espidf"))]
    fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

/// `DelayNs` on top of `std::thread::sleep`, for the supervisor's retry
/// pauses on the host.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

#[cfg(not(target_os = "espidf"))]
impl embedded_hal::delay::DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(ns.into()));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(ms.into()));
    }
}
