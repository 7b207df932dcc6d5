//! ISR-debounced user button that posts toggle commands.
//!
//! ## Hardware
//!
//! Two active-low momentary switches share one GPIO interrupt line. The
//! line fires on both edges of the primary button. Every invocation first
//! acknowledges the whole line (both buttons), otherwise the sibling's
//! status bit re-triggers the interrupt the moment it returns.
//!
//! ## Debounce
//!
//! | Event                       | Idle                | Debouncing since `t0`      | Holdoff since `t1`                |
//! |-----------------------------|---------------------|----------------------------|-----------------------------------|
//! | press edge at `t`           | start window at `t` | emit if `t - t0 >= window` | start window at `t` once expired  |
//! | release / evaluation at `t` | nothing             | emit if `t - t0 >= window` | idle once expired                 |
//!
//! Emitting enters a holdoff of one window measured from the accepted edge.
//! Edges inside it belong to the press just accepted and are absorbed, so
//! the bounces of a press that closed a stale window cannot open a second
//! one. A bouncing press yields at most one toggle per window and the first
//! edge is the one that starts the clock.
//!
//! ## Ownership
//!
//! The [`EdgeDetector`] lives inside [`ButtonIsr`], and the `ButtonIsr` is
//! moved into the interrupt handler when it is installed. Nothing else can
//! reach the debounce state, so it needs no lock.

use crate::app::commands::PublisherCommand;
use crate::app::device_state::DeviceState;
use crate::app::ports::Clock;
use crate::queue::{CommandQueue, Enqueue};

/// Debounce window used when the configuration does not override it.
pub const DEFAULT_DEBOUNCE_MS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebounceState {
    Idle,
    Debouncing { since_ms: u32 },
    Holdoff { since_ms: u32 },
}

/// Turns a burst of raw edges into at most one accepted press per window.
#[derive(Debug)]
pub struct EdgeDetector {
    window_ms: u32,
    state: DebounceState,
}

impl EdgeDetector {
    pub const fn new(window_ms: u32) -> Self {
        Self {
            window_ms,
            state: DebounceState::Idle,
        }
    }

    /// A press edge at `now_ms`. Returns `true` when a press is accepted.
    pub fn on_edge(&mut self, now_ms: u32) -> bool {
        match self.state {
            DebounceState::Debouncing { since_ms } => self.close(since_ms, now_ms),
            DebounceState::Holdoff { since_ms } if !self.expired(since_ms, now_ms) => false,
            DebounceState::Idle | DebounceState::Holdoff { .. } => {
                self.state = DebounceState::Debouncing { since_ms: now_ms };
                false
            }
        }
    }

    /// An evaluation at `now_ms` without a new press edge. Never opens a
    /// window; only closes one that has run its course.
    pub fn settle(&mut self, now_ms: u32) -> bool {
        match self.state {
            DebounceState::Debouncing { since_ms } => self.close(since_ms, now_ms),
            DebounceState::Holdoff { since_ms } => {
                if self.expired(since_ms, now_ms) {
                    self.state = DebounceState::Idle;
                }
                false
            }
            DebounceState::Idle => false,
        }
    }

    fn close(&mut self, since_ms: u32, now_ms: u32) -> bool {
        if self.expired(since_ms, now_ms) {
            self.state = DebounceState::Holdoff { since_ms: now_ms };
            true
        } else {
            false
        }
    }

    fn expired(&self, since_ms: u32, now_ms: u32) -> bool {
        now_ms.wrapping_sub(since_ms) >= self.window_ms
    }

    pub fn is_debouncing(&self) -> bool {
        matches!(self.state, DebounceState::Debouncing { .. })
    }
}

/// Interrupt-side view of the shared button line.
pub trait SharedIrqLine {
    /// Clear the pending status of every button on the line. Returns whether
    /// the primary button's bit was among them.
    fn acknowledge(&mut self) -> bool;

    /// Physical level of the primary button, `true` while held down.
    fn is_pressed(&self) -> bool;
}

/// Requests a context switch on interrupt exit.
pub trait YieldHook {
    fn yield_from_isr(&mut self);
}

/// What a single interrupt invocation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsrOutcome {
    /// The primary button's status bit was not set.
    Spurious,
    /// The edge was absorbed by the debounce window.
    Absorbed,
    /// A toggle was queued.
    Posted { wake: bool },
    /// A toggle was accepted but the command queue was full.
    Dropped,
}

/// The button interrupt handler: shared-line acknowledge, debounce, post.
pub struct ButtonIsr<'a, L, C, Y> {
    line: L,
    clock: C,
    yield_hook: Y,
    detector: EdgeDetector,
    device: &'a DeviceState,
    queue: &'a CommandQueue,
}

impl<'a, L, C, Y> ButtonIsr<'a, L, C, Y>
where
    L: SharedIrqLine,
    C: Clock,
    Y: YieldHook,
{
    pub fn new(
        line: L,
        clock: C,
        yield_hook: Y,
        debounce_ms: u32,
        device: &'a DeviceState,
        queue: &'a CommandQueue,
    ) -> Self {
        Self {
            line,
            clock,
            yield_hook,
            detector: EdgeDetector::new(debounce_ms),
            device,
            queue,
        }
    }

    /// Body of the interrupt. Never blocks and never logs.
    pub fn on_interrupt(&mut self) -> IsrOutcome {
        if !self.line.acknowledge() {
            return IsrOutcome::Spurious;
        }

        let now_ms = self.clock.now_ms();
        let accepted = if self.line.is_pressed() {
            self.detector.on_edge(now_ms)
        } else {
            self.detector.settle(now_ms)
        };
        if !accepted {
            return IsrOutcome::Absorbed;
        }

        let cmd = PublisherCommand::Publish(self.device.toggle_message());
        match self.queue.try_send_from_isr(cmd) {
            Enqueue::Queued { wake } => {
                if wake {
                    self.yield_hook.yield_from_isr();
                }
                IsrOutcome::Posted { wake }
            }
            // A lost toggle is recovered by pressing again.
            Enqueue::Dropped => IsrOutcome::Dropped,
        }
    }
}
