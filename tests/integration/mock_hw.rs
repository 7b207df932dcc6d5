//! Mock hardware for integration tests.
//!
//! A hand-driven clock, a yield hook that counts context-switch requests,
//! and a delay that records instead of sleeping. Together with the library's
//! `SimButtonLine` and `SimSession` they let a test play interrupt
//! controller, scheduler and broker at once.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use embedded_hal::delay::DelayNs;
use togglepub::adapters::session::{SharedSession, SimSession};
use togglepub::app::device_state::DeviceState;
use togglepub::drivers::button::{ButtonIsr, YieldHook};
use togglepub::drivers::hw_init::SimButtonLine;
use togglepub::queue::CommandQueue;

// ── ManualClock ───────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct ManualClock(Arc<AtomicU32>);

#[allow(dead_code)]
impl ManualClock {
    pub fn set(&self, ms: u32) {
        self.0.store(ms, Ordering::Release);
    }

    pub fn advance(&self, ms: u32) {
        self.0.fetch_add(ms, Ordering::AcqRel);
    }
}

impl togglepub::app::ports::Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }
}

// ── CountingYield ─────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct CountingYield(Arc<AtomicU32>);

#[allow(dead_code)]
impl CountingYield {
    pub fn count(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }
}

impl YieldHook for CountingYield {
    fn yield_from_isr(&mut self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }
}

// ── RecordingDelay ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingDelay {
    pub waited_ms: u64,
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.waited_ms += u64::from(ns) / 1_000_000;
    }
}

// ── Bench ─────────────────────────────────────────────────────

pub type BenchIsr = ButtonIsr<'static, SimButtonLine, ManualClock, CountingYield>;

/// Everything one end-to-end test needs, with `'static` queues and device
/// state so tasks can run on their own threads.
pub struct Bench {
    pub device: &'static DeviceState,
    pub inbound: &'static CommandQueue,
    pub escalation: &'static togglepub::queue::EscalationQueue,
    pub line: SimButtonLine,
    pub clock: ManualClock,
    pub yields: CountingYield,
    pub session: SharedSession<SimSession>,
}

#[allow(dead_code)]
impl Bench {
    pub fn new() -> Self {
        let device: &'static DeviceState = Box::leak(Box::new(DeviceState::new()));
        Self {
            device,
            inbound: Box::leak(Box::new(CommandQueue::new())),
            escalation: Box::leak(Box::new(togglepub::queue::EscalationQueue::new())),
            line: SimButtonLine::new(),
            clock: ManualClock::default(),
            yields: CountingYield::default(),
            session: SharedSession::new(SimSession::new().with_echo(device)),
        }
    }

    pub fn isr(&self, debounce_ms: u32) -> BenchIsr {
        ButtonIsr::new(
            self.line.clone(),
            self.clock.clone(),
            self.yields.clone(),
            debounce_ms,
            self.device,
            self.inbound,
        )
    }

    /// Drive one edge at `at_ms`, running the handler if the line fires.
    pub fn edge(&self, isr: &mut BenchIsr, at_ms: u32, pressed: bool) {
        self.clock.set(at_ms);
        if self.line.drive(pressed) {
            isr.on_interrupt();
        }
    }

    /// A clean press at `at_ms`, released `hold_ms` later.
    pub fn press(&self, isr: &mut BenchIsr, at_ms: u32, hold_ms: u32) {
        self.edge(isr, at_ms, true);
        self.edge(isr, at_ms + hold_ms, false);
    }
}
