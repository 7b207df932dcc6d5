//! Bounded inter-context queues.
//!
//! Two queues carry the whole publish path:
//!
//! ```text
//! ┌────────────┐ PublisherCommand ┌─────────────┐ SupervisorCommand ┌────────────┐
//! │ Button ISR │─────────────────▶│  Publisher  │──────────────────▶│ Supervisor │
//! │            │  depth 3, FIFO   │  (task)     │  depth 1, FIFO    │  (task)    │
//! └────────────┘  try, drop-full  └─────────────┘  blocking send    └────────────┘
//! ```
//!
//! - **`target_os = "espidf"`**: FreeRTOS queues via `esp_idf_hal`. A send
//!   from interrupt context reports whether it woke a higher-priority task.
//! - **other targets**: `embassy-sync` channels; blocking calls are driven
//!   by `futures_lite::future::block_on`.

#[cfg(not(target_os = "espidf"))]
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
#[cfg(not(target_os = "espidf"))]
use embassy_sync::channel::Channel;

use crate::app::commands::PublisherCommand;
use crate::app::events::SupervisorCommand;
use crate::config::{ESCALATION_QUEUE_DEPTH, INBOUND_QUEUE_DEPTH};

/// Interrupt → publisher command queue.
pub type CommandQueue = BoundedQueue<PublisherCommand, INBOUND_QUEUE_DEPTH>;

/// Publisher → supervisor escalation queue.
pub type EscalationQueue = BoundedQueue<SupervisorCommand, ESCALATION_QUEUE_DEPTH>;

/// Result of a non-blocking send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueue {
    /// The item is in the queue. `wake` is set when the send made a parked
    /// consumer runnable, i.e. a context switch should be requested on
    /// interrupt exit.
    Queued { wake: bool },
    /// The queue was full; the item was discarded and the queue is unchanged.
    Dropped,
}

/// Fixed-capacity FIFO usable from interrupt and task context.
pub struct BoundedQueue<T, const N: usize> {
    #[cfg(target_os = "espidf")]
    inner: esp_idf_hal::task::queue::Queue<T>,
    #[cfg(not(target_os = "espidf"))]
    inner: Channel<CriticalSectionRawMutex, T, N>,
}

impl<T, const N: usize> BoundedQueue<T, N>
where
    T: Copy + Send + Sync,
{
    pub fn new() -> Self {
        Self {
            #[cfg(target_os = "espidf")]
            inner: esp_idf_hal::task::queue::Queue::new(N),
            #[cfg(not(target_os = "espidf"))]
            inner: Channel::new(),
        }
    }

    /// Number of slots.
    pub const fn capacity(&self) -> usize {
        N
    }

    // ── Producer side ─────────────────────────────────────────

    /// Enqueue without ever blocking. Safe from interrupt context.
    #[cfg(target_os = "espidf")]
    pub fn try_send_from_isr(&self, item: T) -> Enqueue {
        match self.inner.send_back(item, esp_idf_hal::delay::NON_BLOCK) {
            Ok(wake) => Enqueue::Queued { wake },
            Err(_) => Enqueue::Dropped,
        }
    }

    /// Enqueue without ever blocking. Safe from interrupt context.
    #[cfg(not(target_os = "espidf"))]
    pub fn try_send_from_isr(&self, item: T) -> Enqueue {
        // A consumer can only be parked on an empty queue.
        let wake = self.inner.is_empty();
        match self.inner.try_send(item) {
            Ok(()) => Enqueue::Queued { wake },
            Err(_) => Enqueue::Dropped,
        }
    }

    /// Enqueue, waiting as long as it takes for a free slot. Task context only.
    #[cfg(target_os = "espidf")]
    pub fn send_blocking(&self, item: T) {
        // With an infinite timeout the send cannot time out; retry in case
        // the kernel returns early anyway.
        while self
            .inner
            .send_back(item, esp_idf_hal::delay::BLOCK)
            .is_err()
        {}
    }

    /// Enqueue, waiting as long as it takes for a free slot. Task context only.
    #[cfg(not(target_os = "espidf"))]
    pub fn send_blocking(&self, item: T) {
        futures_lite::future::block_on(self.inner.send(item));
    }

    // ── Consumer side ─────────────────────────────────────────

    /// Dequeue the oldest item, parking the calling task while empty.
    #[cfg(target_os = "espidf")]
    pub fn recv_blocking(&self) -> T {
        loop {
            if let Some((item, _)) = self.inner.recv_front(esp_idf_hal::delay::BLOCK) {
                return item;
            }
        }
    }

    /// Dequeue the oldest item, parking the calling task while empty.
    #[cfg(not(target_os = "espidf"))]
    pub fn recv_blocking(&self) -> T {
        futures_lite::future::block_on(self.inner.receive())
    }

    /// Dequeue the oldest item if there is one.
    #[cfg(target_os = "espidf")]
    pub fn try_recv(&self) -> Option<T> {
        self.inner
            .recv_front(esp_idf_hal::delay::NON_BLOCK)
            .map(|(item, _)| item)
    }

    /// Dequeue the oldest item if there is one.
    #[cfg(not(target_os = "espidf"))]
    pub fn try_recv(&self) -> Option<T> {
        self.inner.try_receive().ok()
    }

    // ── Introspection (host only) ─────────────────────────────

    #[cfg(not(target_os = "espidf"))]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }
}

impl<T, const N: usize> Default for BoundedQueue<T, N>
where
    T: Copy + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}
