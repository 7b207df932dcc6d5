//! Publish coordinator: the hexagonal core of the publish path.
//!
//! [`PublishCoordinator`] consumes [`PublisherCommand`]s in arrival order and
//! turns each toggle into exactly one publish on the shared session. It never
//! retries: a failed publish becomes one [`SupervisorCommand`] for the
//! connection supervisor and the coordinator moves on.
//!
//! ```text
//!  CommandQueue ──▶ ┌──────────────────────┐ ──▶ EscalationQueue
//!                   │  PublishCoordinator  │
//!  InterruptLine ◀──│  Idle ⇄ Publishing   │──▶ SessionPort
//!                   └──────────────────────┘
//! ```

use heapless::String;
use log::{debug, error, info, warn};

use crate::config::PublisherConfig;
use crate::error::{Error, Result};
use crate::queue::{CommandQueue, EscalationQueue};

use super::commands::PublisherCommand;
use super::events::SupervisorCommand;
use super::ports::{InterruptLinePort, SessionPort};
use super::publish::{PublishRecord, QoS};

/// Where the coordinator is in its (trivial) state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    /// A publish call is in flight. Only observable from inside the session.
    Publishing,
}

// ───────────────────────────────────────────────────────────────
// PublishCoordinator
// ───────────────────────────────────────────────────────────────

pub struct PublishCoordinator<S, L> {
    session: S,
    line: L,
    topic: String<128>,
    qos: QoS,
    state: CoordinatorState,
    published: u32,
    failed: u32,
}

impl<S, L> PublishCoordinator<S, L>
where
    S: SessionPort,
    L: InterruptLinePort,
{
    /// Topic and QoS are fixed for the coordinator's lifetime.
    pub fn new(session: S, line: L, config: &PublisherConfig) -> Result<Self> {
        Ok(Self {
            session,
            line,
            topic: config.publish_topic.clone(),
            qos: config.qos_level()?,
            state: CoordinatorState::Idle,
            published: 0,
            failed: 0,
        })
    }

    // ── State machine ─────────────────────────────────────────

    /// Handle one command. Returns the escalation to forward, if any.
    ///
    /// `Err` only when the interrupt line cannot be armed, which is fatal.
    pub fn handle(&mut self, cmd: PublisherCommand) -> Result<Option<SupervisorCommand>> {
        match cmd {
            PublisherCommand::Init => {
                self.line.enable()?;
                info!("publisher: button line armed");
                Ok(None)
            }
            PublisherCommand::Deinit => {
                self.line.disable();
                info!("publisher: button line released");
                Ok(None)
            }
            PublisherCommand::Publish(payload) => Ok(self.publish(payload)),
        }
    }

    fn publish(&mut self, payload: &'static str) -> Option<SupervisorCommand> {
        self.state = CoordinatorState::Publishing;
        let record = PublishRecord::new(&self.topic, payload.as_bytes(), self.qos);
        info!(
            "publisher: '{}' -> {} (qos {})",
            payload,
            record.topic,
            record.qos.as_u8()
        );
        let outcome = self.session.publish(&record);
        self.state = CoordinatorState::Idle;

        match outcome {
            Ok(()) => {
                self.published = self.published.wrapping_add(1);
                None
            }
            Err(e) => {
                self.failed = self.failed.wrapping_add(1);
                error!("publisher: publish of '{}' failed: {}", payload, e);
                Some(SupervisorCommand::HandlePublishFailure)
            }
        }
    }

    // ── Task loop ─────────────────────────────────────────────

    /// Wait for the next command, handle it and forward any escalation.
    ///
    /// The escalation send blocks until the supervisor has room: an
    /// escalation is never dropped, at the cost of stalling this task.
    pub fn step(&mut self, inbound: &CommandQueue, escalation: &EscalationQueue) -> Result<()> {
        let cmd = inbound.recv_blocking();
        debug!("publisher: {:?}", cmd);
        if let Some(esc) = self.handle(cmd)? {
            escalation.send_blocking(esc);
            warn!("publisher: escalated {:?}", esc);
        }
        Ok(())
    }

    /// Arm the line and serve the inbound queue until a fatal error, which
    /// is returned for the caller to halt on.
    pub fn run(mut self, inbound: &CommandQueue, escalation: &EscalationQueue) -> Error {
        info!("publisher: started (topic {}, qos {})", self.topic, self.qos.as_u8());
        if let Err(e) = self.handle(PublisherCommand::Init) {
            return e;
        }
        loop {
            if let Err(e) = self.step(inbound, escalation) {
                return e;
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn published(&self) -> u32 {
        self.published
    }

    pub fn failed(&self) -> u32 {
        self.failed
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
