//! Connection supervisor: the consumer side of the escalation queue.
//!
//! Decides what a failed publish means for the broker session. A failure on
//! a session that still reports connected is only logged; a dropped session
//! is re-established with a fixed-interval retry budget. The lost toggle is
//! never republished.

use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

use crate::config::PublisherConfig;
use crate::queue::EscalationQueue;

use super::events::SupervisorCommand;
use super::ports::ConnectionPort;

/// How one escalation was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// The session was up; the failure was broker-side or transient.
    StillConnected,
    /// The session was re-established after `attempts` tries.
    Recovered { attempts: u16 },
    /// The retry budget ran out with the session still down.
    GaveUp,
}

pub struct ConnectionSupervisor<C, D> {
    conn: C,
    delay: D,
    max_retries: u16,
    retry_interval_ms: u32,
    escalations: u32,
}

impl<C, D> ConnectionSupervisor<C, D>
where
    C: ConnectionPort,
    D: DelayNs,
{
    pub fn new(conn: C, delay: D, config: &PublisherConfig) -> Self {
        Self {
            conn,
            delay,
            max_retries: config.max_conn_retries,
            retry_interval_ms: config.conn_retry_interval_ms,
            escalations: 0,
        }
    }

    pub fn handle(&mut self, cmd: SupervisorCommand) -> RecoveryOutcome {
        self.escalations = self.escalations.wrapping_add(1);
        match cmd {
            SupervisorCommand::HandlePublishFailure => self.recover(),
        }
    }

    fn recover(&mut self) -> RecoveryOutcome {
        if self.conn.is_connected() {
            warn!("supervisor: publish failed on a live session");
            return RecoveryOutcome::StillConnected;
        }

        for attempt in 1..=self.max_retries {
            match self.conn.reconnect() {
                Ok(()) => {
                    info!("supervisor: session restored after {} attempt(s)", attempt);
                    return RecoveryOutcome::Recovered { attempts: attempt };
                }
                Err(e) => {
                    warn!("supervisor: reconnect {}/{} failed: {}", attempt, self.max_retries, e);
                    if attempt < self.max_retries {
                        self.delay.delay_ms(self.retry_interval_ms);
                    }
                }
            }
        }

        error!("supervisor: giving up after {} reconnect attempts", self.max_retries);
        RecoveryOutcome::GaveUp
    }

    /// Wait for the next escalation and resolve it.
    pub fn step(&mut self, escalation: &EscalationQueue) -> RecoveryOutcome {
        let cmd = escalation.recv_blocking();
        self.handle(cmd)
    }

    pub fn run(mut self, escalation: &EscalationQueue) -> ! {
        info!(
            "supervisor: started ({} retries, {} ms apart)",
            self.max_retries, self.retry_interval_ms
        );
        loop {
            self.step(escalation);
        }
    }

    /// Escalations handled so far.
    pub fn escalations(&self) -> u32 {
        self.escalations
    }
}
