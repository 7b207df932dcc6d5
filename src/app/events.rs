//! Escalations from the publish path to the connection supervisor.
//!
//! The coordinator only reports that something failed; what to do about it
//! (reconnect, back off, give up) is the supervisor's business. That is why
//! the event carries no payload.

/// Commands the connection supervisor accepts on the escalation queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorCommand {
    /// A publish failed; treat the session as degraded.
    HandlePublishFailure,
}
