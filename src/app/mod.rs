//! Application core: pure domain logic, zero I/O.
//!
//! The publish path of the TogglePub firmware: the command and escalation
//! vocabulary, the publish coordinator, and the connection supervisor that
//! consumes its escalations. All interaction with hardware and the broker
//! happens through **port traits** defined in [`ports`], keeping this layer
//! fully testable without real peripherals.

pub mod commands;
pub mod device_state;
pub mod events;
pub mod ports;
pub mod publish;
pub mod service;
pub mod supervisor;
