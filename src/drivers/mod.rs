//! Button interrupt, hardware initialisation, and task placement.

pub mod button;
pub mod hw_init;
pub mod task_pin;
