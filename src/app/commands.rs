//! Inbound commands to the publish coordinator.
//!
//! Posted by the button interrupt (or any other task) onto the inbound
//! command queue and consumed strictly in arrival order by the
//! [`PublishCoordinator`](super::service::PublishCoordinator).

/// Commands the coordinator task accepts.
///
/// `Copy` so it can travel through a FreeRTOS queue by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublisherCommand {
    /// (Re)acquire the button interrupt line.
    Init,

    /// Release the button interrupt line.
    Deinit,

    /// Publish the payload on the configured topic.
    Publish(&'static str),
}
