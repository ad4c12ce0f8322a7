//! Inbound notification handling for the E2 manager.
//!
//! This crate provides the [`NotificationHandler`] contract, the bundled
//! handlers for setup outcomes, association loss, terminator restarts,
//! resets, load reports and configuration updates, the immutable
//! [`NotificationHandlerProvider`] table, and the [`NotificationManager`]
//! that dispatches received messages through per-node queues.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod configuration_update;
pub mod e2_term_init;
pub mod handler;
pub mod load_information;
pub mod lost_connection;
pub mod manager;
pub mod provider;
pub mod request;
pub mod setup_response;
pub mod x2_reset;

#[cfg(test)]
mod test_support;

// Re-export main types
pub use configuration_update::ConfigurationUpdateHandler;
pub use e2_term_init::E2TermInitHandler;
pub use handler::{HandlerError, NotificationHandler};
pub use load_information::EnbLoadInformationHandler;
pub use lost_connection::RanLostConnectionHandler;
pub use manager::{
    DispatchError, NotificationManager, DEFAULT_MAX_CONCURRENT_HANDLERS, DEFAULT_QUEUE_CAPACITY,
};
pub use provider::{HandlerDependencies, NotificationHandlerProvider};
pub use request::NotificationRequest;
pub use setup_response::SetupResponseHandler;
pub use x2_reset::{X2ResetRequestHandler, X2ResetResponseHandler};
