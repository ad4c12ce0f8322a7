//! Handler contract and errors.

use crate::request::NotificationRequest;
use async_trait::async_trait;
use e2mgr_managers::ManagerError;
use e2mgr_session::TransportError;
use e2mgr_storage::StoreError;
use e2mgr_wire::WireError;
use thiserror::Error;

/// Handler errors. Logged by the notification manager, never propagated further.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Malformed payload, or a reply that could not be encoded
    #[error("codec error: {0}")]
    Decode(#[from] WireError),

    /// Topology store failure
    #[error("rnib error: {0}")]
    Store(#[from] StoreError),

    /// Manager failure
    #[error(transparent)]
    Manager(#[from] ManagerError),

    /// Reply could not be sent
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Handles one inbound message type
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    /// Handle a single notification
    async fn handle(&self, request: NotificationRequest) -> Result<(), HandlerError>;
}
