//! SCTP association loss.

use crate::handler::{HandlerError, NotificationHandler};
use crate::request::NotificationRequest;
use async_trait::async_trait;
use e2mgr_managers::{RanReconnectionManager, RanStatusChangeManager, Trigger};
use e2mgr_session::E2Sessions;
use e2mgr_storage::ConnectionStatus;
use tracing::{debug, info};

/// Marks the node disconnected and starts reconnecting it
pub struct RanLostConnectionHandler {
    status: RanStatusChangeManager,
    sessions: E2Sessions,
    reconnection: RanReconnectionManager,
}

impl RanLostConnectionHandler {
    /// Create the handler
    pub fn new(
        status: RanStatusChangeManager,
        sessions: E2Sessions,
        reconnection: RanReconnectionManager,
    ) -> Self {
        Self {
            status,
            sessions,
            reconnection,
        }
    }
}

#[async_trait]
impl NotificationHandler for RanLostConnectionHandler {
    async fn handle(&self, request: NotificationRequest) -> Result<(), HandlerError> {
        let ran_name = &request.ran_name;
        let change = self.status.apply(ran_name, Trigger::LostConnection).await?;

        if change.current == ConnectionStatus::ShutDown {
            info!("ran {}: connection lost while shut down, not reconnecting", ran_name);
            return Ok(());
        }

        let dropped = self.sessions.delete_for_ran(ran_name);
        if dropped > 0 {
            debug!("ran {}: dropped {} pending sessions", ran_name, dropped);
        }

        let outcome = self.reconnection.reconnect_node(ran_name).await?;
        info!("ran {}: reconnection {:?}", ran_name, outcome);
        Ok(())
    }
}
