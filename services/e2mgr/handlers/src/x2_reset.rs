//! X2 reset request and response.

use crate::handler::{HandlerError, NotificationHandler};
use crate::request::NotificationRequest;
use async_trait::async_trait;
use e2mgr_session::RmrSender;
use e2mgr_storage::{ConnectionStatus, RnibDataService};
use e2mgr_wire::{MBuf, ProtocolCodec, ResetResponse, RIC_X2_RESET_RESP};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Answers a RAN initiated reset while the node is connected
pub struct X2ResetRequestHandler {
    rnib: RnibDataService,
    codec: Arc<dyn ProtocolCodec>,
    sender: RmrSender,
}

impl X2ResetRequestHandler {
    /// Create the handler
    pub fn new(rnib: RnibDataService, codec: Arc<dyn ProtocolCodec>, sender: RmrSender) -> Self {
        Self { rnib, codec, sender }
    }
}

#[async_trait]
impl NotificationHandler for X2ResetRequestHandler {
    async fn handle(&self, request: NotificationRequest) -> Result<(), HandlerError> {
        let node = self.rnib.get_node(&request.ran_name).await?;
        if node.connection_status != ConnectionStatus::Connected {
            warn!(
                "ran {}: reset request ignored in status {}",
                request.ran_name, node.connection_status
            );
            return Ok(());
        }

        let payload = self.codec.encode_reset_response(&ResetResponse::default())?;
        self.sender
            .send(MBuf::new(
                RIC_X2_RESET_RESP,
                request.ran_name,
                payload,
                request.transaction_id,
            ))
            .await?;
        Ok(())
    }
}

/// Logs the RAN's answer to a reset
pub struct X2ResetResponseHandler {
    rnib: RnibDataService,
    codec: Arc<dyn ProtocolCodec>,
}

impl X2ResetResponseHandler {
    /// Create the handler
    pub fn new(rnib: RnibDataService, codec: Arc<dyn ProtocolCodec>) -> Self {
        Self { rnib, codec }
    }
}

#[async_trait]
impl NotificationHandler for X2ResetResponseHandler {
    async fn handle(&self, request: NotificationRequest) -> Result<(), HandlerError> {
        info!(
            "ran {}: reset response ({} bytes)",
            request.ran_name,
            request.payload.len()
        );
        let node = self.rnib.get_node(&request.ran_name).await?;
        let response = self.codec.decode_reset_response(&request.payload)?;
        debug!(
            "ran {}: reset response in status {}, diagnostics {:?}, {:?} after receipt",
            request.ran_name,
            node.connection_status,
            response.criticality_diagnostics,
            request.received_at.elapsed()
        );
        Ok(())
    }
}
