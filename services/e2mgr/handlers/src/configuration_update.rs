//! ENB / ENDC configuration update acknowledgement.

use crate::handler::{HandlerError, NotificationHandler};
use crate::request::NotificationRequest;
use async_trait::async_trait;
use e2mgr_session::RmrSender;
use e2mgr_wire::{
    message_type_name, ConfigurationUpdateAck, ConfigurationUpdateFailure, FailureCause, MBuf,
    ProtocolCodec, RIC_ENB_CONF_UPDATE_ACK, RIC_ENB_CONF_UPDATE_FAILURE, RIC_ENDC_CONF_UPDATE_ACK,
    RIC_ENDC_CONF_UPDATE_FAILURE,
};
use std::sync::Arc;
use tracing::{debug, error, info};

const UNDECODABLE_CAUSE: &str = "abstract syntax error (reject)";

/// Acknowledges a configuration update, or rejects one that does not decode
pub struct ConfigurationUpdateHandler {
    codec: Arc<dyn ProtocolCodec>,
    sender: RmrSender,
    ack_type: i32,
    failure_type: i32,
}

impl ConfigurationUpdateHandler {
    /// Handler for RIC_ENB_CONF_UPDATE
    pub fn enb(codec: Arc<dyn ProtocolCodec>, sender: RmrSender) -> Self {
        Self {
            codec,
            sender,
            ack_type: RIC_ENB_CONF_UPDATE_ACK,
            failure_type: RIC_ENB_CONF_UPDATE_FAILURE,
        }
    }

    /// Handler for RIC_ENDC_CONF_UPDATE
    pub fn endc(codec: Arc<dyn ProtocolCodec>, sender: RmrSender) -> Self {
        Self {
            codec,
            sender,
            ack_type: RIC_ENDC_CONF_UPDATE_ACK,
            failure_type: RIC_ENDC_CONF_UPDATE_FAILURE,
        }
    }
}

#[async_trait]
impl NotificationHandler for ConfigurationUpdateHandler {
    async fn handle(&self, request: NotificationRequest) -> Result<(), HandlerError> {
        let (reply_type, payload) = match self.codec.decode_configuration_update(&request.payload) {
            Ok(update) => {
                info!(
                    "ran {}: configuration update, {} added {} modified {} deleted cells",
                    request.ran_name,
                    update.served_cells_to_add.len(),
                    update.served_cells_to_modify.len(),
                    update.served_cells_to_delete.len()
                );
                let ack = self
                    .codec
                    .encode_configuration_update_ack(&ConfigurationUpdateAck::default())?;
                (self.ack_type, ack)
            }
            Err(e) => {
                error!("ran {}: configuration update unpack failed: {}", request.ran_name, e);
                let failure = self.codec.encode_configuration_update_failure(
                    &ConfigurationUpdateFailure {
                        cause: FailureCause::Protocol(UNDECODABLE_CAUSE.to_string()),
                    },
                )?;
                (self.failure_type, failure)
            }
        };

        debug!(
            "ran {}: answering configuration update with {} ({} bytes)",
            request.ran_name,
            message_type_name(reply_type),
            payload.len()
        );
        self.sender
            .send(MBuf::new(
                reply_type,
                request.ran_name,
                payload,
                request.transaction_id,
            ))
            .await?;
        Ok(())
    }
}
