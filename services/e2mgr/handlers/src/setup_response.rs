//! X2 / ENDC X2 setup response and failure handling.

use crate::handler::{HandlerError, NotificationHandler};
use crate::request::NotificationRequest;
use async_trait::async_trait;
use e2mgr_managers::{RanStatusChangeManager, Trigger};
use e2mgr_session::E2Sessions;
use e2mgr_storage::{FailureType, GlobalNbId, NodeType};
use e2mgr_wire::{ProtocolCodec, SetupProtocol, WireNodeType};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Failure,
}

/// Completes a setup exchange started by the setup manager
pub struct SetupResponseHandler {
    status: RanStatusChangeManager,
    sessions: E2Sessions,
    codec: Arc<dyn ProtocolCodec>,
    protocol: SetupProtocol,
    outcome: Outcome,
}

impl SetupResponseHandler {
    /// Handler for a successful setup of `protocol`
    pub fn success(
        status: RanStatusChangeManager,
        sessions: E2Sessions,
        codec: Arc<dyn ProtocolCodec>,
        protocol: SetupProtocol,
    ) -> Self {
        Self {
            status,
            sessions,
            codec,
            protocol,
            outcome: Outcome::Success,
        }
    }

    /// Handler for a rejected setup of `protocol`
    pub fn failure(
        status: RanStatusChangeManager,
        sessions: E2Sessions,
        codec: Arc<dyn ProtocolCodec>,
        protocol: SetupProtocol,
    ) -> Self {
        Self {
            status,
            sessions,
            codec,
            protocol,
            outcome: Outcome::Failure,
        }
    }

    fn failure_type(&self) -> FailureType {
        match self.protocol {
            SetupProtocol::X2 => FailureType::X2SetupFailure,
            SetupProtocol::EndcX2 => FailureType::EndcX2SetupFailure,
        }
    }

    async fn on_success(&self, request: &NotificationRequest) -> Result<bool, HandlerError> {
        let response = self.codec.decode_setup_response(&request.payload)?;
        debug!(
            "ran {}: setup response with {} served cells",
            request.ran_name,
            response.served_cells.len()
        );

        let node_type = match response.node_type {
            WireNodeType::Enb => NodeType::Enb,
            WireNodeType::Gnb => NodeType::Gnb,
        };
        let global_nb_id = GlobalNbId {
            plmn_id: response.plmn_id,
            nb_id: response.nb_id,
        };
        let change = self
            .status
            .apply_with(&request.ran_name, Trigger::SetupSuccess, |node| {
                node.connection_attempts = 0;
                node.node_type = node_type;
                node.global_nb_id = Some(global_nb_id.clone());
                node.failure_type = FailureType::Nothing;
                node.setup_failure = None;
            })
            .await?;
        Ok(change.applied)
    }

    async fn on_failure(&self, request: &NotificationRequest) -> Result<bool, HandlerError> {
        let failure = self.codec.decode_setup_failure(&request.payload)?;
        warn!("ran {}: setup rejected, {}", request.ran_name, failure.cause);

        let failure_type = self.failure_type();
        let cause = failure.cause.to_string();
        let change = self
            .status
            .apply_with(&request.ran_name, Trigger::SetupFailure, |node| {
                node.failure_type = failure_type;
                node.setup_failure = Some(cause.clone());
            })
            .await?;
        Ok(change.applied)
    }
}

#[async_trait]
impl NotificationHandler for SetupResponseHandler {
    async fn handle(&self, request: NotificationRequest) -> Result<(), HandlerError> {
        let applied = match self.outcome {
            Outcome::Success => self.on_success(&request).await?,
            Outcome::Failure => self.on_failure(&request).await?,
        };
        if !applied {
            info!(
                "ran {}: {:?} setup {:?} ignored in current status",
                request.ran_name, self.protocol, self.outcome
            );
        }

        let transaction_id = request.transaction_id_str();
        match self.sessions.delete(&transaction_id) {
            Some(session) => debug!(
                "ran {}: session {} completed after {:?}",
                request.ran_name,
                transaction_id,
                session.age()
            ),
            None => debug!(
                "ran {}: no session for transaction {}",
                request.ran_name, transaction_id
            ),
        }
        Ok(())
    }
}
