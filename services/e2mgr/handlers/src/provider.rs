//! Message type to handler table.
//!
//! Built once at startup and never mutated, so lookups need no locking.

use crate::configuration_update::ConfigurationUpdateHandler;
use crate::e2_term_init::E2TermInitHandler;
use crate::handler::NotificationHandler;
use crate::load_information::EnbLoadInformationHandler;
use crate::lost_connection::RanLostConnectionHandler;
use crate::setup_response::SetupResponseHandler;
use crate::x2_reset::{X2ResetRequestHandler, X2ResetResponseHandler};
use e2mgr_managers::{RanReconnectionManager, RanStatusChangeManager};
use e2mgr_session::{E2Sessions, RmrSender};
use e2mgr_storage::RnibDataService;
use e2mgr_wire::{
    ProtocolCodec, SetupProtocol, RIC_E2_TERM_INIT, RIC_ENB_CONF_UPDATE, RIC_ENB_LOAD_INFORMATION,
    RIC_ENDC_CONF_UPDATE,
    RIC_ENDC_X2_SETUP_FAILURE, RIC_ENDC_X2_SETUP_RESP, RIC_SCTP_CONNECTION_FAILURE, RIC_X2_RESET,
    RIC_X2_RESET_RESP, RIC_X2_SETUP_FAILURE, RIC_X2_SETUP_RESP,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Collaborators the bundled handlers are built from
#[derive(Clone)]
pub struct HandlerDependencies {
    /// Topology store access
    pub rnib: RnibDataService,
    /// Outbound sender
    pub sender: RmrSender,
    /// Session registry
    pub sessions: E2Sessions,
    /// RAN payload codec
    pub codec: Arc<dyn ProtocolCodec>,
    /// Reconnection manager
    pub reconnection: RanReconnectionManager,
}

/// Immutable handler table
pub struct NotificationHandlerProvider {
    handlers: HashMap<i32, Arc<dyn NotificationHandler>>,
}

impl NotificationHandlerProvider {
    /// Build the table of bundled handlers
    pub fn new(deps: HandlerDependencies) -> Self {
        let status = RanStatusChangeManager::new(deps.rnib.clone());
        let setup = |protocol, success| -> Arc<dyn NotificationHandler> {
            let (status, sessions, codec) = (status.clone(), deps.sessions.clone(), deps.codec.clone());
            if success {
                Arc::new(SetupResponseHandler::success(status, sessions, codec, protocol))
            } else {
                Arc::new(SetupResponseHandler::failure(status, sessions, codec, protocol))
            }
        };

        let handlers: [(i32, Arc<dyn NotificationHandler>); 11] = [
            (RIC_X2_SETUP_RESP, setup(SetupProtocol::X2, true)),
            (RIC_X2_SETUP_FAILURE, setup(SetupProtocol::X2, false)),
            (RIC_ENDC_X2_SETUP_RESP, setup(SetupProtocol::EndcX2, true)),
            (RIC_ENDC_X2_SETUP_FAILURE, setup(SetupProtocol::EndcX2, false)),
            (
                RIC_SCTP_CONNECTION_FAILURE,
                Arc::new(RanLostConnectionHandler::new(
                    status.clone(),
                    deps.sessions.clone(),
                    deps.reconnection.clone(),
                )),
            ),
            (
                RIC_E2_TERM_INIT,
                Arc::new(E2TermInitHandler::new(deps.rnib.clone(), deps.reconnection.clone())),
            ),
            (
                RIC_X2_RESET,
                Arc::new(X2ResetRequestHandler::new(
                    deps.rnib.clone(),
                    deps.codec.clone(),
                    deps.sender.clone(),
                )),
            ),
            (
                RIC_X2_RESET_RESP,
                Arc::new(X2ResetResponseHandler::new(deps.rnib.clone(), deps.codec.clone())),
            ),
            (
                RIC_ENB_LOAD_INFORMATION,
                Arc::new(EnbLoadInformationHandler::new(deps.rnib.clone(), deps.codec.clone())),
            ),
            (
                RIC_ENB_CONF_UPDATE,
                Arc::new(ConfigurationUpdateHandler::enb(deps.codec.clone(), deps.sender.clone())),
            ),
            (
                RIC_ENDC_CONF_UPDATE,
                Arc::new(ConfigurationUpdateHandler::endc(deps.codec, deps.sender)),
            ),
        ];
        Self::from_handlers(handlers)
    }

    /// Build a table from explicit registrations. Later entries win.
    pub fn from_handlers<I>(handlers: I) -> Self
    where
        I: IntoIterator<Item = (i32, Arc<dyn NotificationHandler>)>,
    {
        Self {
            handlers: handlers.into_iter().collect(),
        }
    }

    /// Handler registered for `msg_type`
    pub fn get_handler(&self, msg_type: i32) -> Option<&Arc<dyn NotificationHandler>> {
        self.handlers.get(&msg_type)
    }

    /// Registered message types, ascending
    pub fn message_types(&self) -> Vec<i32> {
        let mut types: Vec<i32> = self.handlers.keys().copied().collect();
        types.sort_unstable();
        types
    }

    /// Number of registrations
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
