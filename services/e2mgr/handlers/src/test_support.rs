//! Shared fixtures for handler tests.

use crate::provider::{HandlerDependencies, NotificationHandlerProvider};
use crate::request::NotificationRequest;
use async_trait::async_trait;
use e2mgr_managers::{RanReconnectionManager, RanSetupManager};
use e2mgr_session::{E2Sessions, Messenger, RmrSender, TransportError};
use e2mgr_storage::{ConnectionStatus, E2ApplicationProtocol, MemoryTopologyStore, NodebInfo, RnibDataService};
use e2mgr_wire::{CborCodec, MBuf, RicIdentity};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
pub(crate) struct RecordingMessenger {
    pub sent: Mutex<Vec<MBuf>>,
    pub fail: bool,
}

impl RecordingMessenger {
    pub fn sent(&self) -> Vec<MBuf> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, msg: MBuf) -> Result<Option<MBuf>, TransportError> {
        if self.fail {
            return Err(TransportError::SendFailed("route unavailable".into()));
        }
        self.sent.lock().unwrap().push(msg);
        Ok(None)
    }

    async fn recv(&self) -> Result<MBuf, TransportError> {
        std::future::pending().await
    }

    fn is_ready(&self) -> bool {
        true
    }

    async fn close(&self) {}
}

pub(crate) fn node(name: &str, status: ConnectionStatus) -> NodebInfo {
    let mut node = NodebInfo::new(name, "10.0.0.1", 36422, E2ApplicationProtocol::X2SetupRequest);
    node.connection_status = status;
    node
}

pub(crate) async fn rnib_with(nodes: &[NodebInfo]) -> RnibDataService {
    let rnib = RnibDataService::new(Arc::new(MemoryTopologyStore::new()), 1, Duration::ZERO);
    for node in nodes {
        rnib.save_node(node).await.unwrap();
    }
    rnib
}

/// Request for `ran_name` as the receive loop would build it
pub(crate) fn request(ran_name: &str, payload: &[u8], transaction_id: &[u8]) -> NotificationRequest {
    NotificationRequest::from_mbuf(MBuf::new(0, ran_name, payload.to_vec(), transaction_id.to_vec()))
}

pub(crate) fn ric() -> RicIdentity {
    RicIdentity {
        ric_id: "bbbcc".into(),
        mcc: "310".into(),
        mnc: "410".into(),
    }
}

/// Bundled handler table over an in-memory topology
pub(crate) fn bundled_provider(
    rnib: RnibDataService,
    sessions: E2Sessions,
    messenger: Arc<RecordingMessenger>,
) -> NotificationHandlerProvider {
    let sender = RmrSender::new(messenger);
    let setup = RanSetupManager::new(rnib.clone(), sender.clone(), sessions.clone(), &CborCodec, &ric())
        .unwrap();
    NotificationHandlerProvider::new(HandlerDependencies {
        reconnection: RanReconnectionManager::new(rnib.clone(), Arc::new(setup), 3, Duration::ZERO),
        rnib,
        sender,
        sessions,
        codec: Arc::new(CborCodec),
    })
}
