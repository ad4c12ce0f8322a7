//! Outbound X2 / ENDC X2 setup.

use crate::error::ManagerError;
use async_trait::async_trait;
use bytes::Bytes;
use e2mgr_session::{E2SessionDetails, E2Sessions, RequestDetails, RmrSender};
use e2mgr_storage::{ConnectionStatus, E2ApplicationProtocol, NodebInfo, RnibDataService};
use e2mgr_wire::{
    E2RequestMessage, MBuf, ProtocolCodec, RicIdentity, SetupProtocol, SetupRequest,
    TransactionCounter, RIC_ENDC_X2_SETUP_REQ, RIC_X2_SETUP_REQ,
};
use tracing::{error, info, warn};

/// Starts a setup exchange with a RAN node
#[async_trait]
pub trait SetupInitiator: Send + Sync {
    /// Register a session for `node` and send its setup request
    async fn execute_setup(&self, node: &NodebInfo) -> Result<(), ManagerError>;
}

/// Sends setup requests and tracks them in the session registry
pub struct RanSetupManager {
    rnib: RnibDataService,
    sender: RmrSender,
    sessions: E2Sessions,
    x2_payload: Bytes,
    endc_payload: Bytes,
    transactions: TransactionCounter,
}

impl RanSetupManager {
    /// Create a manager. Setup PDUs for both protocols are packed once for `ric`.
    pub fn new(
        rnib: RnibDataService,
        sender: RmrSender,
        sessions: E2Sessions,
        codec: &dyn ProtocolCodec,
        ric: &RicIdentity,
    ) -> Result<Self, ManagerError> {
        let x2_payload =
            codec.encode_setup_request(&SetupRequest::for_ric(SetupProtocol::X2, ric)?)?;
        let endc_payload =
            codec.encode_setup_request(&SetupRequest::for_ric(SetupProtocol::EndcX2, ric)?)?;
        Ok(Self {
            rnib,
            sender,
            sessions,
            x2_payload,
            endc_payload,
            transactions: TransactionCounter::from_clock(),
        })
    }

    /// Replace the transaction id source
    pub fn with_transaction_counter(mut self, transactions: TransactionCounter) -> Self {
        self.transactions = transactions;
        self
    }

    fn prepare_request(&self, node: &NodebInfo, transaction_id: &str) -> Result<MBuf, ManagerError> {
        let (msg_type, payload) = match node.e2_application_protocol {
            E2ApplicationProtocol::X2SetupRequest => (RIC_X2_SETUP_REQ, self.x2_payload.clone()),
            E2ApplicationProtocol::EndcX2SetupRequest => {
                (RIC_ENDC_X2_SETUP_REQ, self.endc_payload.clone())
            }
            protocol => {
                return Err(ManagerError::UnsupportedProtocol {
                    ran_name: node.ran_name.clone(),
                    protocol,
                })
            }
        };

        let request = E2RequestMessage {
            transaction_id: transaction_id.to_string(),
            ran_ip: node.ip.clone(),
            ran_port: node.port,
            ran_name: node.ran_name.clone(),
            payload,
        };
        Ok(MBuf::new(
            msg_type,
            node.ran_name.clone(),
            request.to_bytes()?,
            transaction_id.as_bytes().to_vec(),
        ))
    }

    /// Undo the attempt recorded for a request that never left
    async fn roll_back_attempt(&self, ran_name: &str) {
        let result = self
            .rnib
            .update_node_with(ran_name, |node| {
                if node.connection_status != ConnectionStatus::Connecting {
                    return false;
                }
                node.connection_status = ConnectionStatus::Disconnected;
                node.connection_attempts = node.connection_attempts.saturating_sub(1);
                true
            })
            .await;
        if let Err(e) = result {
            error!("ran {}: failed to roll back setup attempt: {}", ran_name, e);
        }
    }
}

#[async_trait]
impl SetupInitiator for RanSetupManager {
    async fn execute_setup(&self, node: &NodebInfo) -> Result<(), ManagerError> {
        let transaction_id = self.transactions.expand(&format!("{}-$", node.ran_name));
        let request = self.prepare_request(node, &transaction_id)?;

        self.sessions.put(
            transaction_id.clone(),
            E2SessionDetails::new(
                transaction_id.clone(),
                RequestDetails {
                    ran_name: node.ran_name.clone(),
                    ran_ip: node.ip.clone(),
                    ran_port: node.port,
                },
            ),
        );

        if let Err(e) = self.sender.send(request).await {
            warn!("ran {}: setup request not sent", node.ran_name);
            self.sessions.delete(&transaction_id);
            self.roll_back_attempt(&node.ran_name).await;
            return Err(e.into());
        }

        info!(
            "ran {}: {:?} sent to {}:{} transaction={}",
            node.ran_name, node.e2_application_protocol, node.ip, node.port, transaction_id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use e2mgr_session::{Messenger, TransportError};
    use e2mgr_storage::MemoryTopologyStore;
    use e2mgr_wire::CborCodec;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingMessenger {
        sent: Mutex<Vec<MBuf>>,
        fail: bool,
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

    fn ric() -> RicIdentity {
        RicIdentity {
            ric_id: "bbbcc".into(),
            mcc: "310".into(),
            mnc: "410".into(),
        }
    }

    async fn fixture(
        fail: bool,
        protocol: E2ApplicationProtocol,
    ) -> (RanSetupManager, Arc<RecordingMessenger>, E2Sessions, RnibDataService, NodebInfo) {
        let rnib = RnibDataService::new(Arc::new(MemoryTopologyStore::new()), 1, Duration::ZERO);
        let mut node = NodebInfo::new("enb-01", "10.0.0.1", 36422, protocol);
        node.connection_status = ConnectionStatus::Connecting;
        node.connection_attempts = 1;
        rnib.save_node(&node).await.unwrap();

        let messenger = Arc::new(RecordingMessenger {
            fail,
            ..Default::default()
        });
        let sessions = E2Sessions::new(Duration::from_secs(60));
        let manager = RanSetupManager::new(
            rnib.clone(),
            RmrSender::new(messenger.clone()),
            sessions.clone(),
            &CborCodec,
            &ric(),
        )
        .unwrap()
        .with_transaction_counter(TransactionCounter::new(0));
        (manager, messenger, sessions, rnib, node)
    }

    #[tokio::test]
    async fn test_x2_setup_sends_request_and_registers_session() {
        let (manager, messenger, sessions, _, node) =
            fixture(false, E2ApplicationProtocol::X2SetupRequest).await;
        manager.execute_setup(&node).await.unwrap();

        let sent = messenger.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].msg_type, RIC_X2_SETUP_REQ);
        assert_eq!(sent[0].meid, "enb-01");
        assert!(sent[0].payload.starts_with(b"10.0.0.1|36422|enb-01|"));
        assert_eq!(&sent[0].xaction[..], b"enb-01-1");

        let session = sessions.get("enb-01-1").unwrap();
        assert_eq!(session.request.ran_ip, "10.0.0.1");
        assert_eq!(session.transaction_id, "enb-01-1");
    }

    #[tokio::test]
    async fn test_each_attempt_gets_a_fresh_transaction() {
        let (manager, messenger, sessions, _, node) =
            fixture(false, E2ApplicationProtocol::X2SetupRequest).await;
        manager.execute_setup(&node).await.unwrap();
        manager.execute_setup(&node).await.unwrap();

        let sent = messenger.sent.lock().unwrap();
        assert_eq!(&sent[0].xaction[..], b"enb-01-1");
        assert_eq!(&sent[1].xaction[..], b"enb-01-2");
        assert_eq!(sessions.len(), 2);
    }

    #[tokio::test]
    async fn test_endc_setup_uses_endc_message_type() {
        let (manager, messenger, _, _, node) =
            fixture(false, E2ApplicationProtocol::EndcX2SetupRequest).await;
        manager.execute_setup(&node).await.unwrap();
        assert_eq!(
            messenger.sent.lock().unwrap()[0].msg_type,
            RIC_ENDC_X2_SETUP_REQ
        );
    }

    #[tokio::test]
    async fn test_unknown_protocol_is_rejected() {
        let (manager, messenger, sessions, _, node) =
            fixture(false, E2ApplicationProtocol::Unknown).await;
        assert!(matches!(
            manager.execute_setup(&node).await,
            Err(ManagerError::UnsupportedProtocol { .. })
        ));
        assert!(messenger.sent.lock().unwrap().is_empty());
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_rolls_back() {
        let (manager, _, sessions, rnib, node) =
            fixture(true, E2ApplicationProtocol::X2SetupRequest).await;
        assert!(matches!(
            manager.execute_setup(&node).await,
            Err(ManagerError::Transport(_))
        ));
        assert!(sessions.is_empty());

        let stored = rnib.get_node("enb-01").await.unwrap();
        assert_eq!(stored.connection_status, ConnectionStatus::Disconnected);
        assert_eq!(stored.connection_attempts, 0);
    }

    #[test]
    fn test_invalid_ric_identity_fails_construction() {
        let rnib = RnibDataService::new(Arc::new(MemoryTopologyStore::new()), 1, Duration::ZERO);
        let bad = RicIdentity {
            ric_id: "bbbcc".into(),
            mcc: "31".into(),
            mnc: "410".into(),
        };
        let result = RanSetupManager::new(
            rnib,
            RmrSender::new(Arc::new(RecordingMessenger::default())),
            E2Sessions::default(),
            &CborCodec,
            &bad,
        );
        assert!(matches!(result, Err(ManagerError::Wire(_))));
    }
}
