//! E2 terminator restart.

use crate::handler::{HandlerError, NotificationHandler};
use crate::request::NotificationRequest;
use async_trait::async_trait;
use e2mgr_managers::{ManagerError, RanReconnectionManager};
use e2mgr_storage::RnibDataService;
use e2mgr_wire::E2TermInitPayload;
use futures::future::join_all;
use tracing::{debug, info, warn};

/// Re-establishes every known node after a terminator comes up
pub struct E2TermInitHandler {
    rnib: RnibDataService,
    reconnection: RanReconnectionManager,
}

impl E2TermInitHandler {
    /// Create the handler
    pub fn new(rnib: RnibDataService, reconnection: RanReconnectionManager) -> Self {
        Self { rnib, reconnection }
    }
}

#[async_trait]
impl NotificationHandler for E2TermInitHandler {
    async fn handle(&self, request: NotificationRequest) -> Result<(), HandlerError> {
        let init = E2TermInitPayload::from_json(&request.payload)?;
        info!("e2 terminator {} initialized", init.address);

        let identities = self.rnib.get_all_identities().await?;
        if identities.is_empty() {
            info!("no ran nodes to reconnect");
            return Ok(());
        }

        info!("reconnecting {} ran nodes", identities.len());
        let attempts = identities.iter().map(|identity| async move {
            let name = identity.inventory_name.as_str();
            (name, self.reconnection.reconnect_node(name).await)
        });

        let mut first_error = None;
        for (name, result) in join_all(attempts).await {
            match result {
                Ok(outcome) => debug!("ran {}: {:?}", name, outcome),
                Err(ManagerError::Store(e)) if e.is_not_found() => {
                    warn!("ran {}: listed but not found, skipping", name);
                }
                Err(e) => {
                    warn!("ran {}: reconnection failed: {}", name, e);
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, node, rnib_with};
    use e2mgr_managers::SetupInitiator;
    use e2mgr_storage::{ConnectionStatus, NodebInfo};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Default)]
    struct MockInitiator {
        nodes: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SetupInitiator for MockInitiator {
        async fn execute_setup(&self, node: &NodebInfo) -> Result<(), ManagerError> {
            self.nodes.lock().unwrap().push(node.ran_name.clone());
            Ok(())
        }
    }

    fn request(payload: &'static [u8]) -> NotificationRequest {
        test_support::request("", payload, b"")
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_nodes_reconnected() {
        let rnib = rnib_with(&[
            node("enb-01", ConnectionStatus::Connected),
            node("gnb-02", ConnectionStatus::Disconnected),
            node("enb-03", ConnectionStatus::ShutDown),
        ])
        .await;
        let initiator = Arc::new(MockInitiator::default());
        let handler = E2TermInitHandler::new(
            rnib.clone(),
            RanReconnectionManager::new(rnib.clone(), initiator.clone(), 3, Duration::from_millis(10)),
        );

        handler
            .handle(request(br#"{"address":"10.0.2.15:38000"}"#))
            .await
            .unwrap();

        let mut reconnected = initiator.nodes.lock().unwrap().clone();
        reconnected.sort();
        assert_eq!(reconnected, vec!["enb-01".to_string(), "gnb-02".to_string()]);
        assert_eq!(
            rnib.get_node("enb-03").await.unwrap().connection_status,
            ConnectionStatus::ShutDown
        );
    }

    #[tokio::test]
    async fn test_bad_payload() {
        let rnib = rnib_with(&[node("enb-01", ConnectionStatus::Connected)]).await;
        let initiator = Arc::new(MockInitiator::default());
        let handler = E2TermInitHandler::new(
            rnib.clone(),
            RanReconnectionManager::new(rnib, initiator.clone(), 3, Duration::ZERO),
        );

        assert!(matches!(
            handler.handle(request(b"not json")).await,
            Err(HandlerError::Decode(_))
        ));
        assert!(initiator.nodes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_address_is_rejected() {
        let rnib = rnib_with(&[node("enb-01", ConnectionStatus::Connected)]).await;
        let initiator = Arc::new(MockInitiator::default());
        let handler = E2TermInitHandler::new(
            rnib.clone(),
            RanReconnectionManager::new(rnib.clone(), initiator.clone(), 3, Duration::ZERO),
        );

        assert!(matches!(
            handler.handle(request(br#"{"address":""}"#)).await,
            Err(HandlerError::Decode(_))
        ));
        assert!(initiator.nodes.lock().unwrap().is_empty());
        assert_eq!(
            rnib.get_node("enb-01").await.unwrap().connection_status,
            ConnectionStatus::Connected
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_nodes_reconnect_concurrently() {
        let names: Vec<String> = (0..5).map(|i| format!("enb-{:02}", i)).collect();
        let nodes: Vec<NodebInfo> = names
            .iter()
            .map(|name| node(name, ConnectionStatus::Disconnected))
            .collect();
        let rnib = rnib_with(&nodes).await;
        let initiator = Arc::new(MockInitiator::default());
        let retry_interval = Duration::from_secs(1);
        let handler = E2TermInitHandler::new(
            rnib.clone(),
            RanReconnectionManager::new(rnib.clone(), initiator.clone(), 3, retry_interval),
        );

        let started = Instant::now();
        handler
            .handle(request(br#"{"address":"10.0.2.15:38000"}"#))
            .await
            .unwrap();

        assert!(started.elapsed() < retry_interval * 2);
        assert_eq!(initiator.nodes.lock().unwrap().len(), names.len());
    }
}
