//! Two-phase shutdown of every known RAN node.

use crate::error::ManagerError;
use crate::state_machine::Trigger;
use crate::status_change::RanStatusChangeManager;
use bytes::Bytes;
use e2mgr_session::RmrSender;
use e2mgr_storage::{ConnectionStatus, RnibDataService};
use e2mgr_wire::{MBuf, RIC_SCTP_CLEAR_ALL};
use std::time::Duration;
use tracing::{info, warn};

/// Counts reported by [`DeleteAllManager::shutdown_all`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteAllSummary {
    /// Nodes moved to SHUTTING_DOWN in the first phase
    pub shutting_down: usize,
    /// Nodes moved straight to SHUT_DOWN in the first phase
    pub shut_down: usize,
    /// Nodes moved from SHUTTING_DOWN to SHUT_DOWN after the timeout
    pub finalized: usize,
    /// Nodes left untouched
    pub skipped: usize,
}

/// Shuts down all nodes and asks the terminators to clear their associations
pub struct DeleteAllManager {
    rnib: RnibDataService,
    status: RanStatusChangeManager,
    sender: RmrSender,
    timeout: Duration,
}

impl DeleteAllManager {
    /// Create a manager waiting `timeout` between the two phases
    pub fn new(rnib: RnibDataService, sender: RmrSender, timeout: Duration) -> Self {
        Self {
            status: RanStatusChangeManager::new(rnib.clone()),
            rnib,
            sender,
            timeout,
        }
    }

    /// Apply a trigger, treating nodes that vanished as skipped
    async fn apply(&self, ran_name: &str, trigger: Trigger) -> Result<Option<ConnectionStatus>, ManagerError> {
        match self.status.apply(ran_name, trigger).await {
            Ok(change) if change.applied => Ok(Some(change.current)),
            Ok(_) => Ok(None),
            Err(ManagerError::Store(e)) if e.is_not_found() => {
                warn!("ran {}: removed during shutdown", ran_name);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Shut down every node.
    ///
    /// Connected nodes move to SHUTTING_DOWN and disconnected ones straight
    /// to SHUT_DOWN, then a single clear-all is sent. After the timeout the
    /// nodes still SHUTTING_DOWN are finalized.
    pub async fn shutdown_all(&self) -> Result<DeleteAllSummary, ManagerError> {
        let identities = self.rnib.get_all_identities().await?;
        let mut summary = DeleteAllSummary::default();
        let mut pending = Vec::new();

        for identity in &identities {
            let name = &identity.inventory_name;
            match self.apply(name, Trigger::DeleteAll).await? {
                Some(ConnectionStatus::ShuttingDown) => {
                    summary.shutting_down += 1;
                    pending.push(name.clone());
                }
                Some(_) => summary.shut_down += 1,
                None => summary.skipped += 1,
            }
        }

        self.sender
            .send(MBuf::new(RIC_SCTP_CLEAR_ALL, "", Bytes::new(), Bytes::new()))
            .await?;

        if !pending.is_empty() {
            tokio::time::sleep(self.timeout).await;
            for name in &pending {
                if self.apply(name, Trigger::DeleteAllTimeout).await?.is_some() {
                    summary.finalized += 1;
                }
            }
        }

        info!(
            "delete all: {} shutting down, {} shut down, {} finalized, {} skipped",
            summary.shutting_down, summary.shut_down, summary.finalized, summary.skipped
        );
        Ok(summary)
    }
}
