//! Applies state machine transitions to stored nodes.

use crate::error::ManagerError;
use crate::state_machine::{next_state, Trigger};
use e2mgr_storage::{ConnectionStatus, NodebInfo, RnibDataService, UpdateOutcome};
use tracing::{debug, info};

/// Result of applying a trigger to a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    /// Status before the trigger
    pub previous: ConnectionStatus,
    /// Status after the trigger (unchanged when not applied)
    pub current: ConnectionStatus,
    /// Whether a transition was written
    pub applied: bool,
    /// Node as stored after the call
    pub node: NodebInfo,
}

/// Drives node status through the state machine with compare-and-set writes
#[derive(Clone)]
pub struct RanStatusChangeManager {
    rnib: RnibDataService,
}

impl RanStatusChangeManager {
    /// Create a manager writing through `rnib`
    pub fn new(rnib: RnibDataService) -> Self {
        Self { rnib }
    }

    /// Apply `trigger` to the node named `ran_name`
    pub async fn apply(&self, ran_name: &str, trigger: Trigger) -> Result<StatusChange, ManagerError> {
        self.apply_with(ran_name, trigger, |_| {}).await
    }

    /// Apply `trigger` and, when the transition is valid, `amend` in the same write
    pub async fn apply_with<F>(
        &self,
        ran_name: &str,
        trigger: Trigger,
        mut amend: F,
    ) -> Result<StatusChange, ManagerError>
    where
        F: FnMut(&mut NodebInfo) + Send,
    {
        let outcome = self
            .rnib
            .update_node_with(ran_name, |node| match next_state(node.connection_status, trigger) {
                Some(next) => {
                    node.connection_status = next;
                    amend(node);
                    true
                }
                None => false,
            })
            .await?;

        match outcome {
            UpdateOutcome::Updated { previous, current } => {
                info!(
                    "ran {}: {} moved connection status {} -> {}",
                    ran_name, trigger, previous.connection_status, current.connection_status
                );
                if previous.connection_status != current.connection_status
                    && matches!(
                        current.connection_status,
                        ConnectionStatus::Connected | ConnectionStatus::Disconnected
                    )
                {
                    info!(
                        "ran {}: connectivity event {}",
                        ran_name, current.connection_status
                    );
                }
                Ok(StatusChange {
                    previous: previous.connection_status,
                    current: current.connection_status,
                    applied: true,
                    node: current,
                })
            }
            UpdateOutcome::Skipped(node) => {
                debug!(
                    "ran {}: no valid {} transition from {}",
                    ran_name, trigger, node.connection_status
                );
                Ok(StatusChange {
                    previous: node.connection_status,
                    current: node.connection_status,
                    applied: false,
                    node,
                })
            }
        }
    }
}
