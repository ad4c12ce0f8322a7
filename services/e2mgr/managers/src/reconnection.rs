//! Bounded reconnection of RAN nodes.
//!
//! A node is retried while its attempt counter is below the configured
//! maximum. Each attempt is recorded with a compare-and-set write before the
//! setup request goes out, and at most one attempt per node is in flight.

use crate::error::ManagerError;
use crate::setup::SetupInitiator;
use crate::state_machine::{next_state, Trigger};
use crate::status_change::RanStatusChangeManager;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use e2mgr_storage::{ConnectionStatus, RnibDataService, UpdateOutcome};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Outcome of a reconnection request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconnectOutcome {
    /// A setup attempt was recorded and sent
    Initiated {
        /// Attempt number, counting from 1 since the last successful setup
        attempt: u32,
    },
    /// Another reconnection for the same node is running
    AlreadyInProgress,
    /// The attempt budget is spent
    Exhausted {
        /// Status the node was left in
        status: ConnectionStatus,
    },
    /// The node is being shut down
    NotReconnectable {
        /// Status the node was left in
        status: ConnectionStatus,
    },
}

/// Removes the node from the in-flight set when dropped
struct InFlightGuard {
    in_flight: Arc<DashMap<String, ()>>,
    ran_name: String,
}

impl InFlightGuard {
    fn acquire(in_flight: &Arc<DashMap<String, ()>>, ran_name: &str) -> Option<Self> {
        match in_flight.entry(ran_name.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(Self {
                    in_flight: in_flight.clone(),
                    ran_name: ran_name.to_string(),
                })
            }
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.ran_name);
    }
}

/// Decides whether a node gets another setup attempt
#[derive(Clone)]
pub struct RanReconnectionManager {
    rnib: RnibDataService,
    status: RanStatusChangeManager,
    initiator: Arc<dyn SetupInitiator>,
    max_attempts: u32,
    retry_interval: Duration,
    in_flight: Arc<DashMap<String, ()>>,
}

impl RanReconnectionManager {
    /// Create a manager allowing `max_attempts` attempts per node, spaced by `retry_interval`
    pub fn new(
        rnib: RnibDataService,
        initiator: Arc<dyn SetupInitiator>,
        max_attempts: u32,
        retry_interval: Duration,
    ) -> Self {
        Self {
            status: RanStatusChangeManager::new(rnib.clone()),
            rnib,
            initiator,
            max_attempts,
            retry_interval,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Configured attempt budget
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Attempt to reconnect `ran_name`
    pub async fn reconnect_node(&self, ran_name: &str) -> Result<ReconnectOutcome, ManagerError> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, ran_name) else {
            info!("ran {}: reconnection already in progress", ran_name);
            return Ok(ReconnectOutcome::AlreadyInProgress);
        };

        let max_attempts = self.max_attempts;
        let outcome = self
            .rnib
            .update_node_with(ran_name, |node| {
                if node.connection_attempts >= max_attempts {
                    return false;
                }
                match next_state(node.connection_status, Trigger::ReconnectionAttempt) {
                    Some(next) => {
                        node.connection_status = next;
                        node.connection_attempts += 1;
                        true
                    }
                    None => false,
                }
            })
            .await?;

        match outcome {
            UpdateOutcome::Updated { current, .. } => {
                let attempt = current.connection_attempts;
                info!(
                    "ran {}: reconnection attempt {}/{}",
                    ran_name, attempt, max_attempts
                );
                tokio::time::sleep(self.retry_interval).await;
                self.initiator.execute_setup(&current).await?;
                Ok(ReconnectOutcome::Initiated { attempt })
            }
            UpdateOutcome::Skipped(node) => {
                let shutting_down = matches!(
                    node.connection_status,
                    ConnectionStatus::ShuttingDown | ConnectionStatus::ShutDown
                );
                let change = self
                    .status
                    .apply(ran_name, Trigger::ReconnectionExhausted)
                    .await?;
                if shutting_down {
                    info!("ran {}: not reconnecting, status {}", ran_name, change.current);
                    Ok(ReconnectOutcome::NotReconnectable {
                        status: change.current,
                    })
                } else {
                    warn!(
                        "ran {}: reconnection attempts exhausted ({}), status {}",
                        ran_name, node.connection_attempts, change.current
                    );
                    Ok(ReconnectOutcome::Exhausted {
                        status: change.current,
                    })
                }
            }
        }
    }
}
