//! Retrying facade over a topology store.
//!
//! Connection errors are retried up to the configured attempt count with a
//! fixed interval; every other error is returned immediately.

use crate::{NbIdentity, NodebInfo, RanLoadInformation, StoreError, TopologyStore};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default number of compare-and-set rounds before giving up on a contended node
pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 16;

/// Result of a read-modify-write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The mutation was written
    Updated {
        /// Node as read before the mutation
        previous: NodebInfo,
        /// Node as written, carrying its new revision
        current: NodebInfo,
    },
    /// The mutation declined to write; carries the node as read
    Skipped(NodebInfo),
}

/// Topology store access with bounded retries
#[derive(Clone)]
pub struct RnibDataService {
    store: Arc<dyn TopologyStore>,
    max_attempts: u32,
    retry_interval: Duration,
    max_conflict_retries: u32,
}

impl RnibDataService {
    /// Wrap `store`. `max_attempts` of zero still performs one try.
    pub fn new(store: Arc<dyn TopologyStore>, max_attempts: u32, retry_interval: Duration) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
            retry_interval,
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
        }
    }

    /// Override the compare-and-set round limit
    pub fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries.max(1);
        self
    }

    async fn retry<T, F, Fut>(&self, op: &str, mut call: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        "rnib {} failed (attempt {}/{}): {}",
                        op, attempt, self.max_attempts, e
                    );
                    attempt += 1;
                    tokio::time::sleep(self.retry_interval).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Read a node
    pub async fn get_node(&self, ran_name: &str) -> Result<NodebInfo, StoreError> {
        self.retry("get node", || self.store.get_node(ran_name)).await
    }

    /// List node identities
    pub async fn get_all_identities(&self) -> Result<Vec<NbIdentity>, StoreError> {
        self.retry("get identities", || self.store.get_all_identities())
            .await
    }

    /// Insert or overwrite a node
    pub async fn save_node(&self, node: &NodebInfo) -> Result<u64, StoreError> {
        let identity = node.identity();
        self.retry("save node", || self.store.save_node(&identity, node))
            .await
    }

    /// Compare-and-set write of a node
    pub async fn update_node(&self, node: &NodebInfo) -> Result<u64, StoreError> {
        self.retry("update node", || self.store.update_node(node)).await
    }

    /// Store the latest load report of a RAN
    pub async fn save_ran_load_information(
        &self,
        ran_name: &str,
        load: &RanLoadInformation,
    ) -> Result<(), StoreError> {
        self.retry("save load information", || {
            self.store.save_ran_load_information(ran_name, load)
        })
        .await
    }

    /// Read the latest load report of a RAN
    pub async fn get_ran_load_information(
        &self,
        ran_name: &str,
    ) -> Result<RanLoadInformation, StoreError> {
        self.retry("get load information", || {
            self.store.get_ran_load_information(ran_name)
        })
        .await
    }

    /// Read a node, apply `mutate` and write it back with compare-and-set.
    ///
    /// On a revision conflict the node is re-read and `mutate` applied again.
    /// When `mutate` returns `false` nothing is written.
    pub async fn update_node_with<F>(
        &self,
        ran_name: &str,
        mut mutate: F,
    ) -> Result<UpdateOutcome, StoreError>
    where
        F: FnMut(&mut NodebInfo) -> bool + Send,
    {
        let mut round = 0;
        loop {
            round += 1;
            let previous = self.get_node(ran_name).await?;
            let mut current = previous.clone();
            if !mutate(&mut current) {
                return Ok(UpdateOutcome::Skipped(previous));
            }

            match self.update_node(&current).await {
                Ok(revision) => {
                    current.revision = revision;
                    return Ok(UpdateOutcome::Updated { previous, current });
                }
                Err(StoreError::Conflict { .. }) if round < self.max_conflict_retries => {
                    debug!("rnib update of {} lost a race, re-reading", ran_name);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConnectionStatus, E2ApplicationProtocol, MemoryTopologyStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Store that fails the first `failures` reads with the given error kind
    struct FlakyStore {
        inner: MemoryTopologyStore,
        failures: AtomicU32,
        retryable: bool,
        calls: AtomicU32,
    }

    impl FlakyStore {
        fn new(failures: u32, retryable: bool) -> Self {
            Self {
                inner: MemoryTopologyStore::new(),
                failures: AtomicU32::new(failures),
                retryable,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl TopologyStore for FlakyStore {
        async fn get_node(&self, ran_name: &str) -> Result<NodebInfo, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(if self.retryable {
                    StoreError::Connection("reset by peer".to_string())
                } else {
                    StoreError::Backend("wrong type".to_string())
                });
            }
            self.inner.get_node(ran_name).await
        }

        async fn get_all_identities(&self) -> Result<Vec<NbIdentity>, StoreError> {
            self.inner.get_all_identities().await
        }

        async fn save_node(&self, identity: &NbIdentity, node: &NodebInfo) -> Result<u64, StoreError> {
            self.inner.save_node(identity, node).await
        }

        async fn update_node(&self, node: &NodebInfo) -> Result<u64, StoreError> {
            self.inner.update_node(node).await
        }

        async fn save_ran_load_information(
            &self,
            ran_name: &str,
            load: &RanLoadInformation,
        ) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(StoreError::Connection("reset by peer".to_string()));
            }
            self.inner.save_ran_load_information(ran_name, load).await
        }

        async fn get_ran_load_information(
            &self,
            ran_name: &str,
        ) -> Result<RanLoadInformation, StoreError> {
            self.inner.get_ran_load_information(ran_name).await
        }
    }

    fn node(name: &str) -> NodebInfo {
        NodebInfo::new(name, "10.0.0.1", 36422, E2ApplicationProtocol::X2SetupRequest)
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_errors_are_retried() {
        let store = Arc::new(FlakyStore::new(2, true));
        store.inner.save_node(&node("enb-01").identity(), &node("enb-01")).await.unwrap();

        let service = RnibDataService::new(store.clone(), 3, Duration::from_millis(10));
        let fetched = service.get_node("enb-01").await.unwrap();
        assert_eq!(fetched.ran_name, "enb-01");
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_are_bounded() {
        let store = Arc::new(FlakyStore::new(10, true));
        let service = RnibDataService::new(store.clone(), 3, Duration::from_millis(10));

        let err = service.get_node("enb-01").await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let store = Arc::new(FlakyStore::new(1, false));
        let service = RnibDataService::new(store.clone(), 5, Duration::from_millis(10));

        assert!(matches!(
            service.get_node("enb-01").await,
            Err(StoreError::Backend(_))
        ));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_update_with_skips_when_declined() {
        let store = Arc::new(MemoryTopologyStore::new());
        let service = RnibDataService::new(store.clone(), 1, Duration::ZERO);
        service.save_node(&node("enb-01")).await.unwrap();

        let outcome = service
            .update_node_with("enb-01", |_| false)
            .await
            .unwrap();
        assert!(matches!(outcome, UpdateOutcome::Skipped(n) if n.revision == 1));
        assert_eq!(store.get_node("enb-01").await.unwrap().revision, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(MemoryTopologyStore::new());
        let service = RnibDataService::new(store.clone(), 1, Duration::ZERO)
            .with_max_conflict_retries(1000);
        service.save_node(&node("enb-01")).await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..32 {
            let service = service.clone();
            tasks.push(tokio::spawn(async move {
                service
                    .update_node_with("enb-01", |n| {
                        n.connection_attempts += 1;
                        n.connection_status = ConnectionStatus::Connecting;
                        true
                    })
                    .await
            }));
        }
        for task in tasks {
            assert!(matches!(
                task.await.unwrap().unwrap(),
                UpdateOutcome::Updated { .. }
            ));
        }

        let stored = store.get_node("enb-01").await.unwrap();
        assert_eq!(stored.connection_attempts, 32);
        assert_eq!(stored.revision, 33);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_information_save_is_retried() {
        let store = Arc::new(FlakyStore::new(1, true));
        let service = RnibDataService::new(store.clone(), 2, Duration::from_millis(10));
        let load = RanLoadInformation {
            load_timestamp: 1_700_000_000_000_000_000,
            cell_load_infos: vec![],
        };

        service.save_ran_load_information("enb-01", &load).await.unwrap();
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
        assert_eq!(service.get_ran_load_information("enb-01").await.unwrap(), load);
    }
}
