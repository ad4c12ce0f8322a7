//! RAN topology store for the E2 manager.
//!
//! This crate provides the node entities shared by every E2 manager component,
//! the [`TopologyStore`] read/write contract with compare-and-set updates and
//! per-RAN load information,
//! pluggable backends (in-memory, Redis), and [`RnibDataService`], which adds
//! bounded retries on top of any backend.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod data_service;
pub mod entities;

use async_trait::async_trait;
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Node not found
    #[error("node not found: {0}")]
    NotFound(String),
    /// Store unreachable or connection dropped
    #[error("connection error: {0}")]
    Connection(String),
    /// Compare-and-set lost against a concurrent writer
    #[error("revision conflict for {ran_name}: expected {expected}, found {actual}")]
    Conflict {
        /// RAN name
        ran_name: String,
        /// Revision the writer read
        expected: u64,
        /// Revision currently stored
        actual: u64,
    },
    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Backend-specific error
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether retrying the same operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }

    /// Whether the error reports a missing node
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Read/write contract of the RAN topology store
#[async_trait]
pub trait TopologyStore: Send + Sync {
    /// Read a node by RAN name
    async fn get_node(&self, ran_name: &str) -> Result<NodebInfo, StoreError>;

    /// List the identities of every known node
    async fn get_all_identities(&self) -> Result<Vec<NbIdentity>, StoreError>;

    /// Insert or overwrite a node and register its identity. Returns the new revision.
    async fn save_node(&self, identity: &NbIdentity, node: &NodebInfo) -> Result<u64, StoreError>;

    /// Overwrite a node only if its stored revision still equals `node.revision`.
    ///
    /// Returns the new revision, [`StoreError::Conflict`] when another writer
    /// got there first, or [`StoreError::NotFound`] for an unknown node.
    async fn update_node(&self, node: &NodebInfo) -> Result<u64, StoreError>;

    /// Replace the load information stored for `ran_name`
    async fn save_ran_load_information(
        &self,
        ran_name: &str,
        load: &RanLoadInformation,
    ) -> Result<(), StoreError>;

    /// Read the load information stored for `ran_name`
    async fn get_ran_load_information(&self, ran_name: &str) -> Result<RanLoadInformation, StoreError>;
}

/// Topology store backend configuration
#[derive(Clone, Debug, Default)]
pub enum StoreMode {
    /// In-memory storage (dev/tests only)
    #[default]
    InMemory,
    /// Redis as primary storage
    Redis {
        /// Redis connection URL
        url: String,
        /// Number of pooled connections
        pool_size: usize,
    },
}

// Re-export main types
pub use backend::mem::MemoryTopologyStore;
#[cfg(feature = "redis-backend")]
pub use backend::redis::RedisTopologyStore;
pub use data_service::{RnibDataService, UpdateOutcome};
pub use entities::{
    CellLoadInformation, ConnectionStatus, E2ApplicationProtocol, FailureType, GlobalNbId,
    NbIdentity, NodeType, NodebInfo, RanLoadInformation, RelativeNarrowbandTxPower,
    UlHighInterferenceInformation, UlInterferenceOverloadIndication,
};

/// Create a store from configuration
pub async fn open_store(
    mode: StoreMode,
) -> Result<std::sync::Arc<dyn TopologyStore>, StoreError> {
    match mode {
        StoreMode::InMemory => Ok(std::sync::Arc::new(MemoryTopologyStore::new())),
        #[cfg(feature = "redis-backend")]
        StoreMode::Redis { url, pool_size } => Ok(std::sync::Arc::new(
            RedisTopologyStore::connect(&url, pool_size).await?,
        )),
        #[cfg(not(feature = "redis-backend"))]
        StoreMode::Redis { .. } => Err(StoreError::Backend(
            "redis backend not compiled in (enable feature redis-backend)".to_string(),
        )),
    }
}
