//! In-memory topology store for development and testing

use crate::{NbIdentity, NodebInfo, RanLoadInformation, StoreError, TopologyStore};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// In-memory topology store
#[derive(Clone, Default)]
pub struct MemoryTopologyStore {
    /// RAN name -> node record
    nodes: Arc<DashMap<String, NodebInfo>>,
    /// RAN name -> identity
    identities: Arc<DashMap<String, NbIdentity>>,
    /// RAN name -> latest load report
    load_information: Arc<DashMap<String, RanLoadInformation>>,
}

impl MemoryTopologyStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the store holds no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[async_trait]
impl TopologyStore for MemoryTopologyStore {
    async fn get_node(&self, ran_name: &str) -> Result<NodebInfo, StoreError> {
        self.nodes
            .get(ran_name)
            .map(|node| node.value().clone())
            .ok_or_else(|| StoreError::NotFound(ran_name.to_string()))
    }

    async fn get_all_identities(&self) -> Result<Vec<NbIdentity>, StoreError> {
        let mut identities: Vec<NbIdentity> = self
            .identities
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        identities.sort_by(|a, b| a.inventory_name.cmp(&b.inventory_name));
        Ok(identities)
    }

    async fn save_node(&self, identity: &NbIdentity, node: &NodebInfo) -> Result<u64, StoreError> {
        let mut entry = self
            .nodes
            .entry(node.ran_name.clone())
            .or_insert_with(|| NodebInfo {
                revision: 0,
                ..node.clone()
            });
        let revision = entry.revision + 1;
        *entry = NodebInfo {
            revision,
            ..node.clone()
        };
        drop(entry);

        self.identities
            .insert(identity.inventory_name.clone(), identity.clone());

        debug!("saved node {} revision={}", node.ran_name, revision);
        Ok(revision)
    }

    async fn update_node(&self, node: &NodebInfo) -> Result<u64, StoreError> {
        // The shard write lock is held across the compare and the swap
        let mut stored = self
            .nodes
            .get_mut(&node.ran_name)
            .ok_or_else(|| StoreError::NotFound(node.ran_name.clone()))?;

        if stored.revision != node.revision {
            return Err(StoreError::Conflict {
                ran_name: node.ran_name.clone(),
                expected: node.revision,
                actual: stored.revision,
            });
        }

        let revision = node.revision + 1;
        *stored = NodebInfo {
            revision,
            ..node.clone()
        };

        debug!(
            "updated node {} status={} attempts={} revision={}",
            node.ran_name, node.connection_status, node.connection_attempts, revision
        );
        Ok(revision)
    }

    async fn save_ran_load_information(
        &self,
        ran_name: &str,
        load: &RanLoadInformation,
    ) -> Result<(), StoreError> {
        self.load_information
            .insert(ran_name.to_string(), load.clone());
        debug!(
            "saved load information for {} ({} cells)",
            ran_name,
            load.cell_load_infos.len()
        );
        Ok(())
    }

    async fn get_ran_load_information(&self, ran_name: &str) -> Result<RanLoadInformation, StoreError> {
        self.load_information
            .get(ran_name)
            .map(|load| load.value().clone())
            .ok_or_else(|| StoreError::NotFound(ran_name.to_string()))
    }
}
