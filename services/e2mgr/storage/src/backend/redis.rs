//! Redis topology store backend
//!
//! Each node lives in a hash `RAN:<name>` with a `data` field (JSON) and a
//! `revision` field. Identities are kept in the `NB_IDENTITIES` hash and load
//! reports as JSON strings under `LOAD:<name>`.
//! Writes go through Lua scripts so the revision check and the write are atomic.

use crate::{NbIdentity, NodebInfo, RanLoadInformation, StoreError, TopologyStore};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

const IDENTITIES_KEY: &str = "NB_IDENTITIES";

const SAVE_SCRIPT: &str = r#"
local rev = tonumber(redis.call('HGET', KEYS[1], 'revision') or '0') + 1
redis.call('HSET', KEYS[1], 'data', ARGV[1], 'revision', rev)
redis.call('HSET', KEYS[2], ARGV[2], ARGV[3])
return rev
"#;

// Returns {0, new_rev} on success, {1, 0} when missing, {2, current_rev} on conflict
const UPDATE_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
  return {1, 0}
end
local rev = tonumber(redis.call('HGET', KEYS[1], 'revision') or '0')
if rev ~= tonumber(ARGV[2]) then
  return {2, rev}
end
redis.call('HSET', KEYS[1], 'data', ARGV[1], 'revision', rev + 1)
return {0, rev + 1}
"#;

fn node_key(ran_name: &str) -> String {
    format!("RAN:{}", ran_name)
}

fn load_key(ran_name: &str) -> String {
    format!("LOAD:{}", ran_name)
}

fn map_redis_err(err: redis::RedisError) -> StoreError {
    if err.is_io_error()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
        || err.is_timeout()
    {
        StoreError::Connection(err.to_string())
    } else {
        StoreError::Backend(err.to_string())
    }
}

/// Redis topology store with a bounded connection pool
pub struct RedisTopologyStore {
    pool: Vec<ConnectionManager>,
    next: AtomicUsize,
    save_script: Script,
    update_script: Script,
}

impl RedisTopologyStore {
    /// Connect `pool_size` managed connections to `url`
    pub async fn connect(url: &str, pool_size: usize) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(map_redis_err)?;
        let pool_size = pool_size.max(1);

        let mut pool = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            pool.push(
                ConnectionManager::new(client.clone())
                    .await
                    .map_err(map_redis_err)?,
            );
        }

        info!("connected to redis topology store at {} (pool={})", url, pool_size);
        Ok(Self {
            pool,
            next: AtomicUsize::new(0),
            save_script: Script::new(SAVE_SCRIPT),
            update_script: Script::new(UPDATE_SCRIPT),
        })
    }

    fn connection(&self) -> ConnectionManager {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.pool.len();
        self.pool[idx].clone()
    }
}

#[async_trait]
impl TopologyStore for RedisTopologyStore {
    async fn get_node(&self, ran_name: &str) -> Result<NodebInfo, StoreError> {
        let mut conn = self.connection();
        let (data, revision): (Option<String>, Option<u64>) = redis::cmd("HMGET")
            .arg(node_key(ran_name))
            .arg("data")
            .arg("revision")
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)?;

        let data = data.ok_or_else(|| StoreError::NotFound(ran_name.to_string()))?;
        let mut node: NodebInfo = serde_json::from_str(&data)?;
        node.revision = revision.unwrap_or(0);
        Ok(node)
    }

    async fn get_all_identities(&self) -> Result<Vec<NbIdentity>, StoreError> {
        let mut conn = self.connection();
        let values: Vec<String> = conn.hvals(IDENTITIES_KEY).await.map_err(map_redis_err)?;

        let mut identities = values
            .iter()
            .map(|raw| serde_json::from_str::<NbIdentity>(raw))
            .collect::<Result<Vec<_>, _>>()?;
        identities.sort_by(|a, b| a.inventory_name.cmp(&b.inventory_name));
        Ok(identities)
    }

    async fn save_node(&self, identity: &NbIdentity, node: &NodebInfo) -> Result<u64, StoreError> {
        let data = serde_json::to_string(node)?;
        let identity_json = serde_json::to_string(identity)?;

        let mut conn = self.connection();
        let revision: u64 = self
            .save_script
            .key(node_key(&node.ran_name))
            .key(IDENTITIES_KEY)
            .arg(data)
            .arg(&identity.inventory_name)
            .arg(identity_json)
            .invoke_async(&mut conn)
            .await
            .map_err(map_redis_err)?;

        debug!("saved node {} revision={}", node.ran_name, revision);
        Ok(revision)
    }

    async fn update_node(&self, node: &NodebInfo) -> Result<u64, StoreError> {
        let data = serde_json::to_string(node)?;

        let mut conn = self.connection();
        let (code, revision): (i64, u64) = self
            .update_script
            .key(node_key(&node.ran_name))
            .arg(data)
            .arg(node.revision)
            .invoke_async(&mut conn)
            .await
            .map_err(map_redis_err)?;

        match code {
            0 => {
                debug!("updated node {} revision={}", node.ran_name, revision);
                Ok(revision)
            }
            1 => Err(StoreError::NotFound(node.ran_name.clone())),
            _ => Err(StoreError::Conflict {
                ran_name: node.ran_name.clone(),
                expected: node.revision,
                actual: revision,
            }),
        }
    }

    async fn save_ran_load_information(
        &self,
        ran_name: &str,
        load: &RanLoadInformation,
    ) -> Result<(), StoreError> {
        let data = serde_json::to_string(load)?;
        let mut conn = self.connection();
        let _: () = conn
            .set(load_key(ran_name), data)
            .await
            .map_err(map_redis_err)?;
        debug!("saved load information for {}", ran_name);
        Ok(())
    }

    async fn get_ran_load_information(&self, ran_name: &str) -> Result<RanLoadInformation, StoreError> {
        let mut conn = self.connection();
        let data: Option<String> = conn.get(load_key(ran_name)).await.map_err(map_redis_err)?;
        let data = data.ok_or_else(|| StoreError::NotFound(ran_name.to_string()))?;
        Ok(serde_json::from_str(&data)?)
    }
}
