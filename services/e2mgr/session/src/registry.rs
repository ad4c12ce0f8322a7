//! E2 session registry.
//!
//! Correlates an outbound setup request with the response that eventually
//! arrives under the same transaction id. Completed sessions are deleted by the
//! response handlers; anything left behind is evicted once older than the
//! retention TTL.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::debug;

/// Default session retention (5 minutes)
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(300);

/// Request context captured when a setup request is sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDetails {
    /// RAN name
    pub ran_name: String,
    /// RAN IP address
    pub ran_ip: String,
    /// RAN SCTP port
    pub ran_port: u16,
}

/// In-flight session record
#[derive(Debug, Clone)]
pub struct E2SessionDetails {
    /// When the request was sent
    pub session_start: Instant,
    /// Transaction id used on the wire
    pub transaction_id: String,
    /// Original request
    pub request: RequestDetails,
}

impl E2SessionDetails {
    /// Create a session starting now
    pub fn new(transaction_id: impl Into<String>, request: RequestDetails) -> Self {
        Self {
            session_start: Instant::now(),
            transaction_id: transaction_id.into(),
            request,
        }
    }

    /// Time since the request was sent
    pub fn age(&self) -> Duration {
        self.session_start.elapsed()
    }
}

/// Concurrent session registry keyed by transaction id
#[derive(Debug, Clone)]
pub struct E2Sessions {
    sessions: Arc<DashMap<String, E2SessionDetails>>,
    ttl: Duration,
}

impl E2Sessions {
    /// Create a registry that evicts sessions older than `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Insert or replace a session
    pub fn put(&self, id: impl Into<String>, details: E2SessionDetails) -> Option<E2SessionDetails> {
        self.sessions.insert(id.into(), details)
    }

    /// Look up a session. `None` is a normal outcome for unsolicited messages.
    pub fn get(&self, id: &str) -> Option<E2SessionDetails> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Remove a session
    pub fn delete(&self, id: &str) -> Option<E2SessionDetails> {
        self.sessions.remove(id).map(|(_, details)| details)
    }

    /// Remove every session opened for `ran_name`, returning how many were removed
    pub fn delete_for_ran(&self, ran_name: &str) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, details| details.request.ran_name != ran_name);
        before.saturating_sub(self.sessions.len())
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Retention TTL
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Drop sessions older than the TTL, returning how many were removed
    pub fn evict_expired(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, details| details.age() < self.ttl);
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            debug!("evicted {} expired e2 sessions", removed);
        }
        removed
    }

    /// Periodically evict expired sessions
    pub fn start_eviction_task(&self, every: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                registry.evict_expired();
            }
        })
    }
}

impl Default for E2Sessions {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(name: &str) -> E2SessionDetails {
        E2SessionDetails::new(
            name,
            RequestDetails {
                ran_name: name.to_string(),
                ran_ip: "10.0.0.1".to_string(),
                ran_port: 36422,
            },
        )
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let sessions = E2Sessions::default();
        assert!(sessions.get("never-inserted").is_none());

        sessions.put("enb-01", details("enb-01"));
        let found = sessions.get("enb-01").unwrap();
        assert_eq!(found.request.ran_name, "enb-01");
        assert_eq!(found.transaction_id, "enb-01");

        assert!(sessions.delete("enb-01").is_some());
        assert!(sessions.get("enb-01").is_none());
        assert!(sessions.delete("enb-01").is_none());
    }

    #[tokio::test]
    async fn test_delete_for_ran_spares_other_nodes() {
        let sessions = E2Sessions::default();
        sessions.put("enb-01-1", details("enb-01"));
        sessions.put("enb-01-2", details("enb-01"));
        sessions.put("gnb-02-3", details("gnb-02"));

        assert_eq!(sessions.delete_for_ran("enb-01"), 2);
        assert_eq!(sessions.delete_for_ran("enb-01"), 0);
        assert_eq!(sessions.len(), 1);
        assert!(sessions.get("gnb-02-3").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_eviction() {
        let sessions = E2Sessions::new(Duration::from_secs(10));
        sessions.put("old", details("old"));

        tokio::time::advance(Duration::from_secs(6)).await;
        sessions.put("young", details("young"));
        assert_eq!(sessions.evict_expired(), 0);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(sessions.evict_expired(), 1);
        assert!(sessions.get("old").is_none());
        assert!(sessions.get("young").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_eviction() {
        let sessions = E2Sessions::new(Duration::from_secs(2));
        sessions.put("enb-01", details("enb-01"));
        let handle = sessions.start_eviction_task(Duration::from_secs(1));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(sessions.is_empty());
        handle.abort();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_put_get_delete() {
        let sessions = E2Sessions::default();
        let mut tasks = Vec::new();

        for worker in 0..8 {
            let sessions = sessions.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..200 {
                    let id = format!("ran-{}-{}", worker, i);
                    sessions.put(id.clone(), details(&id));
                    assert_eq!(sessions.get(&id).unwrap().request.ran_name, id);
                    if i % 2 == 0 {
                        assert!(sessions.delete(&id).is_some());
                    }
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(sessions.len(), 8 * 100);
    }
}
