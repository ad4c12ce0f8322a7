//! Notification dispatch.
//!
//! Each RAN gets a bounded queue drained in order by a single worker task, so
//! messages for one node are handled sequentially while different nodes
//! proceed independently. A shared semaphore caps how many handlers run at
//! once. [`NotificationManager::handle_message`] never waits: a full queue
//! drops the message. A worker left idle exits and removes its queue.

use crate::handler::NotificationHandler;
use crate::provider::NotificationHandlerProvider;
use crate::request::NotificationRequest;
use dashmap::DashMap;
use e2mgr_session::InboundSink;
use e2mgr_wire::{message_type_name, MBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tracing::{debug, error, info, warn};

/// Default per-node queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Default bound on concurrently running handlers
pub const DEFAULT_MAX_CONCURRENT_HANDLERS: usize = 256;

/// How long an idle per-node worker lingers before exiting
const WORKER_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Dispatch errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// No handler is registered for the message type
    #[error("no handler for message type {0}")]
    HandlerNotFound(i32),

    /// The node's queue is full
    #[error("queue for {0} is full")]
    QueueFull(String),

    /// The manager is shutting down
    #[error("notification manager is shutting down")]
    ShuttingDown,
}

struct Job {
    msg_type: i32,
    handler: Arc<dyn NotificationHandler>,
    request: NotificationRequest,
}

/// Routes inbound messages to their handlers
pub struct NotificationManager {
    provider: Arc<NotificationHandlerProvider>,
    queues: Arc<DashMap<String, mpsc::Sender<Job>>>,
    permits: Arc<Semaphore>,
    queue_capacity: usize,
    shutting_down: AtomicBool,
    // Every worker holds a clone; the channel closes once all have exited
    alive_tx: std::sync::Mutex<Option<mpsc::Sender<()>>>,
    alive_rx: Mutex<mpsc::Receiver<()>>,
}

impl NotificationManager {
    /// Create a manager over `provider`
    pub fn new(
        provider: Arc<NotificationHandlerProvider>,
        queue_capacity: usize,
        max_concurrent_handlers: usize,
    ) -> Self {
        let (alive_tx, alive_rx) = mpsc::channel(1);
        Self {
            provider,
            queues: Arc::new(DashMap::new()),
            permits: Arc::new(Semaphore::new(max_concurrent_handlers.max(1))),
            queue_capacity: queue_capacity.max(1),
            shutting_down: AtomicBool::new(false),
            alive_tx: std::sync::Mutex::new(Some(alive_tx)),
            alive_rx: Mutex::new(alive_rx),
        }
    }

    /// Route `mbuf` to its handler without waiting for it to be handled.
    ///
    /// Must be called from within a tokio runtime.
    pub fn handle_message(&self, mbuf: MBuf) -> Result<(), DispatchError> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(DispatchError::ShuttingDown);
        }

        let msg_type = mbuf.msg_type;
        let handler = match self.provider.get_handler(msg_type) {
            Some(handler) => handler.clone(),
            None => {
                debug!("no handler for {}", mbuf);
                return Err(DispatchError::HandlerNotFound(msg_type));
            }
        };

        let ran_name = mbuf.meid.clone();
        let mut job = Job {
            msg_type,
            handler,
            request: NotificationRequest::from_mbuf(mbuf),
        };

        // A worker that went idle closes its queue; retry once on a fresh one
        for _ in 0..2 {
            let queue = self.queue_for(&ran_name)?;
            match queue.try_send(job) {
                Ok(()) => return Ok(()),
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        "ran {}: queue full, dropping {}",
                        ran_name,
                        message_type_name(msg_type)
                    );
                    return Err(DispatchError::QueueFull(ran_name));
                }
                Err(mpsc::error::TrySendError::Closed(returned)) => {
                    self.queues
                        .remove_if(&ran_name, |_, current| current.same_channel(&queue));
                    job = returned;
                }
            }
        }
        Err(DispatchError::ShuttingDown)
    }

    fn queue_for(&self, ran_name: &str) -> Result<mpsc::Sender<Job>, DispatchError> {
        if let Some(queue) = self.queues.get(ran_name) {
            return Ok(queue.clone());
        }

        let alive = self
            .alive_tx
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
            .ok_or(DispatchError::ShuttingDown)?;

        let queue = self
            .queues
            .entry(ran_name.to_string())
            .or_insert_with(|| {
                let (tx, rx) = mpsc::channel(self.queue_capacity);
                debug!("ran {}: starting notification worker", ran_name);
                tokio::spawn(run_worker(
                    ran_name.to_string(),
                    rx,
                    self.queues.clone(),
                    self.permits.clone(),
                    alive,
                ));
                tx
            })
            .clone();
        Ok(queue)
    }

    /// Number of nodes with a live worker queue
    pub fn active_queues(&self) -> usize {
        self.queues.len()
    }

    /// Stop accepting messages, let workers drain their queues, and wait for them
    pub async fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
        if let Ok(mut guard) = self.alive_tx.lock() {
            guard.take();
        }
        self.queues.clear();

        let mut alive_rx = self.alive_rx.lock().await;
        while alive_rx.recv().await.is_some() {}
        info!("notification manager stopped");
    }
}

async fn run_worker(
    ran_name: String,
    mut rx: mpsc::Receiver<Job>,
    queues: Arc<DashMap<String, mpsc::Sender<Job>>>,
    permits: Arc<Semaphore>,
    _alive: mpsc::Sender<()>,
) {
    loop {
        let job = match tokio::time::timeout(WORKER_IDLE_TIMEOUT, rx.recv()).await {
            Ok(Some(job)) => job,
            Ok(None) => break,
            Err(_) => {
                rx.close();
                // Only this worker's queue reports closed; a replacement stays registered
                queues.remove_if(&ran_name, |_, queue| queue.is_closed());
                while let Ok(job) = rx.try_recv() {
                    run_job(&ran_name, &permits, job).await;
                }
                debug!("ran {}: notification worker idle, exiting", ran_name);
                return;
            }
        };
        run_job(&ran_name, &permits, job).await;
    }
    debug!("ran {}: notification worker stopped", ran_name);
}

async fn run_job(ran_name: &str, permits: &Arc<Semaphore>, job: Job) {
    let Ok(_permit) = permits.acquire().await else {
        return;
    };
    let name = message_type_name(job.msg_type);
    let waited = job.request.received_at.elapsed();
    match job.handler.handle(job.request).await {
        Ok(()) => debug!("ran {}: handled {} (queued {:?})", ran_name, name, waited),
        Err(e) => error!("ran {}: {} handler failed: {}", ran_name, name, e),
    }
}

impl InboundSink for NotificationManager {
    fn accept(&self, mbuf: MBuf) -> anyhow::Result<()> {
        self.handle_message(mbuf)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerError;
    use crate::test_support::{bundled_provider, node, rnib_with, RecordingMessenger};
    use async_trait::async_trait;
    use bytes::Bytes;
    use e2mgr_session::{E2SessionDetails, E2Sessions, Messenger, RequestDetails, RmrReceiver, TransportError};
    use e2mgr_storage::ConnectionStatus;
    use e2mgr_wire::{WireError, RIC_X2_SETUP_RESP};
    use std::collections::VecDeque;
    use tokio::sync::{watch, Notify};

    #[derive(Default)]
    struct RecordingHandler {
        seen: std::sync::Mutex<Vec<(String, Bytes)>>,
        gate: Option<Arc<Notify>>,
        gated_node: Option<String>,
    }

    impl RecordingHandler {
        fn seen(&self) -> Vec<(String, Bytes)> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationHandler for RecordingHandler {
        async fn handle(&self, request: NotificationRequest) -> Result<(), HandlerError> {
            if let (Some(gate), Some(node)) = (&self.gate, &self.gated_node) {
                if node == &request.ran_name {
                    gate.notified().await;
                }
            }
            // Later messages finish faster, exposing any reordering
            let delay = 10u64.saturating_sub(request.payload.first().copied().unwrap_or(0) as u64);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.seen
                .lock()
                .unwrap()
                .push((request.ran_name, request.payload));
            Ok(())
        }
    }

    fn manager_with(handler: Arc<RecordingHandler>, capacity: usize) -> NotificationManager {
        let provider = NotificationHandlerProvider::from_handlers(vec![(
            RIC_X2_SETUP_RESP,
            handler as Arc<dyn NotificationHandler>,
        )]);
        NotificationManager::new(Arc::new(provider), capacity, 8)
    }

    fn message(meid: &str, seq: u8) -> MBuf {
        MBuf::new(RIC_X2_SETUP_RESP, meid, vec![seq], &b""[..])
    }

    async fn wait_for(handler: &RecordingHandler, count: usize) {
        while handler.seen().len() < count {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    #[tokio::test]
    async fn test_unknown_type_leaves_state_untouched() {
        let rnib = rnib_with(&[node("enb-01", ConnectionStatus::Connecting)]).await;
        let sessions = E2Sessions::default();
        sessions.put(
            "enb-01",
            E2SessionDetails::new(
                "enb-01",
                RequestDetails {
                    ran_name: "enb-01".into(),
                    ran_ip: "10.0.0.1".into(),
                    ran_port: 36422,
                },
            ),
        );
        let messenger = Arc::new(RecordingMessenger::default());
        let provider = bundled_provider(rnib.clone(), sessions.clone(), messenger.clone());
        let manager = NotificationManager::new(Arc::new(provider), 10, 8);

        let result = manager.handle_message(MBuf::new(99999, "enb-01", &b"x"[..], &b""[..]));
        assert_eq!(result, Err(DispatchError::HandlerNotFound(99999)));

        assert_eq!(manager.active_queues(), 0);
        assert_eq!(sessions.len(), 1);
        let stored = rnib.get_node("enb-01").await.unwrap();
        assert_eq!(stored.revision, 1);
        assert_eq!(stored.connection_status, ConnectionStatus::Connecting);
        assert!(messenger.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_type_is_handled_every_time() {
        let handler = Arc::new(RecordingHandler::default());
        let manager = manager_with(handler.clone(), 10);

        manager.handle_message(message("enb-01", 1)).unwrap();
        manager.handle_message(message("enb-01", 1)).unwrap();
        wait_for(&handler, 2).await;
        assert_eq!(handler.seen().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_node_order_is_preserved() {
        let handler = Arc::new(RecordingHandler::default());
        let manager = manager_with(handler.clone(), 32);

        for seq in 0..10u8 {
            manager.handle_message(message("enb-01", seq)).unwrap();
            manager.handle_message(message("gnb-02", seq)).unwrap();
        }
        wait_for(&handler, 20).await;

        for ran in ["enb-01", "gnb-02"] {
            let order: Vec<u8> = handler
                .seen()
                .into_iter()
                .filter(|(name, _)| name == ran)
                .map(|(_, payload)| payload[0])
                .collect();
            assert_eq!(order, (0..10).collect::<Vec<u8>>());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_node_does_not_stall_others() {
        let gate = Arc::new(Notify::new());
        let handler = Arc::new(RecordingHandler {
            gate: Some(gate.clone()),
            gated_node: Some("slow".into()),
            ..Default::default()
        });
        let manager = manager_with(handler.clone(), 10);

        manager.handle_message(message("slow", 1)).unwrap();
        manager.handle_message(message("fast", 1)).unwrap();
        wait_for(&handler, 1).await;
        assert_eq!(handler.seen()[0].0, "fast");

        gate.notify_one();
        wait_for(&handler, 2).await;
        assert_eq!(handler.seen()[1].0, "slow");
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_queue_drops() {
        let gate = Arc::new(Notify::new());
        let handler = Arc::new(RecordingHandler {
            gate: Some(gate.clone()),
            gated_node: Some("enb-01".into()),
            ..Default::default()
        });
        let manager = manager_with(handler.clone(), 1);

        let results: Vec<_> = (0..3)
            .map(|seq| manager.handle_message(message("enb-01", seq)))
            .collect();
        assert!(results.contains(&Err(DispatchError::QueueFull("enb-01".into()))));
        assert!(results[0].is_ok());
        gate.notify_one();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_drains_and_rejects() {
        let handler = Arc::new(RecordingHandler::default());
        let manager = manager_with(handler.clone(), 10);

        manager.handle_message(message("enb-01", 1)).unwrap();
        manager.handle_message(message("enb-01", 2)).unwrap();
        manager.shutdown().await;

        assert_eq!(handler.seen().len(), 2);
        assert_eq!(
            manager.handle_message(message("enb-01", 3)),
            Err(DispatchError::ShuttingDown)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_worker_is_replaced() {
        let handler = Arc::new(RecordingHandler::default());
        let manager = manager_with(handler.clone(), 10);

        manager.handle_message(message("enb-01", 1)).unwrap();
        wait_for(&handler, 1).await;
        tokio::time::sleep(WORKER_IDLE_TIMEOUT * 2).await;

        manager.handle_message(message("enb-01", 2)).unwrap();
        wait_for(&handler, 2).await;
        assert_eq!(manager.active_queues(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_workers_release_their_queues() {
        let handler = Arc::new(RecordingHandler::default());
        let manager = manager_with(handler.clone(), 10);

        for i in 0..20u8 {
            manager
                .handle_message(message(&format!("enb-{:02}", i), 1))
                .unwrap();
        }
        wait_for(&handler, 20).await;
        assert_eq!(manager.active_queues(), 20);

        tokio::time::sleep(WORKER_IDLE_TIMEOUT * 2).await;
        assert_eq!(manager.active_queues(), 0);

        manager.handle_message(message("enb-03", 2)).unwrap();
        wait_for(&handler, 21).await;
        assert_eq!(manager.active_queues(), 1);
    }

    struct ScriptedMessenger {
        script: std::sync::Mutex<VecDeque<Result<MBuf, TransportError>>>,
    }

    #[async_trait]
    impl Messenger for ScriptedMessenger {
        async fn send(&self, _msg: MBuf) -> Result<Option<MBuf>, TransportError> {
            Ok(None)
        }

        async fn recv(&self) -> Result<MBuf, TransportError> {
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(result) => result,
                None => std::future::pending().await,
            }
        }

        fn is_ready(&self) -> bool {
            true
        }

        async fn close(&self) {}
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_loop_feeds_handlers() {
        let handler = Arc::new(RecordingHandler::default());
        let manager = Arc::new(manager_with(handler.clone(), 10));

        let mut script: VecDeque<Result<MBuf, TransportError>> = (0..3)
            .map(|_| Err(TransportError::Wire(WireError::Malformed)))
            .collect();
        script.push_back(Ok(MBuf::new(99999, "enb-01", &b""[..], &b""[..])));
        script.push_back(Ok(message("enb-01", 7)));
        let messenger = Arc::new(ScriptedMessenger {
            script: std::sync::Mutex::new(script),
        });

        let receiver = RmrReceiver::new(messenger, manager.clone());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move { receiver.listen_and_handle(shutdown_rx).await });

        wait_for(&handler, 1).await;
        assert!(!task.is_finished());

        shutdown_tx.send(true).unwrap();
        let stats = task.await.unwrap();
        assert_eq!(stats.errors, 3);
        assert_eq!(stats.received, 2);
        assert_eq!(stats.dispatched, 1);
        assert_eq!(stats.dropped, 1);
        assert_eq!(handler.seen(), vec![("enb-01".to_string(), Bytes::from_static(&[7]))]);
    }
}
