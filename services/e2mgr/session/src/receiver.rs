//! Message receive loop.
//!
//! One loop per transport endpoint. Each received message is handed to an
//! [`InboundSink`] without waiting for it to be handled. Receive errors are
//! logged and the loop carries on; it stops only on the shutdown signal or
//! when the transport reports [`TransportError::Closed`].

use crate::transport::{Messenger, TransportError};
use e2mgr_wire::MBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Non-blocking consumer of received messages
pub trait InboundSink: Send + Sync {
    /// Take ownership of a message. Must not wait for it to be handled.
    fn accept(&self, mbuf: MBuf) -> anyhow::Result<()>;
}

/// Counters reported when the loop stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Messages received from the transport
    pub received: u64,
    /// Messages the sink accepted
    pub dispatched: u64,
    /// Messages the sink rejected
    pub dropped: u64,
    /// Receive errors
    pub errors: u64,
}

/// Receive loop driver
pub struct RmrReceiver {
    messenger: Arc<dyn Messenger>,
    sink: Arc<dyn InboundSink>,
}

impl RmrReceiver {
    /// Create a receiver reading from `messenger` and feeding `sink`
    pub fn new(messenger: Arc<dyn Messenger>, sink: Arc<dyn InboundSink>) -> Self {
        Self { messenger, sink }
    }

    /// Run until `shutdown` flips to true, its sender goes away, or the transport closes
    pub async fn listen_and_handle(&self, mut shutdown: watch::Receiver<bool>) -> ReceiverStats {
        let mut stats = ReceiverStats::default();
        info!("receive loop started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    debug!("receive loop got shutdown signal");
                    break;
                }
                result = self.messenger.recv() => match result {
                    Ok(mbuf) => {
                        stats.received += 1;
                        debug!("received {}", mbuf);
                        match self.sink.accept(mbuf) {
                            Ok(()) => stats.dispatched += 1,
                            Err(e) => {
                                stats.dropped += 1;
                                warn!("dropping message: {}", e);
                            }
                        }
                    }
                    Err(TransportError::Closed) => {
                        info!("transport closed, stopping receive loop");
                        break;
                    }
                    Err(e) => {
                        stats.errors += 1;
                        error!("receive failed: {}", e);
                        tokio::task::yield_now().await;
                    }
                }
            }
        }

        info!(
            "receive loop stopped (received={}, dispatched={}, dropped={}, errors={})",
            stats.received, stats.dispatched, stats.dropped, stats.errors
        );
        stats
    }
}
