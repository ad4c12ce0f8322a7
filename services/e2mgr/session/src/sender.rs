//! Outbound message sender.

use crate::transport::{Messenger, TransportError};
use e2mgr_wire::MBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Logging wrapper over the transport's send path
#[derive(Clone)]
pub struct RmrSender {
    messenger: Arc<dyn Messenger>,
}

impl RmrSender {
    /// Create a sender over `messenger`
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self { messenger }
    }

    /// Send a message, discarding any synchronous reply
    pub async fn send(&self, msg: MBuf) -> Result<(), TransportError> {
        let summary = msg.to_string();
        match self.messenger.send(msg).await {
            Ok(reply) => {
                info!("sent {}", summary);
                if let Some(reply) = reply {
                    debug!("ignoring synchronous reply {}", reply);
                }
                Ok(())
            }
            Err(e) => {
                error!("failed to send {}: {}", summary, e);
                Err(e)
            }
        }
    }
}
