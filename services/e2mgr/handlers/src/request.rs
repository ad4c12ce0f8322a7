//! Request object handed to notification handlers.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use e2mgr_wire::MBuf;
use tokio::time::Instant;

/// An inbound notification as seen by a handler
#[derive(Debug, Clone)]
pub struct NotificationRequest {
    /// RAN the message concerns (the message's meid)
    pub ran_name: String,
    /// Raw payload
    pub payload: Bytes,
    /// When the message was taken off the transport
    pub received_at: Instant,
    /// Wall clock time of `received_at`, used to stamp persisted records
    pub received_at_utc: DateTime<Utc>,
    /// Transaction id
    pub transaction_id: Bytes,
}

impl NotificationRequest {
    /// Build a request from a received message, stamped now
    pub fn from_mbuf(mbuf: MBuf) -> Self {
        Self {
            ran_name: mbuf.meid,
            payload: mbuf.payload,
            received_at: Instant::now(),
            received_at_utc: Utc::now(),
            transaction_id: mbuf.xaction,
        }
    }

    /// Transaction id as text
    pub fn transaction_id_str(&self) -> String {
        String::from_utf8_lossy(&self.transaction_id).into_owned()
    }

    /// Nanoseconds since the Unix epoch at receipt
    pub fn received_at_nanos(&self) -> u64 {
        self.received_at_utc
            .timestamp_nanos_opt()
            .and_then(|nanos| u64::try_from(nanos).ok())
            .unwrap_or_default()
    }
}
