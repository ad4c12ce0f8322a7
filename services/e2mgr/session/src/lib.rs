//! E2 sessions, message transport and receive loop for the E2 manager.
//!
//! This crate provides the process-local [`E2Sessions`] registry, the
//! [`Messenger`] transport contract with a framed TCP implementation, the
//! outbound [`RmrSender`], and the [`RmrReceiver`] loop that feeds every
//! inbound message to an [`InboundSink`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use e2mgr_session::{InboundSink, Messenger, RmrReceiver, TcpMessenger};
//! use e2mgr_wire::MBuf;
//! use std::sync::Arc;
//! use tokio::sync::watch;
//!
//! struct Print;
//!
//! impl InboundSink for Print {
//!     fn accept(&self, mbuf: MBuf) -> anyhow::Result<()> {
//!         println!("got {}", mbuf);
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> anyhow::Result<()> {
//! let messenger: Arc<dyn Messenger> = Arc::new(
//!     TcpMessenger::init("0.0.0.0:3801".parse()?, "127.0.0.1:38000".parse()?, 65536).await?,
//! );
//! let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//! RmrReceiver::new(messenger, Arc::new(Print))
//!     .listen_and_handle(shutdown_rx)
//!     .await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod receiver;
pub mod registry;
pub mod sender;
pub mod transport;

// Re-export main types
pub use receiver::{InboundSink, ReceiverStats, RmrReceiver};
pub use registry::{E2SessionDetails, E2Sessions, RequestDetails, DEFAULT_SESSION_TTL};
pub use sender::RmrSender;
pub use transport::{connect_tcp, listen_tcp, Messenger, TcpMessenger, TransportError};
