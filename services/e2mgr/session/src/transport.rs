//! Message transport between the E2 manager and the E2 terminators.
//!
//! [`Messenger`] is the contract the core depends on. [`TcpMessenger`] carries
//! length-prefixed frames over plain TCP: inbound connections from terminators
//! are accepted on the listen address, outbound messages go to a single route
//! address over a lazily (re)established connection.

use async_trait::async_trait;
use bytes::BytesMut;
use e2mgr_wire::{encode_frame, FrameDecoder, MBuf, WireError};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info, warn};

/// Capacity of the queue between connection readers and `recv`
const INBOUND_QUEUE_CAPACITY: usize = 1024;

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    /// Transport context closed; receivers must stop
    #[error("transport closed")]
    Closed,
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Framing error
    #[error("wire error: {0}")]
    Wire(#[from] WireError),
    /// Transport not ready yet
    #[error("transport not ready")]
    NotReady,
    /// Message could not be delivered
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Message transport contract
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a message. Transports with synchronous replies may return one.
    async fn send(&self, msg: MBuf) -> Result<Option<MBuf>, TransportError>;

    /// Wait for the next inbound message
    async fn recv(&self) -> Result<MBuf, TransportError>;

    /// Whether the transport can carry traffic
    fn is_ready(&self) -> bool;

    /// Close the transport. Pending and future `recv` calls return [`TransportError::Closed`].
    async fn close(&self);
}

/// Create a TCP listener bound to the given address
pub async fn listen_tcp(addr: SocketAddr) -> tokio::io::Result<TcpListener> {
    TcpListener::bind(addr).await
}

/// Connect to a TCP address
pub async fn connect_tcp(addr: SocketAddr) -> tokio::io::Result<TcpStream> {
    TcpStream::connect(addr).await
}

/// Framed TCP transport
pub struct TcpMessenger {
    local_addr: SocketAddr,
    route_addr: SocketAddr,
    max_msg_size: usize,
    inbound_rx: Mutex<mpsc::Receiver<Result<MBuf, TransportError>>>,
    outbound: Mutex<Option<TcpStream>>,
    shutdown_tx: watch::Sender<bool>,
}

impl TcpMessenger {
    /// Bind `listen_addr` and start accepting terminator connections
    pub async fn init(
        listen_addr: SocketAddr,
        route_addr: SocketAddr,
        max_msg_size: usize,
    ) -> Result<Self, TransportError> {
        let listener = listen_tcp(listen_addr).await?;
        let local_addr = listener.local_addr()?;
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(accept_loop(listener, inbound_tx, shutdown_rx, max_msg_size));

        info!(
            "message transport listening on {} (route {}, max message {} bytes)",
            local_addr, route_addr, max_msg_size
        );

        Ok(Self {
            local_addr,
            route_addr,
            max_msg_size,
            inbound_rx: Mutex::new(inbound_rx),
            outbound: Mutex::new(None),
            shutdown_tx,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    fn is_closed(&self) -> bool {
        *self.shutdown_tx.borrow()
    }
}

async fn accept_loop(
    listener: TcpListener,
    inbound_tx: mpsc::Sender<Result<MBuf, TransportError>>,
    mut shutdown_rx: watch::Receiver<bool>,
    max_msg_size: usize,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!("accepted terminator connection from {}", peer);
                    tokio::spawn(read_connection(
                        stream,
                        peer,
                        inbound_tx.clone(),
                        shutdown_rx.clone(),
                        max_msg_size,
                    ));
                }
                Err(e) => {
                    warn!("accept failed: {}", e);
                    if inbound_tx.send(Err(TransportError::Io(e))).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
    debug!("accept loop stopped");
}

async fn read_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    inbound_tx: mpsc::Sender<Result<MBuf, TransportError>>,
    mut shutdown_rx: watch::Receiver<bool>,
    max_msg_size: usize,
) {
    let mut decoder = FrameDecoder::with_max_msg_size(max_msg_size);
    let mut buf = BytesMut::with_capacity(8 * 1024);

    loop {
        let read = tokio::select! {
            _ = shutdown_rx.changed() => break,
            read = stream.read_buf(&mut buf) => read,
        };

        match read {
            Ok(0) => {
                debug!("terminator {} closed the connection", peer);
                break;
            }
            Ok(_) => loop {
                match decoder.decode(&mut buf) {
                    Ok(Some(mbuf)) => {
                        if inbound_tx.send(Ok(mbuf)).await.is_err() {
                            return;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        // The stream cannot be resynchronised after a bad frame
                        warn!("dropping connection from {}: {}", peer, e);
                        let _ = inbound_tx.send(Err(TransportError::Wire(e))).await;
                        return;
                    }
                }
            },
            Err(e) => {
                warn!("read from {} failed: {}", peer, e);
                let _ = inbound_tx.send(Err(TransportError::Io(e))).await;
                break;
            }
        }
    }
}

#[async_trait]
impl Messenger for TcpMessenger {
    async fn send(&self, msg: MBuf) -> Result<Option<MBuf>, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let frame = encode_frame(&msg, self.max_msg_size)?;
        let mut outbound = self.outbound.lock().await;

        if outbound.is_none() {
            let stream = connect_tcp(self.route_addr).await.map_err(|e| {
                TransportError::SendFailed(format!("connect {}: {}", self.route_addr, e))
            })?;
            *outbound = Some(stream);
        }

        let Some(stream) = outbound.as_mut() else {
            return Err(TransportError::NotReady);
        };
        if let Err(e) = stream.write_all(&frame).await {
            // Reconnect on the next send
            *outbound = None;
            return Err(TransportError::SendFailed(format!("write {}: {}", self.route_addr, e)));
        }

        Ok(None)
    }

    async fn recv(&self) -> Result<MBuf, TransportError> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        if *shutdown_rx.borrow() {
            return Err(TransportError::Closed);
        }

        let mut inbound_rx = self.inbound_rx.lock().await;
        tokio::select! {
            _ = shutdown_rx.changed() => Err(TransportError::Closed),
            received = inbound_rx.recv() => received.unwrap_or(Err(TransportError::Closed)),
        }
    }

    fn is_ready(&self) -> bool {
        !self.is_closed()
    }

    async fn close(&self) {
        self.shutdown_tx.send_replace(true);
        if let Some(mut stream) = self.outbound.lock().await.take() {
            let _ = stream.shutdown().await;
        }
        info!("message transport closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use e2mgr_wire::DEFAULT_MAX_MSG_SIZE;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;

    fn any_local() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    #[tokio::test]
    async fn test_tcp_listen_connect() {
        let listener = listen_tcp(any_local()).await.unwrap();
        let bound_addr = listener.local_addr().unwrap();
        let stream = connect_tcp(bound_addr).await.unwrap();
        assert!(stream.peer_addr().is_ok());
    }

    #[tokio::test]
    async fn test_inbound_frames_are_received() {
        let route = listen_tcp(any_local()).await.unwrap();
        let messenger = TcpMessenger::init(any_local(), route.local_addr().unwrap(), DEFAULT_MAX_MSG_SIZE)
            .await
            .unwrap();

        let msg = MBuf::new(10061, "enb-01", &b"resp"[..], &b"tx"[..]);
        let mut client = connect_tcp(messenger.local_addr()).await.unwrap();
        client
            .write_all(&encode_frame(&msg, DEFAULT_MAX_MSG_SIZE).unwrap())
            .await
            .unwrap();

        assert_eq!(messenger.recv().await.unwrap(), msg);
    }

    #[tokio::test]
    async fn test_send_reaches_route_address() {
        let route = listen_tcp(any_local()).await.unwrap();
        let messenger = TcpMessenger::init(any_local(), route.local_addr().unwrap(), DEFAULT_MAX_MSG_SIZE)
            .await
            .unwrap();

        let msg = MBuf::new(10060, "enb-01", &b"req"[..], &b"enb-01"[..]);
        assert!(messenger.send(msg.clone()).await.unwrap().is_none());

        let (mut peer, _) = route.accept().await.unwrap();
        let mut buf = BytesMut::new();
        let mut decoder = FrameDecoder::new();
        let received = loop {
            if let Some(m) = decoder.decode(&mut buf).unwrap() {
                break m;
            }
            assert!(peer.read_buf(&mut buf).await.unwrap() > 0);
        };
        assert_eq!(received, msg);
    }

    #[tokio::test]
    async fn test_close_unblocks_recv() {
        let route = listen_tcp(any_local()).await.unwrap();
        let messenger = Arc::new(
            TcpMessenger::init(any_local(), route.local_addr().unwrap(), DEFAULT_MAX_MSG_SIZE)
                .await
                .unwrap(),
        );

        let receiver = {
            let messenger = messenger.clone();
            tokio::spawn(async move { messenger.recv().await })
        };
        tokio::task::yield_now().await;

        messenger.close().await;
        assert!(matches!(receiver.await.unwrap(), Err(TransportError::Closed)));
        assert!(!messenger.is_ready());
        assert!(matches!(messenger.recv().await, Err(TransportError::Closed)));
    }

    #[tokio::test]
    async fn test_send_to_unreachable_route_fails() {
        // Bind then drop to obtain a port nobody listens on
        let route_addr = listen_tcp(any_local()).await.unwrap().local_addr().unwrap();
        let messenger = TcpMessenger::init(any_local(), route_addr, DEFAULT_MAX_MSG_SIZE)
            .await
            .unwrap();

        let msg = MBuf::new(10060, "enb-01", &b"req"[..], &b""[..]);
        assert!(matches!(
            messenger.send(msg).await,
            Err(TransportError::SendFailed(_))
        ));
    }
}
