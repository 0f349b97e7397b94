//! WebSocket peer link: the network transport between two devices.
//!
//! One side listens, the other connects. Each binary WebSocket message is
//! one stroke chunk. At most one peer is active at a time; further
//! connection attempts are turned away while it stays connected.
//!
//! ```text
//!  StrokeSynchronizer ──send()──► mpsc ──► writer task ──► ws sink
//!  PayloadHandler ◄── reader task ◄── ws stream
//! ```
//!
//! `send` never blocks: a full outgoing queue drops the chunk.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::codec::MAX_MESSAGE_BYTES;
use crate::transport::{PayloadHandler, PeerId, Transport, TransportError};

/// Link configuration.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Address to listen on
    pub bind_addr: String,
    /// Chunks queued for the writer task before sends start failing
    pub outgoing_capacity: usize,
    /// Largest payload accepted by `send`
    pub max_message_bytes: usize,
    /// Link events buffered for the application
    pub event_capacity: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9191".to_string(),
            outgoing_capacity: 256,
            max_message_bytes: MAX_MESSAGE_BYTES,
            event_capacity: 64,
        }
    }
}

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("A peer is already connected")]
    PeerBusy,
}

/// Connection lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Connected(PeerId),
    Disconnected(PeerId),
    /// A second peer tried to connect while one was active.
    Rejected(SocketAddr),
}

/// Link statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub connections: u64,
    pub rejected: u64,
    pub messages_sent: u64,
    pub bytes_sent: u64,
    pub messages_received: u64,
    pub bytes_received: u64,
}

#[derive(Default)]
struct AtomicLinkStats {
    connections: AtomicU64,
    rejected: AtomicU64,
    messages_sent: AtomicU64,
    bytes_sent: AtomicU64,
    messages_received: AtomicU64,
    bytes_received: AtomicU64,
}

impl AtomicLinkStats {
    fn record_sent(&self, bytes: usize) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    fn record_received(&self, bytes: usize) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    fn snapshot(&self) -> LinkStats {
        LinkStats {
            connections: self.connections.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
        }
    }
}

struct ActivePeer {
    id: PeerId,
    /// Dropping this closes the writer task and with it the socket.
    outgoing: mpsc::Sender<Vec<u8>>,
}

pub struct PeerLink {
    config: LinkConfig,
    active: Mutex<Option<ActivePeer>>,
    event_tx: mpsc::Sender<LinkEvent>,
    event_rx: Mutex<Option<mpsc::Receiver<LinkEvent>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<AtomicLinkStats>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PeerLink {
    pub fn new(config: LinkConfig) -> Arc<Self> {
        let (event_tx, event_rx) = mpsc::channel(config.event_capacity);
        Arc::new(Self {
            config,
            active: Mutex::new(None),
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
            listener: Mutex::new(None),
            stats: Arc::new(AtomicLinkStats::default()),
        })
    }

    /// Take the event receiver (can only be called once).
    pub fn take_event_rx(&self) -> Option<mpsc::Receiver<LinkEvent>> {
        lock(&self.event_rx).take()
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn stats(&self) -> LinkStats {
        self.stats.snapshot()
    }

    fn emit(&self, event: LinkEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            log::trace!("Link event dropped: {e}");
        }
    }

    /// Start accepting a peer on `config.bind_addr`.
    ///
    /// Returns the bound address (useful with port 0). The accept loop runs
    /// until [`shutdown`](Self::shutdown) or the link is dropped.
    pub async fn listen(
        self: &Arc<Self>,
        handler: Arc<dyn PayloadHandler>,
    ) -> Result<SocketAddr, LinkError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        let addr = listener.local_addr()?;
        log::info!("Peer link listening on {addr}");

        let link = Arc::downgrade(self);
        let task = tokio::spawn(Self::accept_loop(listener, link, handler));
        if let Some(previous) = lock(&self.listener).replace(task) {
            previous.abort();
        }
        Ok(addr)
    }

    async fn accept_loop(
        listener: TcpListener,
        link: Weak<Self>,
        handler: Arc<dyn PayloadHandler>,
    ) {
        loop {
            let (stream, remote) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    log::error!("Accept failed: {e}");
                    break;
                }
            };
            let Some(link) = link.upgrade() else {
                break;
            };

            if link.active_peer().is_some() {
                log::info!("Rejecting {remote}: a peer is already connected");
                link.stats.rejected.fetch_add(1, Ordering::Relaxed);
                link.emit(LinkEvent::Rejected(remote));
                continue;
            }

            log::debug!("New TCP connection from {remote}");
            let handler = handler.clone();
            tokio::spawn(async move {
                match tokio_tungstenite::accept_async(stream).await {
                    Ok(ws) => {
                        if let Err(e) = link.attach(ws, handler) {
                            log::info!("Rejecting {remote}: {e}");
                            link.stats.rejected.fetch_add(1, Ordering::Relaxed);
                            link.emit(LinkEvent::Rejected(remote));
                        }
                    }
                    Err(e) => log::warn!("WebSocket handshake with {remote} failed: {e}"),
                }
            });
        }
    }

    /// Connect to a listening peer, e.g. `ws://127.0.0.1:9191`.
    pub async fn connect(
        self: &Arc<Self>,
        url: &str,
        handler: Arc<dyn PayloadHandler>,
    ) -> Result<PeerId, LinkError> {
        if self.active_peer().is_some() {
            return Err(LinkError::PeerBusy);
        }
        let (ws, _response) = tokio_tungstenite::connect_async(url).await?;
        log::info!("Connected to {url}");
        self.attach(ws, handler)
    }

    /// Make `ws` the active peer and spawn its reader and writer tasks.
    fn attach<S>(
        self: &Arc<Self>,
        mut ws: WebSocketStream<S>,
        handler: Arc<dyn PayloadHandler>,
    ) -> Result<PeerId, LinkError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let id = PeerId::new();
        let (out_tx, mut out_rx) = mpsc::channel::<Vec<u8>>(self.config.outgoing_capacity);

        {
            let mut active = lock(&self.active);
            if active.is_some() {
                tokio::spawn(async move {
                    let _ = ws.close(None).await;
                });
                return Err(LinkError::PeerBusy);
            }
            *active = Some(ActivePeer {
                id,
                outgoing: out_tx,
            });
        }

        let (mut sink, mut stream) = ws.split();

        // Writer task: forward outgoing channel to WebSocket
        let stats = self.stats.clone();
        tokio::spawn(async move {
            while let Some(data) = out_rx.recv().await {
                let len = data.len();
                if let Err(e) = sink.send(Message::Binary(data.into())).await {
                    log::warn!("Write to peer {id} failed: {e}");
                    break;
                }
                stats.record_sent(len);
            }
            let _ = sink.close().await;
            log::debug!("Writer for peer {id} finished");
        });

        // Reader task: hand every binary message to the handler
        let stats = self.stats.clone();
        let link = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(Message::Binary(data)) => {
                        stats.record_received(data.len());
                        handler.on_payload(id, &data);
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        log::debug!("Read from peer {id} ended: {e}");
                        break;
                    }
                }
            }
            if let Some(link) = link.upgrade() {
                link.detach(id);
            }
        });

        self.stats.connections.fetch_add(1, Ordering::Relaxed);
        log::info!("Peer {id} connected");
        self.emit(LinkEvent::Connected(id));
        Ok(id)
    }

    /// Forget `id` if it is still the active peer.
    fn detach(&self, id: PeerId) {
        let mut active = lock(&self.active);
        if active.as_ref().is_some_and(|p| p.id == id) {
            *active = None;
            drop(active);
            log::info!("Peer {id} disconnected");
            self.emit(LinkEvent::Disconnected(id));
        }
    }

    /// Close the connection to the active peer, if any.
    pub fn disconnect(&self) {
        let previous = lock(&self.active).take();
        if let Some(peer) = previous {
            log::info!("Disconnecting peer {}", peer.id);
            self.emit(LinkEvent::Disconnected(peer.id));
        }
    }

    /// Stop accepting connections and drop the active peer.
    pub fn shutdown(&self) {
        if let Some(task) = lock(&self.listener).take() {
            task.abort();
        }
        self.disconnect();
    }
}

impl Drop for PeerLink {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.listener).take() {
            task.abort();
        }
    }
}

impl Transport for PeerLink {
    fn active_peer(&self) -> Option<PeerId> {
        lock(&self.active).as_ref().map(|p| p.id)
    }

    fn send(&self, peer: PeerId, payload: Vec<u8>) -> Result<(), TransportError> {
        if payload.len() > self.config.max_message_bytes {
            return Err(TransportError::PayloadTooLarge {
                len: payload.len(),
                limit: self.config.max_message_bytes,
            });
        }

        let active = lock(&self.active);
        let Some(active) = active.as_ref() else {
            return Err(TransportError::NoPeer);
        };
        if active.id != peer {
            return Err(TransportError::UnknownPeer(peer));
        }

        active.outgoing.try_send(payload).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::SendFailure("outgoing queue full".into()),
            TrySendError::Closed(_) => TransportError::ConnectionClosed,
        })
    }
}
