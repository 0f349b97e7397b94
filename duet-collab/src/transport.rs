//! Transport port: the boundary to whatever connects the two peers.
//!
//! A transport has at most one active peer. Sends are fire-and-forget:
//! `send` never waits for the peer, and a failure means the chunk is gone.

use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use uuid::Uuid;

/// Identity of a connected peer, assigned locally per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(Uuid);

impl PeerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PeerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("No peer connected")]
    NoPeer,
    #[error("Peer {0} is not the active peer")]
    UnknownPeer(PeerId),
    #[error("Payload of {len} bytes exceeds the {limit}-byte message limit")]
    PayloadTooLarge { len: usize, limit: usize },
    #[error("Send failed: {0}")]
    SendFailure(String),
    #[error("Connection closed")]
    ConnectionClosed,
}

/// Outgoing side of the peer connection.
pub trait Transport: Send + Sync {
    /// The single connected peer, if any.
    fn active_peer(&self) -> Option<PeerId>;

    /// Queue `payload` for delivery to `peer` without waiting.
    fn send(&self, peer: PeerId, payload: Vec<u8>) -> Result<(), TransportError>;
}

/// Incoming side: called once per received message.
///
/// May be invoked from any thread; implementations must not panic on bad
/// input.
pub trait PayloadHandler: Send + Sync {
    fn on_payload(&self, from: PeerId, payload: &[u8]);
}

/// Transport that keeps every sent payload in memory.
pub struct MemoryTransport {
    peer: Mutex<Option<PeerId>>,
    sent: Mutex<Vec<(PeerId, Vec<u8>)>>,
    fail_sends: Mutex<bool>,
}

impl MemoryTransport {
    /// Transport with one connected peer.
    pub fn connected() -> Self {
        Self {
            peer: Mutex::new(Some(PeerId::new())),
            sent: Mutex::new(Vec::new()),
            fail_sends: Mutex::new(false),
        }
    }

    /// Transport with no peer; every send fails with `NoPeer`.
    pub fn disconnected() -> Self {
        Self {
            peer: Mutex::new(None),
            ..Self::connected()
        }
    }

    /// Make subsequent sends fail with `SendFailure`.
    pub fn set_failing(&self, failing: bool) {
        *self.fail_sends.lock().unwrap_or_else(PoisonError::into_inner) = failing;
    }

    /// Payloads sent so far, in order.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// Drain the sent payloads.
    pub fn take_sent(&self) -> Vec<Vec<u8>> {
        let mut sent = self.sent.lock().unwrap_or_else(PoisonError::into_inner);
        sent.drain(..).map(|(_, p)| p).collect()
    }
}

impl Transport for MemoryTransport {
    fn active_peer(&self) -> Option<PeerId> {
        *self.peer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, peer: PeerId, payload: Vec<u8>) -> Result<(), TransportError> {
        match self.active_peer() {
            None => return Err(TransportError::NoPeer),
            Some(active) if active != peer => return Err(TransportError::UnknownPeer(peer)),
            Some(_) => {}
        }
        if *self.fail_sends.lock().unwrap_or_else(PoisonError::into_inner) {
            return Err(TransportError::SendFailure("simulated failure".into()));
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((peer, payload));
        Ok(())
    }
}

/// In-process link that hands each payload straight to the other side's
/// handler on the sending thread.
pub struct LoopbackTransport {
    /// Who we appear as to the receiver.
    local: PeerId,
    /// Who the receiver is, from our side.
    remote: PeerId,
    handler: Arc<dyn PayloadHandler>,
}

impl LoopbackTransport {
    pub fn new(handler: Arc<dyn PayloadHandler>) -> Self {
        Self {
            local: PeerId::new(),
            remote: PeerId::new(),
            handler,
        }
    }
}

impl Transport for LoopbackTransport {
    fn active_peer(&self) -> Option<PeerId> {
        Some(self.remote)
    }

    fn send(&self, peer: PeerId, payload: Vec<u8>) -> Result<(), TransportError> {
        if peer != self.remote {
            return Err(TransportError::UnknownPeer(peer));
        }
        self.handler.on_payload(self.local, &payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_transport_records_in_order() {
        let transport = MemoryTransport::connected();
        let peer = transport.active_peer().unwrap();
        transport.send(peer, vec![1]).unwrap();
        transport.send(peer, vec![2, 3]).unwrap();

        assert_eq!(transport.sent(), vec![vec![1], vec![2, 3]]);
        assert_eq!(transport.take_sent().len(), 2);
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn test_memory_transport_rejects_other_peer() {
        let transport = MemoryTransport::connected();
        let stranger = PeerId::new();
        assert_eq!(
            transport.send(stranger, vec![1]),
            Err(TransportError::UnknownPeer(stranger))
        );
    }

    #[test]
    fn test_disconnected_transport() {
        let transport = MemoryTransport::disconnected();
        assert!(transport.active_peer().is_none());
        assert_eq!(transport.send(PeerId::new(), vec![1]), Err(TransportError::NoPeer));
    }

    #[test]
    fn test_simulated_failure() {
        let transport = MemoryTransport::connected();
        let peer = transport.active_peer().unwrap();
        transport.set_failing(true);
        assert!(matches!(transport.send(peer, vec![1]), Err(TransportError::SendFailure(_))));
        assert!(transport.sent().is_empty());
    }

    struct Collect(Mutex<Vec<Vec<u8>>>);

    impl PayloadHandler for Collect {
        fn on_payload(&self, _from: PeerId, payload: &[u8]) {
            self.0.lock().unwrap().push(payload.to_vec());
        }
    }

    #[test]
    fn test_loopback_delivers_synchronously() {
        let sink = Arc::new(Collect(Mutex::new(Vec::new())));
        let transport = LoopbackTransport::new(sink.clone());
        let peer = transport.active_peer().unwrap();
        transport.send(peer, vec![7, 8]).unwrap();
        assert_eq!(sink.0.lock().unwrap().as_slice(), &[vec![7, 8]]);
    }
}
