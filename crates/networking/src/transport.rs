// networking/src/transport.rs

use crate::{protocol::Frame, NetworkResult, PeerId};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;

/// The raw datagram transport, assumed to already handle connection
/// management, NAT traversal and encryption. The ledger layer only ever
/// pushes frames at it.
pub trait Transport: Send + Sync {
    /// Send over an established peer connection
    fn send_to_peer(&self, peer: &PeerId, frame: &Frame) -> NetworkResult<()>;

    /// Send a connectionless datagram to an address
    fn send_unconnected(&self, addr: SocketAddr, frame: &Frame) -> NetworkResult<()>;

    /// Local-network broadcast on a port
    fn send_broadcast(&self, port: u16, frame: &Frame) -> NetworkResult<()>;
}

/// In-memory outbox standing in for the real socket layer; tests and the
/// runtime drain it to observe what would have gone on the wire.
#[derive(Default)]
pub struct OutboxTransport {
    peer_outbox: Mutex<HashMap<PeerId, Vec<Frame>>>,
    unconnected_outbox: Mutex<HashMap<SocketAddr, Vec<Frame>>>,
    broadcast_outbox: Mutex<Vec<(u16, Frame)>>,
}

impl OutboxTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain_peer(&self, peer: &PeerId) -> Vec<Frame> {
        self.peer_outbox
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(peer)
            .unwrap_or_default()
    }

    pub fn drain_unconnected(&self, addr: &SocketAddr) -> Vec<Frame> {
        self.unconnected_outbox
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(addr)
            .unwrap_or_default()
    }

    pub fn drain_broadcast(&self) -> Vec<(u16, Frame)> {
        std::mem::take(&mut *self.broadcast_outbox.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }
}

impl Transport for OutboxTransport {
    fn send_to_peer(&self, peer: &PeerId, frame: &Frame) -> NetworkResult<()> {
        self.peer_outbox
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(*peer)
            .or_default()
            .push(frame.clone());
        Ok(())
    }

    fn send_unconnected(&self, addr: SocketAddr, frame: &Frame) -> NetworkResult<()> {
        self.unconnected_outbox
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(addr)
            .or_default()
            .push(frame.clone());
        Ok(())
    }

    fn send_broadcast(&self, port: u16, frame: &Frame) -> NetworkResult<()> {
        self.broadcast_outbox
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((port, frame.clone()));
        Ok(())
    }
}
