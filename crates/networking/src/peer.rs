// networking/src/peer.rs

use crate::{NetworkError, NetworkResult};
use ledger_core::{unix_now, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;

/// Peer identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId([u8; 32]);

impl PeerId {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Generate random peer ID
    pub fn random() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let bytes: [u8; 32] = rng.gen();
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Peer connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerStatus {
    Connecting,
    Connected,
    /// Known but currently offline; reachable only by unconnected sends
    Disconnected,
}

/// Peer information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerInfo {
    pub id: PeerId,
    /// Network address
    pub address: SocketAddr,
    pub status: PeerStatus,
    /// Peer's latest reported block height
    pub best_height: u64,
    pub connected_at: Timestamp,
    pub last_seen: Timestamp,
    /// Did we initiate the connection
    pub outbound: bool,
}

impl PeerInfo {
    pub fn new(id: PeerId, address: SocketAddr, outbound: bool) -> Self {
        let now = unix_now();
        Self {
            id,
            address,
            status: PeerStatus::Connecting,
            best_height: 0,
            connected_at: now,
            last_seen: now,
            outbound,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == PeerStatus::Connected
    }

    pub fn update_last_seen(&mut self) {
        self.last_seen = unix_now();
    }
}

/// Tracks every peer we know about, connected or not.
pub struct PeerManager {
    peers: HashMap<PeerId, PeerInfo>,
    max_peers: usize,
}

impl PeerManager {
    pub fn new(max_peers: usize) -> Self {
        Self {
            peers: HashMap::new(),
            max_peers,
        }
    }

    pub fn add_peer(&mut self, peer: PeerInfo) -> NetworkResult<()> {
        if self.peers.len() >= self.max_peers {
            return Err(NetworkError::PeerError("Maximum peers reached".into()));
        }
        self.peers.insert(peer.id, peer);
        Ok(())
    }

    pub fn remove_peer(&mut self, peer_id: &PeerId) -> Option<PeerInfo> {
        self.peers.remove(peer_id)
    }

    pub fn get_peer(&self, peer_id: &PeerId) -> Option<&PeerInfo> {
        self.peers.get(peer_id)
    }

    pub fn get_peer_mut(&mut self, peer_id: &PeerId) -> Option<&mut PeerInfo> {
        self.peers.get_mut(peer_id)
    }

    /// All currently connected peers
    pub fn connected_peers(&self) -> Vec<&PeerInfo> {
        self.peers.values().filter(|p| p.is_connected()).collect()
    }

    /// Addresses of known-but-offline peers, the broadcast audience
    pub fn disconnected_addrs(&self) -> Vec<SocketAddr> {
        self.peers
            .values()
            .filter(|p| !p.is_connected())
            .map(|p| p.address)
            .collect()
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn connected_count(&self) -> usize {
        self.connected_peers().len()
    }

    pub fn update_status(&mut self, peer_id: &PeerId, status: PeerStatus) -> NetworkResult<()> {
        let peer = self
            .peers
            .get_mut(peer_id)
            .ok_or_else(|| NetworkError::PeerError("Peer not found".into()))?;
        peer.status = status;
        Ok(())
    }

    pub fn update_best_height(&mut self, peer_id: &PeerId, height: u64) -> NetworkResult<()> {
        let peer = self
            .peers
            .get_mut(peer_id)
            .ok_or_else(|| NetworkError::PeerError("Peer not found".into()))?;
        peer.best_height = height;
        peer.update_last_seen();
        Ok(())
    }

    /// Best connected peer to catch up from
    pub fn best_peer(&self) -> Option<&PeerInfo> {
        self.connected_peers()
            .into_iter()
            .max_by_key(|p| p.best_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn test_peer(port: u16, outbound: bool) -> PeerInfo {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port);
        PeerInfo::new(PeerId::random(), addr, outbound)
    }

    #[test]
    fn test_peer_manager_add_and_get() {
        let mut manager = PeerManager::new(100);
        let peer = test_peer(8080, true);
        let peer_id = peer.id;

        manager.add_peer(peer).unwrap();
        assert_eq!(manager.peer_count(), 1);
        assert!(manager.get_peer(&peer_id).is_some());
    }

    #[test]
    fn test_max_peers_limit() {
        let mut manager = PeerManager::new(2);
        manager.add_peer(test_peer(1, true)).unwrap();
        manager.add_peer(test_peer(2, false)).unwrap();

        assert!(manager.add_peer(test_peer(3, true)).is_err());
    }

    #[test]
    fn test_connected_and_disconnected_split() {
        let mut manager = PeerManager::new(100);
        let mut online = test_peer(1, true);
        online.status = PeerStatus::Connected;
        let offline = test_peer(2, true);
        let offline_addr = offline.address;

        manager.add_peer(online).unwrap();
        manager.add_peer(offline).unwrap();

        assert_eq!(manager.connected_count(), 1);
        assert_eq!(manager.disconnected_addrs(), vec![offline_addr]);
    }

    #[test]
    fn test_best_peer_by_height() {
        let mut manager = PeerManager::new(100);
        let mut a = test_peer(1, true);
        a.status = PeerStatus::Connected;
        a.best_height = 100;
        let mut b = test_peer(2, true);
        b.status = PeerStatus::Connected;
        b.best_height = 200;
        let b_id = b.id;

        manager.add_peer(a).unwrap();
        manager.add_peer(b).unwrap();

        assert_eq!(manager.best_peer().unwrap().id, b_id);
    }
}
