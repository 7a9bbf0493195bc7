// networking/src/propagate.rs

use crate::{
    correlator::PeerCorrelator,
    peer::PeerManager,
    protocol::{
        Frame, MessageKind, NewBlockMessage, StakeAnnounceMessage, TransactionMessage,
    },
    NetworkResult,
};
use consensus::Stake;
use ledger_core::{Block, Transaction};
use std::sync::{Arc, RwLock};

/// Sends newly committed blocks (and stake/transaction announcements) to
/// known peers.
///
/// Every dispatch goes through the correlator so a slow or unreachable
/// peer can never stall block creation: connected peers get a correlated
/// request whose acknowledgement is awaited in the background, offline
/// peers get a fire-and-forget unconnected send.
pub struct Propagator {
    correlator: Arc<PeerCorrelator>,
    peers: Arc<RwLock<PeerManager>>,
}

impl Propagator {
    pub fn new(correlator: Arc<PeerCorrelator>, peers: Arc<RwLock<PeerManager>>) -> Self {
        Self { correlator, peers }
    }

    /// Send a committed block to every known peer. Single-shot: retry
    /// policy, if any, belongs to the caller.
    pub fn propagate_block(&self, block: &Block) -> NetworkResult<()> {
        let frame = Frame::encode(
            MessageKind::NewBlock,
            &NewBlockMessage {
                block: block.clone(),
            },
        )?;
        let height = block.height;
        self.dispatch(frame, MessageKind::BlockAck, move |peer, acked| {
            tracing::debug!(height, peer = %peer, acked, "block propagation settled");
        });
        Ok(())
    }

    /// Fire-and-forget stake announcement
    pub fn broadcast_stake(&self, stake: &Stake) -> NetworkResult<()> {
        let frame = Frame::encode(
            MessageKind::StakeAnnounce,
            &StakeAnnounceMessage {
                stake: stake.clone(),
            },
        )?;
        self.dispatch(frame, MessageKind::StakeAck, |peer, acked| {
            tracing::debug!(peer = %peer, acked, "stake announcement settled");
        });
        Ok(())
    }

    /// Fire-and-forget transaction announcement
    pub fn broadcast_transaction(&self, transaction: &Transaction) -> NetworkResult<()> {
        let frame = Frame::encode(
            MessageKind::TxAnnounce,
            &TransactionMessage {
                transaction: transaction.clone(),
            },
        )?;
        self.dispatch(frame, MessageKind::TxAck, |peer, acked| {
            tracing::debug!(peer = %peer, acked, "transaction announcement settled");
        });
        Ok(())
    }

    fn dispatch<F>(&self, frame: Frame, expect: MessageKind, on_settled: F)
    where
        F: Fn(String, bool) + Send + Sync + Clone + 'static,
    {
        let (connected, offline) = {
            let peers = self
                .peers
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let connected: Vec<_> = peers.connected_peers().iter().map(|p| p.id).collect();
            (connected, peers.disconnected_addrs())
        };

        for peer in connected {
            let settled = on_settled.clone();
            let result = self.correlator.request(
                &peer,
                frame.clone(),
                expect,
                Box::new(move |response| settled(peer.to_hex(), response.is_some())),
            );
            if let Err(e) = result {
                tracing::warn!(peer = %peer.to_hex(), error = %e, "correlated send failed");
            }
        }

        for addr in offline {
            let settled = on_settled.clone();
            let result = self.correlator.request_unconnected(
                addr,
                frame.clone(),
                expect,
                Box::new(move |response| settled(addr.to_string(), response.is_some())),
            );
            if let Err(e) = result {
                tracing::warn!(%addr, error = %e, "unconnected send failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::{PeerId, PeerInfo, PeerStatus};
    use crate::transport::OutboxTransport;
    use ledger_core::BLOCK_VERSION;

    fn sample_block() -> Block {
        let mut block = Block {
            version: BLOCK_VERSION,
            height: 2,
            time_stamp: 1_700_000_000,
            prev_hash: ledger_crypto::hash("prev"),
            hash: String::new(),
            transactions: "[]".into(),
            validator: "0xvalidator".into(),
            validator_balance: "{}".into(),
            merkle_root: String::new(),
            num_of_tx: 0,
            total_amount: "{}".into(),
            total_reward: 0.0,
            difficulty: 1,
            nonce: 1,
            proof: 1,
            size: 0,
            build_time: 0,
            signature: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    #[test]
    fn test_block_reaches_connected_and_offline_peers() {
        let transport = Arc::new(OutboxTransport::new());
        let correlator = Arc::new(PeerCorrelator::new(transport.clone()));
        let peers = Arc::new(RwLock::new(PeerManager::new(10)));

        let mut online = PeerInfo::new(PeerId::random(), "127.0.0.1:9000".parse().unwrap(), true);
        online.status = PeerStatus::Connected;
        let online_id = online.id;
        let offline = PeerInfo::new(PeerId::random(), "127.0.0.1:9001".parse().unwrap(), true);
        let offline_addr = offline.address;

        {
            let mut manager = peers.write().unwrap();
            manager.add_peer(online).unwrap();
            manager.add_peer(offline).unwrap();
        }

        let propagator = Propagator::new(correlator, peers);
        propagator.propagate_block(&sample_block()).unwrap();

        let to_online = transport.drain_peer(&online_id);
        assert_eq!(to_online.len(), 1);
        assert_eq!(to_online[0].kind, MessageKind::NewBlock);

        let to_offline = transport.drain_unconnected(&offline_addr);
        assert_eq!(to_offline.len(), 1);
        assert_eq!(to_offline[0].kind, MessageKind::NewBlock);
    }

    #[test]
    fn test_repeat_propagation_to_same_offline_peer_is_suppressed() {
        let transport = Arc::new(OutboxTransport::new());
        let correlator = Arc::new(PeerCorrelator::new(transport.clone()));
        let peers = Arc::new(RwLock::new(PeerManager::new(10)));

        let offline = PeerInfo::new(PeerId::random(), "127.0.0.1:9001".parse().unwrap(), true);
        let offline_addr = offline.address;
        peers.write().unwrap().add_peer(offline).unwrap();

        let propagator = Propagator::new(correlator, peers);
        let block = sample_block();
        propagator.propagate_block(&block).unwrap();
        // Same expected response kind, still pending: the duplicate send
        // is swallowed by the correlator.
        propagator.propagate_block(&block).unwrap();

        assert_eq!(transport.drain_unconnected(&offline_addr).len(), 1);
    }
}
