// networking/src/correlator.rs

use crate::{
    protocol::{Frame, MessageKind},
    transport::Transport,
    NetworkResult, PeerId, CONNECTED_REQUEST_TIMEOUT, UNCONNECTED_RESPONSE_TIMEOUT,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

/// Invoked exactly once per request: with the matched response frame, or
/// with `None` after a timeout, disconnect or shutdown. Callers never hang.
pub type ResponseCallback = Box<dyn FnOnce(Option<Frame>) + Send + 'static>;

struct PendingEntry {
    expect: MessageKind,
    callback: ResponseCallback,
    issued: Instant,
}

/// Inbound requests that survived response correlation: a peer is asking us
/// for something and expects a reply.
#[async_trait::async_trait]
pub trait InboundHandler: Send + Sync {
    async fn handle_peer_request(&self, peer: PeerId, frame: Frame);
    async fn handle_unconnected_request(&self, remote: SocketAddr, frame: Frame);
}

/// Matches outbound peer messages to their eventual responses (or
/// timeouts), for both connection-oriented and connectionless peers.
///
/// Receive processing is an explicit two-stage pipeline: stage one consumes
/// a matching pending entry, and only unmatched frames fall through to the
/// inbound-request handler, so a frame can never satisfy both stages.
///
/// Locking is per key: the outer maps are only written when a peer or
/// address first appears, so unrelated peers' traffic never contends on a
/// shared lock.
pub struct PeerCorrelator {
    transport: Arc<dyn Transport>,
    connected: RwLock<HashMap<PeerId, Arc<Mutex<Vec<PendingEntry>>>>>,
    unconnected: RwLock<HashMap<SocketAddr, Arc<Mutex<Vec<PendingEntry>>>>>,
}

impl PeerCorrelator {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            connected: RwLock::new(HashMap::new()),
            unconnected: RwLock::new(HashMap::new()),
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    fn connected_slot(&self, peer: &PeerId) -> Arc<Mutex<Vec<PendingEntry>>> {
        if let Some(slot) = self
            .connected
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(peer)
        {
            return slot.clone();
        }
        self.connected
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(*peer)
            .or_default()
            .clone()
    }

    fn unconnected_slot(&self, addr: &SocketAddr) -> Arc<Mutex<Vec<PendingEntry>>> {
        if let Some(slot) = self
            .unconnected
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(addr)
        {
            return slot.clone();
        }
        self.unconnected
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(*addr)
            .or_default()
            .clone()
    }

    /// Send `frame` to a connected peer and register a callback for the
    /// response of kind `expect`.
    ///
    /// A request of the same kind already pending for this peer refuses the
    /// new send (logged, no duplicate on the wire); returns whether the
    /// request was issued. Still-pending entries fire the timeout sentinel
    /// after the fixed deadline.
    pub fn request(
        self: &Arc<Self>,
        peer: &PeerId,
        frame: Frame,
        expect: MessageKind,
        callback: ResponseCallback,
    ) -> NetworkResult<bool> {
        let slot = self.connected_slot(peer);
        {
            let mut entries = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if entries.iter().any(|e| e.expect == expect) {
                tracing::warn!(
                    peer = %peer.to_hex(),
                    kind = ?expect,
                    "request of this kind already awaiting a response, not re-sending"
                );
                return Ok(false);
            }
            entries.push(PendingEntry {
                expect,
                callback,
                issued: Instant::now(),
            });
        }

        if let Err(e) = self.transport.send_to_peer(peer, &frame) {
            // The entry we just registered must not outlive the failed send.
            if let Some(entry) = self.take_entry(&slot, expect) {
                (entry.callback)(None);
            }
            return Err(e);
        }

        // Fire the sentinel if the response never arrives. Outside a
        // runtime (sync unit tests) expiry falls to disconnect/shutdown.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let correlator = self.clone();
            let peer = *peer;
            handle.spawn(async move {
                tokio::time::sleep(CONNECTED_REQUEST_TIMEOUT).await;
                correlator.expire_connected(&peer, expect);
            });
        }

        Ok(true)
    }

    /// Send `frame` to an unconnected address and register a callback keyed
    /// by (address, kind, issue time).
    ///
    /// A send is suppressed while a prior same-kind entry is younger than
    /// the response timeout; entries past the timeout are purged lazily
    /// here, firing their sentinel.
    pub fn request_unconnected(
        self: &Arc<Self>,
        addr: SocketAddr,
        frame: Frame,
        expect: MessageKind,
        callback: ResponseCallback,
    ) -> NetworkResult<bool> {
        let slot = self.unconnected_slot(&addr);
        {
            let mut entries = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

            let mut expired = Vec::new();
            let mut i = 0;
            while i < entries.len() {
                if entries[i].expect == expect
                    && entries[i].issued.elapsed() > UNCONNECTED_RESPONSE_TIMEOUT
                {
                    expired.push(entries.remove(i));
                } else {
                    i += 1;
                }
            }
            for entry in expired {
                tracing::debug!(%addr, kind = ?expect, "purging expired unconnected entry");
                (entry.callback)(None);
            }

            if entries.iter().any(|e| e.expect == expect) {
                tracing::warn!(
                    %addr,
                    kind = ?expect,
                    "unconnected request of this kind still pending, not re-sending"
                );
                return Ok(false);
            }
            entries.push(PendingEntry {
                expect,
                callback,
                issued: Instant::now(),
            });
        }

        if let Err(e) = self.transport.send_unconnected(addr, &frame) {
            if let Some(entry) = self.take_entry(&slot, expect) {
                (entry.callback)(None);
            }
            return Err(e);
        }

        Ok(true)
    }

    fn take_entry(
        &self,
        slot: &Arc<Mutex<Vec<PendingEntry>>>,
        expect: MessageKind,
    ) -> Option<PendingEntry> {
        let mut entries = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries
            .iter()
            .position(|e| e.expect == expect)
            .map(|i| entries.remove(i))
    }

    fn expire_connected(&self, peer: &PeerId, expect: MessageKind) {
        let Some(slot) = self
            .connected
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(peer)
            .cloned()
        else {
            return;
        };
        if let Some(entry) = self.take_entry(&slot, expect) {
            tracing::warn!(peer = %peer.to_hex(), kind = ?expect, "request timed out");
            (entry.callback)(None);
        }
    }

    /// Stage one for connected peers: consume a pending entry matching the
    /// frame kind. Returns the frame back when nothing matched, so the
    /// caller can route it as an inbound request.
    pub fn match_peer_response(&self, peer: &PeerId, frame: Frame) -> Option<Frame> {
        let slot = self
            .connected
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(peer)
            .cloned();
        if let Some(slot) = slot {
            if let Some(entry) = self.take_entry(&slot, frame.kind) {
                tracing::debug!(peer = %peer.to_hex(), kind = ?frame.kind, "response correlated");
                (entry.callback)(Some(frame));
                return None;
            }
        }
        Some(frame)
    }

    /// Stage one for unconnected peers: strict (address, kind) match.
    /// Unmatched frames are logged and handed back for request dispatch.
    pub fn match_unconnected_response(&self, addr: &SocketAddr, frame: Frame) -> Option<Frame> {
        let slot = self
            .unconnected
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(addr)
            .cloned();
        if let Some(slot) = slot {
            if let Some(entry) = self.take_entry(&slot, frame.kind) {
                tracing::debug!(%addr, kind = ?frame.kind, "unconnected response correlated");
                (entry.callback)(Some(frame));
                return None;
            }
        }
        tracing::debug!(%addr, kind = ?frame.kind, "unsolicited or timed-out unconnected frame");
        Some(frame)
    }

    /// The full two-stage receive pipeline for a connected peer.
    pub async fn demux_peer(&self, peer: PeerId, frame: Frame, handler: &dyn InboundHandler) {
        if let Some(frame) = self.match_peer_response(&peer, frame) {
            handler.handle_peer_request(peer, frame).await;
        }
    }

    /// The full two-stage receive pipeline for an unconnected datagram.
    pub async fn demux_unconnected(
        &self,
        remote: SocketAddr,
        frame: Frame,
        handler: &dyn InboundHandler,
    ) {
        if let Some(frame) = self.match_unconnected_response(&remote, frame) {
            handler.handle_unconnected_request(remote, frame).await;
        }
    }

    /// A peer went away: every callback still pending for it fires the
    /// sentinel exactly once.
    pub fn peer_disconnected(&self, peer: &PeerId) {
        let slot = self
            .connected
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(peer);
        if let Some(slot) = slot {
            let entries = std::mem::take(
                &mut *slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()),
            );
            for entry in entries {
                tracing::debug!(peer = %peer.to_hex(), kind = ?entry.expect, "disconnect sentinel");
                (entry.callback)(None);
            }
        }
    }

    /// Shutdown: drain both tables, firing every pending callback once.
    pub fn shutdown(&self) {
        let connected: Vec<_> = self
            .connected
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain()
            .collect();
        for (_, slot) in connected {
            let entries = std::mem::take(
                &mut *slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()),
            );
            for entry in entries {
                (entry.callback)(None);
            }
        }

        let unconnected: Vec<_> = self
            .unconnected
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain()
            .collect();
        for (_, slot) in unconnected {
            let entries = std::mem::take(
                &mut *slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()),
            );
            for entry in entries {
                (entry.callback)(None);
            }
        }

        tracing::info!("correlator drained");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::AckMessage;
    use crate::transport::OutboxTransport;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fixture() -> (Arc<PeerCorrelator>, Arc<OutboxTransport>) {
        let transport = Arc::new(OutboxTransport::new());
        let correlator = Arc::new(PeerCorrelator::new(transport.clone()));
        (correlator, transport)
    }

    fn ack_frame() -> Frame {
        Frame::encode(MessageKind::BlockAck, &AckMessage::ok()).unwrap()
    }

    fn counting_callback(counter: Arc<AtomicUsize>) -> ResponseCallback {
        Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_duplicate_same_kind_request_is_refused() {
        let (correlator, transport) = fixture();
        let peer = PeerId::random();

        let sent = correlator
            .request(&peer, ack_frame(), MessageKind::BlockAck, Box::new(|_| {}))
            .unwrap();
        assert!(sent);

        // Same peer, same expected kind, first not yet resolved: no-op.
        let sent = correlator
            .request(&peer, ack_frame(), MessageKind::BlockAck, Box::new(|_| {}))
            .unwrap();
        assert!(!sent);
        assert_eq!(transport.drain_peer(&peer).len(), 1);
    }

    #[test]
    fn test_response_consumes_entry_and_fires_callback() {
        let (correlator, _) = fixture();
        let peer = PeerId::random();
        let fired = Arc::new(AtomicUsize::new(0));

        correlator
            .request(
                &peer,
                ack_frame(),
                MessageKind::BlockAck,
                counting_callback(fired.clone()),
            )
            .unwrap();

        // Matching response: consumed, never reaches request dispatch.
        assert!(correlator.match_peer_response(&peer, ack_frame()).is_none());
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // A second identical frame is no longer correlated.
        assert!(correlator.match_peer_response(&peer, ack_frame()).is_some());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disconnect_fires_sentinel_exactly_once() {
        let (correlator, _) = fixture();
        let peer = PeerId::random();
        let fired = Arc::new(AtomicUsize::new(0));

        correlator
            .request(
                &peer,
                ack_frame(),
                MessageKind::BlockAck,
                counting_callback(fired.clone()),
            )
            .unwrap();

        correlator.peer_disconnected(&peer);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // Neither a late response nor a second disconnect can re-fire it.
        correlator.peer_disconnected(&peer);
        assert!(correlator.match_peer_response(&peer, ack_frame()).is_some());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unconnected_suppression_within_timeout() {
        let (correlator, transport) = fixture();
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();

        let sent = correlator
            .request_unconnected(addr, ack_frame(), MessageKind::BlockAck, Box::new(|_| {}))
            .unwrap();
        assert!(sent);

        let sent = correlator
            .request_unconnected(addr, ack_frame(), MessageKind::BlockAck, Box::new(|_| {}))
            .unwrap();
        assert!(!sent);
        assert_eq!(transport.drain_unconnected(&addr).len(), 1);
    }

    #[test]
    fn test_unconnected_response_strict_address_match() {
        let (correlator, _) = fixture();
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let other: SocketAddr = "127.0.0.1:9001".parse().unwrap();
        let fired = Arc::new(AtomicUsize::new(0));

        correlator
            .request_unconnected(
                addr,
                ack_frame(),
                MessageKind::BlockAck,
                counting_callback(fired.clone()),
            )
            .unwrap();

        // A frame from a different address never matches this entry.
        assert!(correlator
            .match_unconnected_response(&other, ack_frame())
            .is_some());
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        assert!(correlator
            .match_unconnected_response(&addr, ack_frame())
            .is_none());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_shutdown_drains_everything_once() {
        let (correlator, _) = fixture();
        let peer = PeerId::random();
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let fired = Arc::new(AtomicUsize::new(0));

        correlator
            .request(
                &peer,
                ack_frame(),
                MessageKind::BlockAck,
                counting_callback(fired.clone()),
            )
            .unwrap();
        correlator
            .request_unconnected(
                addr,
                ack_frame(),
                MessageKind::StakeAck,
                counting_callback(fired.clone()),
            )
            .unwrap();

        correlator.shutdown();
        assert_eq!(fired.load(Ordering::SeqCst), 2);

        correlator.shutdown();
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_connected_request_times_out_with_sentinel() {
        tokio::time::pause();
        let (correlator, _) = fixture();
        let peer = PeerId::random();
        let fired = Arc::new(AtomicUsize::new(0));

        correlator
            .request(
                &peer,
                ack_frame(),
                MessageKind::BlockAck,
                counting_callback(fired.clone()),
            )
            .unwrap();

        tokio::time::advance(CONNECTED_REQUEST_TIMEOUT + std::time::Duration::from_secs(1)).await;
        // Let the spawned expiry task run.
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        // Late response after expiry: nothing left to consume.
        assert!(correlator.match_peer_response(&peer, ack_frame()).is_some());
    }
}
