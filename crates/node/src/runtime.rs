// node/src/runtime.rs
use crate::NodeConfig;
use async_trait::async_trait;
use consensus::{
    LotteryHooks, Stake, StakeLottery, StakeRegistry,
};
use ledger_core::{
    Block, BlockBuilder, ChainState, ChainValidator, GenesisAccount, Transaction, CATCHUP_PAGE,
};
use ledger_crypto::{KeyPair, Signer};
use networking::{
    AckMessage, BlockRangeRequest, BlockRangeResponse, Frame, InboundHandler, MessageKind,
    NewBlockMessage, OutboxTransport, PeerCorrelator, PeerId, PeerManager, Propagator,
    StakeAnnounceMessage, TransactionMessage, Transport,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

/// Lottery side effects routed into the propagation layer.
struct PropagationHooks {
    propagator: Arc<Propagator>,
}

#[async_trait]
impl LotteryHooks for PropagationHooks {
    async fn stake_pledged(&self, stake: &Stake) {
        if let Err(e) = self.propagator.broadcast_stake(stake) {
            tracing::warn!(error = %e, "stake broadcast failed");
        }
    }

    async fn block_sealed(&self, block: &Block) {
        if let Err(e) = self.propagator.propagate_block(block) {
            tracing::warn!(error = %e, "block propagation failed");
        }
    }
}

/// The assembled node: one writer-locked chain state, the per-epoch stake
/// registry, the correlator over the transport, and the lottery loop.
pub struct Node {
    config: NodeConfig,
    signer: Arc<dyn Signer>,
    state: Arc<RwLock<ChainState>>,
    registry: Arc<RwLock<StakeRegistry>>,
    validator: ChainValidator,
    transport: Arc<dyn Transport>,
    correlator: Arc<PeerCorrelator>,
    peers: Arc<std::sync::RwLock<PeerManager>>,
    propagator: Arc<Propagator>,
    shutdown: watch::Sender<bool>,
}

impl Node {
    /// Wire the node against the in-memory transport shim; the game client
    /// injects its UDP host through `with_transport`.
    pub fn new(config: NodeConfig, keypair: KeyPair) -> Self {
        Self::with_transport(config, keypair, Arc::new(OutboxTransport::new()))
    }

    pub fn with_transport(
        config: NodeConfig,
        keypair: KeyPair,
        transport: Arc<dyn Transport>,
    ) -> Self {
        tracing::info!("initializing node components");

        let signer: Arc<dyn Signer> = Arc::new(keypair);
        let state = Arc::new(RwLock::new(ChainState::new()));
        let registry = Arc::new(RwLock::new(StakeRegistry::new()));
        let correlator = Arc::new(PeerCorrelator::new(transport.clone()));
        let peers = Arc::new(std::sync::RwLock::new(PeerManager::new(
            config.network.max_peers,
        )));
        let propagator = Arc::new(Propagator::new(correlator.clone(), peers.clone()));
        let (shutdown, _) = watch::channel(false);

        tracing::info!(address = %signer.address(), "node components initialized");

        Self {
            config,
            signer,
            state,
            registry,
            validator: ChainValidator::new(),
            transport,
            correlator,
            peers,
            propagator,
            shutdown,
        }
    }

    pub fn local_address(&self) -> String {
        self.signer.address()
    }

    pub fn state(&self) -> &Arc<RwLock<ChainState>> {
        &self.state
    }

    pub fn peers(&self) -> &Arc<std::sync::RwLock<PeerManager>> {
        &self.peers
    }

    pub fn correlator(&self) -> &Arc<PeerCorrelator> {
        &self.correlator
    }

    /// Build the genesis block unless the chain already has one.
    pub async fn ensure_genesis(&self, accounts: Vec<GenesisAccount>) -> anyhow::Result<()> {
        let mut state = self.state.write().await;
        if state.has_genesis() {
            tracing::info!(height = state.chain.head().map(|b| b.height).unwrap_or(0),
                "chain already initialized");
            return Ok(());
        }
        let builder = BlockBuilder::new(self.signer.clone());
        let block =
            builder.build_genesis(&mut state, &accounts, ledger_core::GENESIS_TIMESTAMP)?;
        tracing::info!(hash = %block.hash, "genesis created");
        Ok(())
    }

    /// Start the background lottery loop.
    pub async fn start(self: &Arc<Self>) -> anyhow::Result<()> {
        if self.config.lottery.enabled {
            let lottery = Arc::new(StakeLottery::new(
                consensus::LotteryConfig {
                    min_pool_len: self.config.lottery.min_pool_len,
                    min_stakers: self.config.lottery.min_stakers,
                },
                self.state.clone(),
                self.registry.clone(),
                BlockBuilder::new(self.signer.clone()),
                self.signer.address(),
                Arc::new(PropagationHooks {
                    propagator: self.propagator.clone(),
                }),
            ));
            let rx = self.shutdown.subscribe();
            tokio::spawn(async move { lottery.run(rx).await });
            tracing::info!("lottery loop started");
        }

        tracing::info!(listen = %self.config.network.listen_addr, "node is operational");
        Ok(())
    }

    /// Signal every background task and drain the correlator so no pending
    /// callback is left hanging.
    pub async fn stop(&self) {
        tracing::info!("shutting down node");
        let _ = self.shutdown.send(true);
        self.correlator.shutdown();
        tracing::info!("node shutdown complete");
    }

    /// Accept a locally created transaction: well-formed, properly signed,
    /// covered by the sender's balance; then pool and announce it.
    pub async fn submit_transaction(&self, tx: Transaction) -> anyhow::Result<()> {
        tx.validate_basic()?;
        if !tx.verify_signature()? {
            anyhow::bail!("transaction signature does not verify");
        }

        {
            let mut state = self.state.write().await;
            let balance = state
                .ledger
                .get(&tx.sender)
                .map(|account| account.balance())
                .unwrap_or(0.0);
            let needed = tx.storage_item.amount() + tx.fee;
            if needed > balance {
                anyhow::bail!("sender balance {balance} cannot cover {needed}");
            }
            state.pool.add(tx.clone())?;
        }

        if let Err(e) = self.propagator.broadcast_transaction(&tx) {
            tracing::warn!(error = %e, "transaction announcement failed");
        }
        tracing::info!(hash = %tx.hash, "transaction pooled");
        Ok(())
    }

    /// Ask a peer for the blocks above our head; the response is applied in
    /// the background when (and if) it arrives.
    pub async fn request_catchup(&self, peer: &PeerId) -> anyhow::Result<bool> {
        let from_height = self
            .state
            .read()
            .await
            .chain
            .head()
            .map(|b| b.height + 1)
            .unwrap_or(1);

        let frame = Frame::encode(
            MessageKind::BlockRangeRequest,
            &BlockRangeRequest {
                from_height,
                count: CATCHUP_PAGE as u32,
            },
        )?;

        let (tx, rx) = tokio::sync::oneshot::channel();
        let issued = self.correlator.request(
            peer,
            frame,
            MessageKind::BlockRangeResponse,
            Box::new(move |response| {
                let _ = tx.send(response);
            }),
        )?;
        if !issued {
            return Ok(false);
        }

        let state = self.state.clone();
        tokio::spawn(async move {
            match rx.await {
                Ok(Some(frame)) => match frame.decode::<BlockRangeResponse>() {
                    Ok(message) => {
                        let mut guard = state.write().await;
                        let applied =
                            ChainValidator::new().validate_and_apply_batch(&mut guard, message.blocks);
                        tracing::info!(applied, "catch-up batch processed");
                    }
                    Err(e) => tracing::warn!(error = %e, "bad catch-up payload"),
                },
                _ => tracing::warn!("catch-up request timed out"),
            }
        });
        Ok(true)
    }

    /// Transport receive entry point for an established peer connection.
    pub async fn deliver_peer_frame(&self, peer: PeerId, frame: Frame) {
        self.correlator.demux_peer(peer, frame, self).await;
    }

    /// Transport receive entry point for connectionless datagrams.
    pub async fn deliver_unconnected_frame(&self, remote: SocketAddr, frame: Frame) {
        self.correlator.demux_unconnected(remote, frame, self).await;
    }

    /// Stage two of the receive pipeline: an actual inbound request.
    /// Returns the reply frame to push back at the requester.
    async fn answer_request(&self, frame: Frame) -> Option<Frame> {
        let reply = match frame.kind {
            MessageKind::NewBlock => {
                let message: NewBlockMessage = match frame.decode() {
                    Ok(m) => m,
                    Err(e) => {
                        tracing::warn!(error = %e, "undecodable block push");
                        return None;
                    }
                };
                let applied = {
                    let mut state = self.state.write().await;
                    self.validator.validate_and_apply(&mut state, &message.block)
                };
                let ack = if applied {
                    AckMessage::ok()
                } else {
                    AckMessage::rejected("block not applied")
                };
                Frame::encode(MessageKind::BlockAck, &ack)
            }
            MessageKind::BlockRangeRequest => {
                let message: BlockRangeRequest = match frame.decode() {
                    Ok(m) => m,
                    Err(e) => {
                        tracing::warn!(error = %e, "undecodable range request");
                        return None;
                    }
                };
                let blocks = self
                    .state
                    .read()
                    .await
                    .chain
                    .range(message.from_height, message.count as usize);
                Frame::encode(MessageKind::BlockRangeResponse, &BlockRangeResponse { blocks })
            }
            MessageKind::StakeAnnounce => {
                let message: StakeAnnounceMessage = match frame.decode() {
                    Ok(m) => m,
                    Err(e) => {
                        tracing::warn!(error = %e, "undecodable stake announcement");
                        return None;
                    }
                };
                tracing::info!(
                    staker = %message.stake.address,
                    amount = message.stake.amount,
                    "peer stake recorded"
                );
                self.registry.write().await.add_or_update(message.stake);
                Frame::encode(MessageKind::StakeAck, &AckMessage::ok())
            }
            MessageKind::TxAnnounce => {
                let message: TransactionMessage = match frame.decode() {
                    Ok(m) => m,
                    Err(e) => {
                        tracing::warn!(error = %e, "undecodable transaction announcement");
                        return None;
                    }
                };
                let tx = message.transaction;
                let ack = match tx.validate_basic().and_then(|_| tx.verify_signature()) {
                    Ok(true) => {
                        let mut state = self.state.write().await;
                        match state.pool.add(tx) {
                            Ok(()) => AckMessage::ok(),
                            Err(e) => AckMessage::rejected(&e.to_string()),
                        }
                    }
                    Ok(false) => AckMessage::rejected("bad signature"),
                    Err(e) => AckMessage::rejected(&e.to_string()),
                };
                Frame::encode(MessageKind::TxAck, &ack)
            }
            other => {
                tracing::warn!(kind = ?other, "frame is neither a pending response nor a request");
                return None;
            }
        };

        match reply {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode reply");
                None
            }
        }
    }
}

#[async_trait]
impl InboundHandler for Node {
    async fn handle_peer_request(&self, peer: PeerId, frame: Frame) {
        if let Some(reply) = self.answer_request(frame).await {
            if let Err(e) = self.transport.send_to_peer(&peer, &reply) {
                tracing::warn!(peer = %peer.to_hex(), error = %e, "reply send failed");
            }
        }
    }

    async fn handle_unconnected_request(&self, remote: SocketAddr, frame: Frame) {
        if let Some(reply) = self.answer_request(frame).await {
            if let Err(e) = self.transport.send_unconnected(remote, &reply) {
                tracing::warn!(%remote, error = %e, "unconnected reply send failed");
            }
        }
    }
}
