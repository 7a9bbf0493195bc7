// consensus/src/lottery.rs

use crate::{
    selection::{select_creator, select_validator},
    stake::{Stake, StakeRegistry},
};
use chrono::Timelike;
use ledger_core::{unix_now, Block, BlockBuilder, ChainState, TransferSummary};
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};

/// Phase edges within the 60-second wall-clock cycle
const QUIESCENT_END: u32 = 3;
const STAKING_END: u32 = 30;
const LOTTERY_START: u32 = 45;

/// Epoch phase derived purely from the wall clock, so every peer computes
/// the same schedule without coordination messages.
///
/// Parity rule: odd minutes stake, even minutes run the lottery. The first
/// seconds of every minute are quiescent and reset the one-shot flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochPhase {
    /// Seconds [0, 3): reset flags, do nothing
    Quiescent,
    /// Odd minutes, seconds [3, 30): the single pledge window
    Staking,
    /// Even minutes, seconds [45, 60): the single resolution window
    Lottery,
    /// Everything else: wait for the next edge
    Idle,
}

impl EpochPhase {
    pub fn at(minute: u32, second: u32) -> Self {
        if second < QUIESCENT_END {
            EpochPhase::Quiescent
        } else if minute % 2 == 1 && second < STAKING_END {
            EpochPhase::Staking
        } else if minute % 2 == 0 && second >= LOTTERY_START {
            EpochPhase::Lottery
        } else {
            EpochPhase::Idle
        }
    }
}

/// Seconds until the next phase edge from `second` within the minute
pub fn seconds_to_next_phase(second: u32) -> u64 {
    for edge in [QUIESCENT_END, STAKING_END, LOTTERY_START] {
        if second < edge {
            return (edge - second) as u64;
        }
    }
    (60 - second) as u64
}

/// Participation thresholds for an epoch to resolve
#[derive(Debug, Clone)]
pub struct LotteryConfig {
    /// The pool must hold strictly more than this many transactions
    pub min_pool_len: usize,
    /// At least this many stakers must have pledged
    pub min_stakers: usize,
}

impl Default for LotteryConfig {
    fn default() -> Self {
        Self {
            min_pool_len: 2,
            min_stakers: 2,
        }
    }
}

/// Side effects the lottery fires into the rest of the node: stake
/// announcements and freshly sealed blocks, both handed to the propagation
/// layer by the runtime.
#[async_trait::async_trait]
pub trait LotteryHooks: Send + Sync {
    /// Fire-and-forget stake broadcast
    async fn stake_pledged(&self, stake: &Stake);
    /// A block was built and committed locally
    async fn block_sealed(&self, block: &Block);
}

/// Hooks that discard every event; used by tests and headless setups.
pub struct NullHooks;

#[async_trait::async_trait]
impl LotteryHooks for NullHooks {
    async fn stake_pledged(&self, _stake: &Stake) {}
    async fn block_sealed(&self, _block: &Block) {}
}

/// Epoch-driven state machine selecting who may seal each block, weighted
/// by staked amount.
pub struct StakeLottery {
    config: LotteryConfig,
    state: Arc<RwLock<ChainState>>,
    registry: Arc<RwLock<StakeRegistry>>,
    builder: BlockBuilder,
    local_address: String,
    hooks: Arc<dyn LotteryHooks>,
}

impl StakeLottery {
    pub fn new(
        config: LotteryConfig,
        state: Arc<RwLock<ChainState>>,
        registry: Arc<RwLock<StakeRegistry>>,
        builder: BlockBuilder,
        local_address: String,
        hooks: Arc<dyn LotteryHooks>,
    ) -> Self {
        Self {
            config,
            state,
            registry,
            builder,
            local_address,
            hooks,
        }
    }

    /// Drive the epoch schedule until the shutdown signal flips.
    ///
    /// The loop re-derives the phase from the wall clock on every wake and
    /// sleeps to the next phase edge on a cancellable timer; one-shot flags
    /// keep pledge and resolution to once per window.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        // Stale bids from a previous session never carry over.
        self.registry.write().await.delete_all();

        tracing::info!(address = %self.local_address, "stake lottery started");
        let mut staked = false;
        let mut resolved = false;

        loop {
            let now = chrono::Utc::now();
            let (minute, second) = (now.minute(), now.second());

            match EpochPhase::at(minute, second) {
                EpochPhase::Quiescent => {
                    staked = false;
                    resolved = false;
                }
                EpochPhase::Staking if !staked => {
                    staked = true;
                    self.pledge_stake().await;
                }
                EpochPhase::Lottery if !resolved => {
                    resolved = true;
                    self.resolve_epoch().await;
                }
                _ => {}
            }

            let wait = seconds_to_next_phase(second).max(1);
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(wait)) => {}
                _ = shutdown.changed() => {
                    tracing::info!("stake lottery stopped");
                    return;
                }
            }
        }
    }

    /// Pledge a random share of the local account's stake-eligible tokens,
    /// smoothed by the hour of day, and announce it to peers.
    pub async fn pledge_stake(&self) {
        let mut state = self.state.write().await;
        let Some(account) = state.ledger.get(&self.local_address) else {
            tracing::warn!(address = %self.local_address, "cannot stake without an account");
            return;
        };
        if account.tokens <= 0.0 {
            tracing::info!(address = %self.local_address, "no stake-eligible tokens this epoch");
            return;
        }
        let tokens = account.tokens;

        let amount = {
            let hour = chrono::Utc::now().hour();
            let smoothing = (hour % 12).max(1) as f64 / 12.0;
            rand::thread_rng().gen::<f64>() * tokens * smoothing
        };

        if let Err(e) = state.ledger.cut_tokens(&self.local_address, amount) {
            tracing::warn!(error = %e, "stake pledge refused");
            return;
        }
        drop(state);

        let stake = Stake {
            address: self.local_address.clone(),
            amount,
            time_stamp: unix_now(),
        };
        self.registry.write().await.add_or_update(stake.clone());
        tracing::info!(amount = stake.amount, "stake pledged");

        self.hooks.stake_pledged(&stake).await;
    }

    /// Run one lottery resolution: select the creator, and if that is us,
    /// seal the next block. The stake table is cleared afterwards either
    /// way: every epoch starts from zero stake.
    pub async fn resolve_epoch(&self) {
        let stakes = self.registry.read().await.all();
        let pool_len = self.state.read().await.pool.len();

        if pool_len <= self.config.min_pool_len || stakes.len() < self.config.min_stakers {
            tracing::info!(
                pool = pool_len,
                stakers = stakes.len(),
                "insufficient participation, skipping epoch"
            );
            return;
        }

        let (creator, validator, nonce) = {
            let mut rng = rand::thread_rng();
            (
                select_creator(&stakes, &mut rng),
                select_validator(&stakes, &mut rng),
                rng.gen_range(0..100_000u32),
            )
        };

        let Some(creator) = creator else {
            tracing::warn!("zero total stake, no creator selected");
            self.registry.write().await.delete_all();
            return;
        };

        let winner = &stakes[creator];
        if winner.address != self.local_address {
            tracing::info!(winner = %winner.address, "not selected this epoch");
            self.registry.write().await.delete_all();
            return;
        }

        // The validator round-trip is a stubbed extension point: a second
        // staker is drawn but approval is assumed.
        let approved = validator.is_some();
        if approved {
            let started = Instant::now();
            let sealed = {
                let mut state = self.state.write().await;
                let balance = state
                    .ledger
                    .get(&winner.address)
                    .map(|account| TransferSummary {
                        total: account.balance(),
                        objects: account.obj_items.iter().map(|o| o.hash.clone()).collect(),
                    })
                    .unwrap_or_default();
                let balance = serde_json::to_string(&balance).unwrap_or_else(|_| "-".into());

                self.builder
                    .build(&mut state, &winner.address, &balance, 1, nonce, 1, started)
            };

            match sealed {
                Ok(block) => {
                    tracing::info!(height = block.height, "lottery winner sealed a block");
                    self.hooks.block_sealed(&block).await;
                }
                Err(e) => tracing::error!(error = %e, "selected as creator but build failed"),
            }
        }

        self.registry.write().await.delete_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::{GenesisAccount, StorageItem, Transaction};
    use ledger_crypto::{KeyPair, Signer};

    #[test]
    fn test_phase_table() {
        // Quiescent at the head of every minute
        assert_eq!(EpochPhase::at(1, 0), EpochPhase::Quiescent);
        assert_eq!(EpochPhase::at(2, 2), EpochPhase::Quiescent);

        // Odd minutes stake inside [3, 30)
        assert_eq!(EpochPhase::at(1, 3), EpochPhase::Staking);
        assert_eq!(EpochPhase::at(3, 29), EpochPhase::Staking);
        assert_eq!(EpochPhase::at(1, 30), EpochPhase::Idle);
        assert_eq!(EpochPhase::at(2, 10), EpochPhase::Idle);

        // Even minutes resolve inside [45, 60)
        assert_eq!(EpochPhase::at(2, 45), EpochPhase::Lottery);
        assert_eq!(EpochPhase::at(0, 59), EpochPhase::Lottery);
        assert_eq!(EpochPhase::at(1, 50), EpochPhase::Idle);
        assert_eq!(EpochPhase::at(2, 44), EpochPhase::Idle);
    }

    #[test]
    fn test_seconds_to_next_phase_edges() {
        assert_eq!(seconds_to_next_phase(0), 3);
        assert_eq!(seconds_to_next_phase(3), 27);
        assert_eq!(seconds_to_next_phase(29), 1);
        assert_eq!(seconds_to_next_phase(30), 15);
        assert_eq!(seconds_to_next_phase(45), 15);
        assert_eq!(seconds_to_next_phase(59), 1);
    }

    fn lottery_fixture(local_tokens: f64) -> (StakeLottery, Arc<RwLock<ChainState>>, KeyPair) {
        let spender = KeyPair::generate();
        let genesis_key = KeyPair::from_secret_hex(&spender.secret_key().to_hex()).unwrap();
        let builder = BlockBuilder::new(Arc::new(KeyPair::generate()));

        let mut state = ChainState::new();
        builder
            .build_genesis(&mut state, &[GenesisAccount::new(genesis_key)], 1_700_000_000)
            .unwrap();

        let mut account = state.ledger.get(&spender.address()).unwrap().clone();
        account.tokens = local_tokens;
        state.ledger.upsert(account);

        let state = Arc::new(RwLock::new(state));
        let lottery = StakeLottery::new(
            LotteryConfig::default(),
            state.clone(),
            Arc::new(RwLock::new(StakeRegistry::new())),
            builder,
            spender.address(),
            Arc::new(NullHooks),
        );
        (lottery, state, spender)
    }

    async fn fill_pool(state: &Arc<RwLock<ChainState>>, spender: &KeyPair, count: usize) {
        let mut guard = state.write().await;
        for i in 0..count {
            let mut tx = Transaction::transfer(
                spender.address(),
                "0xb".into(),
                StorageItem::number(1.0 + i as f64),
                0.1,
                guard.chain.head().unwrap().height + 1,
                unix_now(),
                spender.public_key().to_hex(),
            );
            tx.sign_with(spender).unwrap();
            guard.pool.add(tx).unwrap();
        }
    }

    #[tokio::test]
    async fn test_pledge_debits_tokens_and_registers() {
        let (lottery, state, _) = lottery_fixture(100.0);
        lottery.pledge_stake().await;

        let remaining = state
            .read()
            .await
            .ledger
            .get(&lottery.local_address)
            .unwrap()
            .tokens;
        assert!(remaining <= 100.0);

        let registry = lottery.registry.read().await;
        let stake = registry.get(&lottery.local_address).unwrap();
        assert!((stake.amount + remaining - 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_pledge_without_tokens_is_skipped() {
        let (lottery, _, _) = lottery_fixture(0.0);
        lottery.pledge_stake().await;
        assert!(lottery.registry.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_insufficient_participation_skips_and_keeps_stakes() {
        let (lottery, _, _) = lottery_fixture(100.0);
        lottery.registry.write().await.add_or_update(Stake {
            address: lottery.local_address.clone(),
            amount: 10.0,
            time_stamp: 0,
        });

        // Pool is empty: the epoch must skip without touching the table.
        lottery.resolve_epoch().await;
        assert_eq!(lottery.registry.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_local_winner_seals_block_and_clears_stakes() {
        let (lottery, state, spender) = lottery_fixture(100.0);
        fill_pool(&state, &spender, 3).await;

        {
            let mut registry = lottery.registry.write().await;
            // The local bid dwarfs the other so the draw cannot miss it.
            registry.add_or_update(Stake {
                address: lottery.local_address.clone(),
                amount: 1e12,
                time_stamp: 0,
            });
            registry.add_or_update(Stake {
                address: "0xother".into(),
                amount: 1e-9,
                time_stamp: 0,
            });
        }

        lottery.resolve_epoch().await;

        let guard = state.read().await;
        assert_eq!(guard.chain.head().unwrap().height, 2);
        assert!(guard.pool.is_empty());
        drop(guard);
        assert!(lottery.registry.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_losing_epoch_clears_stakes_without_building() {
        let (lottery, state, spender) = lottery_fixture(100.0);
        fill_pool(&state, &spender, 3).await;

        {
            let mut registry = lottery.registry.write().await;
            registry.add_or_update(Stake {
                address: lottery.local_address.clone(),
                amount: 1e-9,
                time_stamp: 0,
            });
            registry.add_or_update(Stake {
                address: "0xother".into(),
                amount: 1e12,
                time_stamp: 0,
            });
        }

        lottery.resolve_epoch().await;

        let guard = state.read().await;
        assert_eq!(guard.chain.head().unwrap().height, 1);
        assert_eq!(guard.pool.len(), 3);
        drop(guard);
        assert!(lottery.registry.read().await.is_empty());
    }
}
