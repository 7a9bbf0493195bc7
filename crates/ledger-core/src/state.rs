// ledger-core/src/state.rs

use crate::{chain::ChainStore, ledger::Ledger, pool::TransactionPool};

/// The three stores every chain mutation touches, kept together so the node
/// can guard them with one writer lock: block building and block application
/// both read and mutate ledger, pool and chain as a unit.
#[derive(Debug, Default)]
pub struct ChainState {
    pub ledger: Ledger,
    pub pool: TransactionPool,
    pub chain: ChainStore,
}

impl ChainState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Genesis is only constructible once
    pub fn has_genesis(&self) -> bool {
        !self.chain.is_empty()
    }
}
