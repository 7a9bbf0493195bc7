// consensus/src/stake.rs

use ledger_core::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An ephemeral per-epoch bid of tokens weighting lottery selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stake {
    pub address: String,
    pub amount: f64,
    pub time_stamp: Timestamp,
}

/// The stake table for the current epoch. Owned by the lottery and deleted
/// wholesale at the end of every cycle.
#[derive(Debug, Default)]
pub struct StakeRegistry {
    stakes: HashMap<String, Stake>,
}

impl StakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.stakes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stakes.is_empty()
    }

    /// Insert or replace the stake for an address; one bid per staker.
    pub fn add_or_update(&mut self, stake: Stake) {
        self.stakes.insert(stake.address.clone(), stake);
    }

    pub fn get(&self, address: &str) -> Option<&Stake> {
        self.stakes.get(address)
    }

    /// All stakes in address order, so every peer walks the same cumulative
    /// sum during selection.
    pub fn all(&self) -> Vec<Stake> {
        let mut stakes: Vec<Stake> = self.stakes.values().cloned().collect();
        stakes.sort_by(|a, b| a.address.cmp(&b.address));
        stakes
    }

    pub fn max(&self) -> Option<&Stake> {
        self.stakes
            .values()
            .max_by(|a, b| a.amount.total_cmp(&b.amount))
    }

    /// Every epoch starts from zero stake.
    pub fn delete_all(&mut self) {
        self.stakes.clear();
    }
}
