// ledger-core/src/pool.rs

use crate::{
    item::StorageItem,
    transaction::{total_fees, Transaction, TxKind},
    types::*,
    LedgerError, LedgerResult,
};

/// Unconfirmed transactions awaiting inclusion, keyed by content hash but
/// kept in arrival order so every peer derives the same merkle input.
#[derive(Debug, Default)]
pub struct TransactionPool {
    transactions: Vec<Transaction>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.transactions.iter().any(|tx| tx.hash == hash)
    }

    /// Add a transaction; a hash already pooled is rejected.
    pub fn add(&mut self, tx: Transaction) -> LedgerResult<()> {
        if self.contains(&tx.hash) {
            return Err(LedgerError::DuplicateTransaction(tx.hash));
        }
        self.transactions.push(tx);
        Ok(())
    }

    pub fn add_bulk(&mut self, txs: Vec<Transaction>) {
        for tx in txs {
            if let Err(e) = self.add(tx) {
                tracing::debug!(error = %e, "skipping pooled duplicate");
            }
        }
    }

    pub fn get_all(&self) -> Vec<Transaction> {
        self.transactions.clone()
    }

    pub fn delete_all(&mut self) {
        self.transactions.clear();
    }

    /// Remove transactions by identity, not by hash, so a different
    /// transaction that happens to hash identically is never deleted.
    pub fn delete_included(&mut self, included: &[Transaction]) {
        self.transactions.retain(|tx| !included.contains(tx));
    }

    /// Synthesize the coinbase-style reward for the validator sealing
    /// `height`: the sum of all pooled fees. No reward without work: an
    /// empty pool yields `None`.
    pub fn build_reward_transaction(
        &self,
        height: Height,
        validator: &str,
        time_stamp: Timestamp,
    ) -> Option<Transaction> {
        if self.transactions.is_empty() {
            return None;
        }

        let reward = total_fees(&self.transactions);
        let mut tx = Transaction {
            time_stamp,
            sender: COINBASE_SENDER.to_string(),
            recipient: validator.to_string(),
            storage_item: StorageItem::number(reward),
            fee: 0.0,
            height,
            pub_key: COINBASE_SENDER.to_string(),
            signature: String::new(),
            hash: String::new(),
            tx_type: TxKind::ValidatorFee,
        };
        tx.hash = tx.compute_hash();
        Some(tx)
    }
}
