// ledger-core/src/ledger.rs

use crate::{
    item::StorageItem,
    transaction::Transaction,
    types::{unix_now, Timestamp},
    LedgerError, LedgerResult,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Account state: one fungible balance, a set of owned objects, and the
/// transient stake-eligible token balance (reset each epoch by the game
/// layer, distinct from the ledger balance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub address: String,
    /// Public key (hex); filled in lazily when the account first spends
    pub pub_key: String,
    pub number_item: crate::item::NumberItem,
    pub obj_items: Vec<crate::item::ObjItem>,
    /// Monotonically increasing transaction counter
    pub txn_count: u64,
    pub created_time: Timestamp,
    pub updated_time: Timestamp,
    /// Stake-eligible tokens, not part of the ledger balance
    pub tokens: f64,
}

impl Account {
    pub fn new(address: &str, pub_key: &str, now: Timestamp) -> Self {
        Self {
            address: address.to_string(),
            pub_key: pub_key.to_string(),
            number_item: crate::item::NumberItem::default(),
            obj_items: Vec::new(),
            txn_count: 0,
            created_time: now,
            updated_time: now,
            tokens: 0.0,
        }
    }

    pub fn balance(&self) -> f64 {
        self.number_item.amount
    }

    pub fn holds_obj(&self, hash: &str) -> bool {
        self.obj_items.iter().any(|obj| obj.hash == hash)
    }
}

/// Authoritative account table, mutated only by applying transactions.
#[derive(Debug, Default)]
pub struct Ledger {
    accounts: HashMap<String, Account>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &str) -> Option<&Account> {
        self.accounts.get(address)
    }

    pub fn upsert(&mut self, account: Account) {
        self.accounts.insert(account.address.clone(), account);
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    /// Debit stake-eligible tokens; refuses when the balance is insufficient.
    pub fn cut_tokens(&mut self, address: &str, tokens: f64) -> LedgerResult<f64> {
        let account = self.accounts.get_mut(address).ok_or_else(|| {
            LedgerError::Integrity(format!("no account for address {address}"))
        })?;
        if account.tokens - tokens < 0.0 {
            tracing::error!(
                address,
                held = account.tokens,
                requested = tokens,
                "stake token debit exceeds held tokens"
            );
            return Err(LedgerError::Integrity("insufficient tokens".into()));
        }
        account.tokens -= tokens;
        Ok(tokens)
    }

    /// Debit `item` from the sender's storage, lazily creating the account
    /// with a zero balance. Number balances may go transiently negative;
    /// callers pre-check. Removing an object the account does not hold is a
    /// fatal consistency error: logged, the operation aborted.
    pub fn cut_from_storage(
        &mut self,
        address: &str,
        item: &StorageItem,
        pub_key: &str,
    ) -> LedgerResult<()> {
        let now = unix_now();
        let account = self
            .accounts
            .entry(address.to_string())
            .or_insert_with(|| Account::new(address, pub_key, now));
        account.pub_key = pub_key.to_string();
        account.txn_count += 1;
        account.updated_time = now;

        match item {
            StorageItem::Number(number) => {
                account.number_item.amount -= number.amount;
                Ok(())
            }
            StorageItem::Obj(obj) => {
                let before = account.obj_items.len();
                account.obj_items.retain(|held| held.hash != obj.hash);
                if account.obj_items.len() == before {
                    tracing::error!(
                        address,
                        obj_hash = %obj.hash,
                        "removing an object the account never held"
                    );
                    return Err(LedgerError::Integrity(format!(
                        "account {address} does not hold object {}",
                        obj.hash
                    )));
                }
                Ok(())
            }
        }
    }

    /// Credit `item` to the recipient's storage, lazily creating the
    /// account. A duplicate object hash is a fatal consistency error.
    pub fn add_to_storage(&mut self, address: &str, item: &StorageItem) -> LedgerResult<()> {
        let now = unix_now();
        let account = self
            .accounts
            .entry(address.to_string())
            .or_insert_with(|| Account::new(address, "-", now));
        account.txn_count += 1;
        account.updated_time = now;

        match item {
            StorageItem::Number(number) => {
                account.number_item.amount += number.amount;
                Ok(())
            }
            StorageItem::Obj(obj) => {
                if account.holds_obj(&obj.hash) {
                    tracing::error!(
                        address,
                        obj_hash = %obj.hash,
                        "duplicate object hash credited to account"
                    );
                    return Err(LedgerError::Integrity(format!(
                        "account {address} already holds object {}",
                        obj.hash
                    )));
                }
                account.obj_items.push(obj.clone());
                Ok(())
            }
        }
    }

    /// Apply transactions in order: debit sender (item plus fee), then
    /// credit recipient.
    ///
    /// Not a two-phase atomic transfer: a crash mid-list leaves partial
    /// application, tolerated under the single-writer, non-Byzantine model.
    /// Integrity failures are logged per transaction and skipped.
    pub fn apply_transactions(&mut self, txs: &[Transaction]) {
        for tx in txs {
            if let Err(e) = self.cut_from_storage(&tx.sender, &tx.storage_item, &tx.pub_key) {
                tracing::error!(hash = %tx.hash, error = %e, "debit failed, skipping credit");
                continue;
            }
            if tx.fee > 0.0 {
                // The fee the validator later collects as reward; acceptance
                // pre-checked amount + fee against the sender's balance.
                if let Some(account) = self.accounts.get_mut(&tx.sender) {
                    account.number_item.amount -= tx.fee;
                }
            }
            if let Err(e) = self.add_to_storage(&tx.recipient, &tx.storage_item) {
                tracing::error!(hash = %tx.hash, error = %e, "credit failed after debit");
            }
        }
    }

    /// Genesis transactions only seed balances and items, never debited.
    pub fn apply_genesis(&mut self, txs: &[Transaction]) {
        for tx in txs {
            if let Err(e) = self.add_to_storage(&tx.recipient, &tx.storage_item) {
                tracing::error!(hash = %tx.hash, error = %e, "genesis credit failed");
            }
        }
    }
}
