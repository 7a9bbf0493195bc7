// ledger-core/src/builder.rs

use crate::{
    block::Block,
    item::{ObjItem, StorageItem},
    state::ChainState,
    transaction::{total_fees, Transaction, TransferSummary},
    types::*,
    LedgerError, LedgerResult,
};
use ledger_crypto::{merkle_root, KeyPair, Signer};
use std::sync::Arc;
use std::time::Instant;

/// A keypair plus the balance and items seeded into its account at genesis
pub struct GenesisAccount {
    pub keypair: KeyPair,
    pub amount: f64,
    pub obj_items: Vec<ObjItem>,
}

impl GenesisAccount {
    pub fn new(keypair: KeyPair) -> Self {
        Self {
            keypair,
            amount: GENESIS_SEED_AMOUNT,
            obj_items: Vec::new(),
        }
    }
}

/// Assembles new blocks from pooled transactions and commits them.
///
/// All methods take `&mut ChainState`; the caller's writer lock is the
/// single-writer discipline: no two builds run concurrently, and a build
/// never overlaps an incoming-block application.
pub struct BlockBuilder {
    signer: Arc<dyn Signer>,
}

impl BlockBuilder {
    pub fn new(signer: Arc<dyn Signer>) -> Self {
        Self { signer }
    }

    pub fn signer(&self) -> &Arc<dyn Signer> {
        &self.signer
    }

    /// Build and commit the genesis block from a fixed set of seeded
    /// accounts. Genesis transactions are self-transfers (never debited);
    /// the block is signed by the first keypair.
    pub fn build_genesis(
        &self,
        state: &mut ChainState,
        accounts: &[GenesisAccount],
        time_stamp: Timestamp,
    ) -> LedgerResult<Block> {
        let started = Instant::now();

        if state.has_genesis() {
            return Err(LedgerError::InvalidBlock(
                "genesis block already exists".into(),
            ));
        }
        let first = accounts.first().ok_or_else(|| {
            LedgerError::InvalidBlock("genesis requires at least one account".into())
        })?;

        let mut transactions = Vec::new();
        for account in accounts {
            let address = account.keypair.address();
            let pub_key = account.keypair.public_key().to_hex();

            let mut seed_items = vec![StorageItem::number(account.amount)];
            seed_items.extend(account.obj_items.iter().cloned().map(StorageItem::Obj));

            for item in seed_items {
                let mut tx = Transaction::transfer(
                    address.clone(),
                    address.clone(),
                    item,
                    0.0,
                    1,
                    time_stamp,
                    pub_key.clone(),
                );
                tx.sign_with(&account.keypair)?;
                transactions.push(tx);
            }
        }

        let summary = TransferSummary::summarize(&transactions);
        let tx_hashes: Vec<String> = transactions.iter().map(|tx| tx.hash.clone()).collect();

        let mut block = Block {
            version: BLOCK_VERSION,
            height: 1,
            time_stamp,
            prev_hash: GENESIS_PREV_HASH.into(),
            hash: String::new(),
            transactions: serde_json::to_string(&transactions)
                .map_err(|e| LedgerError::Serialization(e.to_string()))?,
            validator: first.keypair.address(),
            validator_balance: "-".into(),
            merkle_root: merkle_root(&tx_hashes),
            num_of_tx: transactions.len() as u32,
            total_amount: serde_json::to_string(&summary)
                .map_err(|e| LedgerError::Serialization(e.to_string()))?,
            total_reward: 0.0,
            difficulty: 1,
            nonce: 1,
            proof: 0,
            size: 0,
            build_time: 0,
            signature: String::new(),
        };
        block.hash = block.compute_hash();
        block.signature = first.keypair.sign(&block.hash)?.to_hex();
        block.size = serde_json::to_string(&block)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?
            .len() as u64;
        block.build_time = started.elapsed().as_millis() as i64;

        state.ledger.apply_genesis(&transactions);
        state.chain.append(block.clone())?;

        tracing::info!(
            height = block.height,
            transactions = block.num_of_tx,
            "genesis block committed"
        );
        Ok(block)
    }

    /// Assemble, sign and commit the next block from the current pool.
    ///
    /// Any failure before commit (step 6) aborts with no side effects;
    /// failures inside the commit are logged as fatal inconsistency, since
    /// no rollback exists under the single-writer, non-Byzantine model.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        &self,
        state: &mut ChainState,
        validator: &str,
        validator_balance: &str,
        difficulty: u32,
        nonce: u32,
        proof: u64,
        started: Instant,
    ) -> LedgerResult<Block> {
        let head = state
            .chain
            .head()
            .ok_or_else(|| LedgerError::InvalidBlock("no genesis block".into()))?;
        let height = head.height + 1;
        let prev_hash = head.hash.clone();
        let head_time = head.time_stamp;

        let pool_txs = state.pool.get_all();
        if pool_txs.is_empty() {
            return Err(LedgerError::InvalidTransaction(
                "no pooled transactions to seal".into(),
            ));
        }

        // Keep the timestamp monotone even under clock skew between peers.
        let time_stamp = unix_now().max(head_time);

        let mut transactions = pool_txs.clone();
        if let Some(reward) = state
            .pool
            .build_reward_transaction(height, validator, time_stamp)
        {
            transactions.push(reward);
        }

        let summary = TransferSummary::summarize(&transactions);
        let tx_hashes: Vec<String> = transactions.iter().map(|tx| tx.hash.clone()).collect();

        let mut block = Block {
            version: BLOCK_VERSION,
            height,
            time_stamp,
            prev_hash,
            hash: String::new(),
            transactions: serde_json::to_string(&transactions)
                .map_err(|e| LedgerError::Serialization(e.to_string()))?,
            validator: validator.to_string(),
            validator_balance: validator_balance.to_string(),
            merkle_root: merkle_root(&tx_hashes),
            num_of_tx: transactions.len() as u32,
            total_amount: serde_json::to_string(&summary)
                .map_err(|e| LedgerError::Serialization(e.to_string()))?,
            total_reward: total_fees(&pool_txs),
            difficulty,
            nonce,
            proof,
            size: 0,
            build_time: 0,
            signature: String::new(),
        };
        block.hash = block.compute_hash();
        block.signature = self.signer.sign(&block.hash)?.to_hex();
        block.size = serde_json::to_string(&block)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?
            .len() as u64;
        block.build_time = started.elapsed().as_millis() as i64;

        // Commit: apply to the ledger, drop the included pool transactions,
        // append. From here on failures leave partial state behind.
        state.ledger.apply_transactions(&transactions);
        state.pool.delete_included(&pool_txs);
        if let Err(e) = state.chain.append(block.clone()) {
            tracing::error!(height, error = %e, "ledger mutated but block append failed");
            return Err(e);
        }

        tracing::info!(
            height = block.height,
            transactions = block.num_of_tx,
            reward = block.total_reward,
            validator = %block.validator,
            "block committed"
        );
        Ok(block)
    }
}
