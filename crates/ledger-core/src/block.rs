// ledger-core/src/block.rs

use crate::{transaction::Transaction, types::*, LedgerError, LedgerResult};
use ledger_crypto::{double_hash, hash};
use serde::{Deserialize, Serialize};

/// A committed block. Immutable once appended; blocks form a singly linked,
/// height-ordered append-only chain owned by `ChainStore`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub version: u32,
    /// 1-based height, 1 = genesis
    pub height: Height,
    pub time_stamp: Timestamp,
    /// "-" for genesis
    pub prev_hash: String,
    pub hash: String,
    /// Serialized (JSON) transaction list; the block hash covers the
    /// derived merkle root, not this text
    pub transactions: String,
    /// Address credited with sealing the block
    pub validator: String,
    /// Serialized balance snapshot of the validator, "-" for genesis
    pub validator_balance: String,
    pub merkle_root: String,
    pub num_of_tx: u32,
    /// Serialized `TransferSummary`; first field of the hash input
    pub total_amount: String,
    /// Fees collected by the validator
    pub total_reward: f64,
    /// Vestigial proof-of-work fields, kept for hash-domain separation
    pub difficulty: u32,
    pub nonce: u32,
    pub proof: u64,
    /// Serialized size in bytes
    pub size: u64,
    /// Milliseconds spent assembling the block
    pub build_time: i64,
    /// Validator signature over `hash` (hex)
    pub signature: String,
}

impl Block {
    /// Recompute the block hash from the hashed fields.
    ///
    /// Concatenation order is fixed and must match on every peer:
    /// total_amount, height, prev_hash, merkle_root, time_stamp,
    /// difficulty, validator. Textual representations, double-hashed.
    pub fn compute_hash(&self) -> String {
        let data = format!(
            "{}{}{}{}{}{}{}",
            self.total_amount,
            self.height,
            self.prev_hash,
            self.merkle_root,
            self.time_stamp,
            self.difficulty,
            self.validator
        );
        double_hash(&data)
    }

    /// Decode the embedded transaction list
    pub fn decode_transactions(&self) -> LedgerResult<Vec<Transaction>> {
        serde_json::from_str(&self.transactions)
            .map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    pub fn is_genesis(&self) -> bool {
        self.height == 1 && self.prev_hash == GENESIS_PREV_HASH
    }
}

/// Is `candidate` the next block our chain needs?
///
/// All four conditions are load-bearing: sequential height, linked previous
/// hash, self-consistent hash, and a timestamp that never runs backwards.
pub fn is_next_block(head: &Block, candidate: &Block) -> bool {
    candidate.height == head.height + 1
        && candidate.prev_hash == head.hash
        && candidate.hash == candidate.compute_hash()
        && candidate.time_stamp >= head.time_stamp
}

/// Compatibility predicate retained from the proof-of-work lineage: hash the
/// guess message and check a leading run of `difficulty` zero characters.
/// Not load-bearing for consensus (leader selection is stake-based) but
/// peers that still call it must agree on the computation.
pub fn valid_proof(
    prev_hash: &str,
    transaction_list: &str,
    difficulty: u32,
    nonce: u32,
    proof: u64,
) -> bool {
    let guess_message = format!(
        "{}{}{}{}{}",
        "0".repeat(difficulty as usize),
        nonce,
        prev_hash,
        transaction_list,
        proof
    );
    let guess = hash(&guess_message);
    guess
        .chars()
        .take(difficulty as usize)
        .all(|c| c == '0')
}
