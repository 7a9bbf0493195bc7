// ledger-core/src/validator.rs

use crate::{
    block::{is_next_block, Block},
    state::ChainState,
};

/// Validates incoming blocks against local chain state before admission.
#[derive(Debug, Default)]
pub struct ChainValidator;

impl ChainValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate one block and, if it extends our chain, apply it: decode
    /// the transaction list, mutate the ledger, drop matching pool entries
    /// and append. Returns whether the block was applied.
    pub fn validate_and_apply(&self, state: &mut ChainState, block: &Block) -> bool {
        if let Some(head) = state.chain.head() {
            if !is_next_block(head, block) {
                tracing::warn!(
                    incoming = block.height,
                    head = head.height,
                    "out-of-order or stale block, not applied"
                );
                return false;
            }
        }

        self.apply(state, block)
    }

    fn apply(&self, state: &mut ChainState, block: &Block) -> bool {
        let transactions = match block.decode_transactions() {
            Ok(txs) if !txs.is_empty() => txs,
            Ok(_) => {
                tracing::error!(height = block.height, "block carries no transactions");
                return false;
            }
            Err(e) => {
                tracing::error!(height = block.height, error = %e, "undecodable transaction list");
                return false;
            }
        };

        state.ledger.apply_transactions(&transactions);
        // Drop any pooled transaction that the block just confirmed,
        // matched by identity.
        state.pool.delete_included(&transactions);

        match state.chain.append(block.clone()) {
            Ok(()) => {
                tracing::info!(height = block.height, hash = %block.hash, "peer block applied");
                true
            }
            Err(e) => {
                tracing::error!(height = block.height, error = %e, "block append failed");
                false
            }
        }
    }

    /// Validate and apply a catch-up range that peers may deliver in either
    /// height order. The input is reordered so its first element matches
    /// `head.height + 1` (reversed once if the tail matches instead); if
    /// neither end matches the whole batch is rejected. Success means fewer
    /// than all blocks failed.
    pub fn validate_and_apply_batch(&self, state: &mut ChainState, mut blocks: Vec<Block>) -> bool {
        if blocks.is_empty() {
            tracing::error!("empty block batch");
            return false;
        }

        let Some(head) = state.chain.head() else {
            tracing::error!("no local chain to extend");
            return false;
        };
        let wanted = head.height + 1;

        if blocks[0].height != wanted {
            blocks.reverse();
        }
        if blocks[0].height != wanted {
            tracing::error!(
                wanted,
                first = blocks[0].height,
                last = blocks[blocks.len() - 1].height,
                "neither end of the batch extends the local chain"
            );
            return false;
        }

        let total = blocks.len();
        let mut failed = 0usize;
        for block in &blocks {
            if !self.validate_and_apply(state, block) {
                failed += 1;
            }
        }
        tracing::info!(total, failed, applied = total - failed, "block batch processed");

        failed < total
    }
}
