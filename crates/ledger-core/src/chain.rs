// ledger-core/src/chain.rs

use crate::{block::Block, types::Height, LedgerError, LedgerResult};

/// Append-only sequence of committed blocks, ordered by height.
///
/// Height is the sole ordering key; no fork index is kept, since at most one
/// chain is ever built locally.
#[derive(Debug, Default)]
pub struct ChainStore {
    blocks: Vec<Block>,
}

impl ChainStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn head(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn first(&self) -> Option<&Block> {
        self.blocks.first()
    }

    pub fn by_height(&self, height: Height) -> Option<&Block> {
        self.blocks
            .binary_search_by_key(&height, |b| b.height)
            .ok()
            .map(|i| &self.blocks[i])
    }

    /// Blocks from `from_height` (inclusive) upward, at most `count`.
    /// Serves peer catch-up pages.
    pub fn range(&self, from_height: Height, count: usize) -> Vec<Block> {
        self.blocks
            .iter()
            .filter(|b| b.height >= from_height)
            .take(count)
            .cloned()
            .collect()
    }

    /// Append a block. Never overwrites: a height already stored is
    /// rejected.
    pub fn append(&mut self, block: Block) -> LedgerResult<()> {
        if let Some(head) = self.head() {
            if block.height <= head.height {
                return Err(LedgerError::InvalidBlock(format!(
                    "height {} already stored (head {})",
                    block.height, head.height
                )));
            }
        }
        self.blocks.push(block);
        Ok(())
    }
}
