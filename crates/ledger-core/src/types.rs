// ledger-core/src/types.rs

/// Block number/height, 1-based (1 = genesis)
pub type Height = u64;

/// Timestamp in Unix epoch seconds
pub type Timestamp = i64;

/// Block format version
pub const BLOCK_VERSION: u32 = 1;

/// Sentinel previous-hash of the genesis block
pub const GENESIS_PREV_HASH: &str = "-";

/// Sentinel sender address on coinbase-style reward transactions
pub const COINBASE_SENDER: &str = "-";

/// Fixed genesis timestamp (2023-02-28 00:00:00 UTC) so every peer derives
/// an identical genesis block without coordination
pub const GENESIS_TIMESTAMP: Timestamp = 1_677_542_400;

/// Fungible balance seeded into each genesis account
pub const GENESIS_SEED_AMOUNT: f64 = 2_000_000_000.0;

/// Default fee attached to client transfers
pub const DEFAULT_TRANSACTION_FEE: f64 = 0.001;

/// Page size for catch-up block range requests
pub const CATCHUP_PAGE: usize = 50;

/// Current Unix time in seconds
pub fn unix_now() -> Timestamp {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_now_is_recent() {
        let ts = unix_now();
        // Not in year 1970
        assert!(ts > 1_000_000_000);
    }
}
