// ledger-crypto/src/hash.rs

use sha2::{Digest, Sha256};

/// SHA-256 of the UTF-8 bytes of `data`, encoded as lowercase hex.
///
/// Every hash in the ledger is carried around as a hex string, because block
/// and transaction hashes are built by concatenating the textual form of
/// their fields and peers compare the resulting strings directly.
pub fn hash(data: &str) -> String {
    let digest = Sha256::digest(data.as_bytes());
    hex::encode(digest)
}

/// `hash(hash(data))`: the second pass hashes the hex text of the first.
pub fn double_hash(data: &str) -> String {
    hash(&hash(data))
}

/// SHA-256 over raw bytes, encoded as lowercase hex.
pub fn hash_bytes(data: &[u8]) -> Vec<u8> {
    Sha256::digest(data).to_vec()
}
