// ledger-crypto/src/merkle.rs

use sha2::{Digest, Sha256};

/// Merkle root over an ordered list of hex-encoded transaction hashes.
///
/// Adjacent leaves are paired with a double SHA-256 over their concatenated
/// raw bytes; an odd leaf at the end of a level is paired with itself. The
/// empty list yields the empty string and a single leaf is its own root.
/// Must stay bit-exact: the root goes into the block hash and peers compare
/// the resulting strings for equality.
pub fn merkle_root(leaves: &[String]) -> String {
    let mut level: Vec<String> = leaves.to_vec();

    loop {
        if level.is_empty() {
            return String::new();
        }
        if level.len() == 1 {
            return level.remove(0);
        }

        let mut next = Vec::with_capacity(level.len() / 2 + 1);
        let paired = if level.len() % 2 != 0 {
            level.len() - 1
        } else {
            level.len()
        };

        for pair in level[..paired].chunks(2) {
            next.push(double_hash_pair(&pair[0], &pair[1]));
        }
        if paired < level.len() {
            let last = &level[level.len() - 1];
            next.push(double_hash_pair(last, last));
        }

        level = next;
    }
}

/// `hex(sha256(sha256(decode(left) ++ decode(right))))`, lowercase.
///
/// Leaves that are not valid hex contribute their raw UTF-8 bytes instead of
/// silently vanishing; genesis uses "-" sentinels that would otherwise
/// decode to nothing.
fn double_hash_pair(left: &str, right: &str) -> String {
    let mut concat = decode_leaf(left);
    concat.extend(decode_leaf(right));
    let first = Sha256::digest(&concat);
    let second = Sha256::digest(first);
    hex::encode(second)
}

fn decode_leaf(leaf: &str) -> Vec<u8> {
    hex::decode(leaf).unwrap_or_else(|_| leaf.as_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash;

    fn leaves(n: usize) -> Vec<String> {
        (0..n).map(|i| hash(&format!("tx-{i}"))).collect()
    }

    #[test]
    fn test_empty_list_yields_empty_string() {
        assert_eq!(merkle_root(&[]), "");
    }

    #[test]
    fn test_single_leaf_is_its_own_root() {
        let l = leaves(1);
        assert_eq!(merkle_root(&l), l[0]);
    }

    #[test]
    fn test_deterministic() {
        let l = leaves(5);
        assert_eq!(merkle_root(&l), merkle_root(&l));
    }

    #[test]
    fn test_order_sensitive() {
        let l = leaves(4);
        let mut swapped = l.clone();
        swapped.swap(0, 1);
        assert_ne!(merkle_root(&l), merkle_root(&swapped));
    }

    #[test]
    fn test_odd_count_duplicates_last_leaf() {
        // Three leaves: the third pairs with itself on the first level.
        let l = leaves(3);
        let level1 = vec![
            double_hash_pair(&l[0], &l[1]),
            double_hash_pair(&l[2], &l[2]),
        ];
        let expected = double_hash_pair(&level1[0], &level1[1]);
        assert_eq!(merkle_root(&l), expected);
    }

    #[test]
    fn test_root_is_hex() {
        let root = merkle_root(&leaves(8));
        assert_eq!(root.len(), 64);
        assert!(root.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
