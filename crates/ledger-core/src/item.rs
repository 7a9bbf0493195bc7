// ledger-core/src/item.rs

use crate::types::Timestamp;
use ledger_crypto::{double_hash, CryptoResult, Signer};
use serde::{Deserialize, Serialize};

/// Fungible balance item (in-game points)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberItem {
    pub amount: f64,
}

impl NumberItem {
    pub fn new(amount: f64) -> Self {
        Self { amount }
    }
}

/// Unique object record (an in-game collectible), identified by content hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjItem {
    /// Content hash, unique within the whole system
    pub hash: String,
    pub name: String,
    /// Creator public key (hex)
    pub pub_key: String,
    /// Creator signature over `hash` (hex)
    pub signature: String,
    /// Creation time (unix seconds)
    pub created: Timestamp,
    /// Size of the underlying asset in bytes
    pub file_size: u64,
}

impl ObjItem {
    /// Mint a new object record from its asset metadata.
    ///
    /// The asset bytes themselves live outside the ledger; only the content
    /// digest of the asset enters the item hash, so two mints of the same
    /// asset collide and are rejected at ledger level.
    pub fn mint(
        name: &str,
        file_size: u64,
        content_digest: &str,
        created: Timestamp,
        signer: &dyn Signer,
    ) -> CryptoResult<Self> {
        let data = format!("{name}{created}{file_size}{content_digest}");
        let hash = double_hash(&data);
        let signature = signer.sign(&hash)?.to_hex();

        Ok(Self {
            hash,
            name: name.to_string(),
            pub_key: signer.public_key().to_hex(),
            signature,
            created,
            file_size,
        })
    }
}

/// The unit of value moved by a transaction.
///
/// Exactly one variant per transaction; matched exhaustively everywhere, the
/// tag name and content feed the transaction hash. Externally tagged so the
/// same derive serves both the JSON block body and the bincode wire frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StorageItem {
    #[serde(rename = "NumberBase")]
    Number(NumberItem),
    #[serde(rename = "ObjBase")]
    Obj(ObjItem),
}

impl StorageItem {
    pub fn number(amount: f64) -> Self {
        Self::Number(NumberItem::new(amount))
    }

    /// Tag name used in the transaction hash input
    pub fn item_type(&self) -> &'static str {
        match self {
            StorageItem::Number(_) => "NumberBase",
            StorageItem::Obj(_) => "ObjBase",
        }
    }

    /// Content used in the transaction hash input: the textual amount for
    /// number items, the object hash for object items
    pub fn content(&self) -> String {
        match self {
            StorageItem::Number(item) => format!("{}", item.amount),
            StorageItem::Obj(item) => item.hash.clone(),
        }
    }

    /// Fungible amount carried by this item (zero for object items)
    pub fn amount(&self) -> f64 {
        match self {
            StorageItem::Number(item) => item.amount,
            StorageItem::Obj(_) => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_crypto::KeyPair;

    #[test]
    fn test_item_type_tags() {
        let number = StorageItem::number(10.0);
        assert_eq!(number.item_type(), "NumberBase");
        assert_eq!(number.content(), "10");

        let keypair = KeyPair::generate();
        let obj = ObjItem::mint("relic", 512, &ledger_crypto::hash("asset"), 0, &keypair).unwrap();
        let item = StorageItem::Obj(obj.clone());
        assert_eq!(item.item_type(), "ObjBase");
        assert_eq!(item.content(), obj.hash);
        assert_eq!(item.amount(), 0.0);
    }

    #[test]
    fn test_mint_is_signed_by_creator() {
        let keypair = KeyPair::generate();
        let obj = ObjItem::mint("relic", 512, &ledger_crypto::hash("asset"), 7, &keypair).unwrap();

        let sig = ledger_crypto::Signature::from_hex(&obj.signature).unwrap();
        assert!(keypair.public_key().verify(&obj.hash, &sig).unwrap());
    }

    #[test]
    fn test_mint_same_asset_same_hash() {
        let keypair = KeyPair::generate();
        let digest = ledger_crypto::hash("asset");
        let a = ObjItem::mint("relic", 512, &digest, 7, &keypair).unwrap();
        let b = ObjItem::mint("relic", 512, &digest, 7, &keypair).unwrap();
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn test_serde_tag_roundtrip() {
        let item = StorageItem::number(3.5);
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("NumberBase"));
        let back: StorageItem = serde_json::from_str(&json).unwrap();
        assert_eq!(item, back);
    }
}
