// ledger-core/src/transaction.rs

use crate::{item::StorageItem, types::*, LedgerError, LedgerResult};
use ledger_crypto::{double_hash, PublicKey, Signature, Signer};
use serde::{Deserialize, Serialize};

/// Transaction kinds carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxKind {
    #[serde(rename = "Transfer")]
    Transfer,
    #[serde(rename = "Staking")]
    Stake,
    #[serde(rename = "Validation_Fee")]
    ValidatorFee,
}

/// A signed value transfer, immutable once signed.
///
/// Destroyed only by pool deletion after inclusion in a committed block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub time_stamp: Timestamp,
    pub sender: String,
    pub recipient: String,
    pub storage_item: StorageItem,
    pub fee: f64,
    /// Block height this transaction targets
    pub height: Height,
    /// Sender public key (hex)
    pub pub_key: String,
    /// Sender signature over `hash` (hex)
    pub signature: String,
    /// Content hash, self-referential
    pub hash: String,
    pub tx_type: TxKind,
}

impl Transaction {
    /// Create an unsigned transfer; `sign_with` fills hash and signature.
    pub fn transfer(
        sender: String,
        recipient: String,
        storage_item: StorageItem,
        fee: f64,
        height: Height,
        time_stamp: Timestamp,
        pub_key: String,
    ) -> Self {
        Self {
            time_stamp,
            sender,
            recipient,
            storage_item,
            fee,
            height,
            pub_key,
            signature: String::new(),
            hash: String::new(),
            tx_type: TxKind::Transfer,
        }
    }

    /// Recompute the content hash from the hashed fields.
    ///
    /// Input order is fixed for cross-peer agreement: time stamp, sender,
    /// item type, item content, fee, recipient, and, for object items only,
    /// the object's own hash appended.
    pub fn compute_hash(&self) -> String {
        let mut data = format!(
            "{}{}{}{}{}{}",
            self.time_stamp,
            self.sender,
            self.storage_item.item_type(),
            self.storage_item.content(),
            self.fee,
            self.recipient
        );
        if let StorageItem::Obj(obj) = &self.storage_item {
            data.push_str(&obj.hash);
        }
        double_hash(&data)
    }

    /// Hash the content and sign the hash
    pub fn sign_with(&mut self, signer: &dyn Signer) -> LedgerResult<()> {
        self.hash = self.compute_hash();
        self.signature = signer.sign(&self.hash)?.to_hex();
        Ok(())
    }

    /// Verify the embedded signature against the embedded public key
    pub fn verify_signature(&self) -> LedgerResult<bool> {
        if self.signature.is_empty() || self.hash.is_empty() {
            return Err(LedgerError::InvalidTransaction(
                "unsigned transaction".into(),
            ));
        }
        let pub_key = PublicKey::from_hex(&self.pub_key)?;
        let signature = Signature::from_hex(&self.signature)?;
        Ok(pub_key.verify(&self.hash, &signature)?)
    }

    /// Basic well-formedness: hash matches content, fee non-negative
    pub fn validate_basic(&self) -> LedgerResult<()> {
        if self.fee < 0.0 {
            return Err(LedgerError::InvalidTransaction(
                "negative fee".into(),
            ));
        }
        if self.hash != self.compute_hash() {
            return Err(LedgerError::InvalidTransaction(
                "hash does not match content".into(),
            ));
        }
        Ok(())
    }
}

/// Totals transferred by a transaction list: summed fungible amount plus the
/// object hashes that changed hands. Serialized into the block and covered
/// by the block hash.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferSummary {
    pub total: f64,
    pub objects: Vec<String>,
}

impl TransferSummary {
    pub fn summarize(txs: &[Transaction]) -> Self {
        let mut summary = Self::default();
        for tx in txs {
            match &tx.storage_item {
                StorageItem::Number(item) => summary.total += item.amount,
                StorageItem::Obj(item) => summary.objects.push(item.hash.clone()),
            }
        }
        summary
    }
}

/// Sum of fees over a transaction list
pub fn total_fees(txs: &[Transaction]) -> f64 {
    txs.iter().map(|tx| tx.fee).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_crypto::{KeyPair, Signer};

    fn signed_transfer(keypair: &KeyPair, amount: f64, fee: f64) -> Transaction {
        let mut tx = Transaction::transfer(
            keypair.address(),
            "0xrecipient".into(),
            StorageItem::number(amount),
            fee,
            2,
            1_700_000_000,
            keypair.public_key().to_hex(),
        );
        tx.sign_with(keypair).unwrap();
        tx
    }

    #[test]
    fn test_hash_covers_content() {
        let keypair = KeyPair::generate();
        let tx = signed_transfer(&keypair, 100.0, 1.0);
        assert_eq!(tx.hash, tx.compute_hash());

        let mut tampered = tx.clone();
        tampered.fee = 2.0;
        assert_ne!(tampered.hash, tampered.compute_hash());
        assert!(tampered.validate_basic().is_err());
    }

    #[test]
    fn test_obj_item_hash_feeds_transaction_hash() {
        let keypair = KeyPair::generate();
        let obj =
            crate::item::ObjItem::mint("relic", 64, &ledger_crypto::hash("a"), 0, &keypair)
                .unwrap();
        let mut tx = Transaction::transfer(
            keypair.address(),
            "0xrecipient".into(),
            StorageItem::Obj(obj),
            0.0,
            2,
            1_700_000_000,
            keypair.public_key().to_hex(),
        );
        tx.sign_with(&keypair).unwrap();

        let mut other = tx.clone();
        if let StorageItem::Obj(obj) = &mut other.storage_item {
            obj.hash = ledger_crypto::hash("b");
        }
        assert_ne!(tx.compute_hash(), other.compute_hash());
    }

    #[test]
    fn test_signature_verifies() {
        let keypair = KeyPair::generate();
        let tx = signed_transfer(&keypair, 50.0, 0.001);
        assert!(tx.verify_signature().unwrap());

        let mut forged = tx.clone();
        forged.hash = ledger_crypto::hash("something else");
        assert!(!forged.verify_signature().unwrap());
    }

    #[test]
    fn test_summary_and_fees() {
        let keypair = KeyPair::generate();
        let txs = vec![
            signed_transfer(&keypair, 100.0, 1.0),
            signed_transfer(&keypair, 25.0, 0.5),
        ];
        let summary = TransferSummary::summarize(&txs);
        assert_eq!(summary.total, 125.0);
        assert!(summary.objects.is_empty());
        assert_eq!(total_fees(&txs), 1.5);
    }

    #[test]
    fn test_tx_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&TxKind::ValidatorFee).unwrap(),
            "\"Validation_Fee\""
        );
        assert_eq!(serde_json::to_string(&TxKind::Stake).unwrap(), "\"Staking\"");
    }
}
