// ledger-crypto/src/lib.rs

//! Cryptographic primitives for the game-embedded ledger
//!
//! This crate provides:
//! - Hex-string hashing (SHA-256 single and double hash)
//! - Merkle root computation over transaction hashes
//! - Ed25519 key pairs, signing and verification
//! - Address derivation from public keys

pub mod hash;
pub mod keypair;
pub mod merkle;
pub mod signature;

pub use hash::{double_hash, hash};
pub use keypair::{Address, KeyPair, PublicKey, SecretKey, Signer};
pub use merkle::merkle_root;
pub use signature::Signature;

/// Result type for cryptographic operations
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur during cryptographic operations
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid public key")]
    InvalidPublicKey,

    #[error("Invalid secret key")]
    InvalidSecretKey,

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}
