// ledger-crypto/src/keypair.rs

use crate::{CryptoError, CryptoResult, Signature};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Public key wrapper
#[derive(Clone, Serialize, Deserialize)]
pub struct PublicKey {
    bytes: Vec<u8>,
}

impl PublicKey {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let bytes =
            hex::decode(s).map_err(|e| CryptoError::DeserializationError(e.to_string()))?;
        Ok(Self::new(bytes))
    }

    /// Verify a signature over a message
    pub fn verify(&self, message: &str, signature: &Signature) -> CryptoResult<bool> {
        signature.verify(message, self)
    }

    /// Derive the account address from this public key
    pub fn to_address(&self) -> Address {
        Address::from_public_key(self)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PublicKey({}...)",
            hex::encode(&self.bytes[..8.min(self.bytes.len())])
        )
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for PublicKey {}

/// Secret key wrapper (kept private, zeroed on drop)
pub struct SecretKey {
    bytes: Vec<u8>,
}

impl SecretKey {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let bytes =
            hex::decode(s).map_err(|e| CryptoError::DeserializationError(e.to_string()))?;
        Ok(Self::new(bytes))
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.bytes.iter_mut().for_each(|b| *b = 0);
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey([REDACTED])")
    }
}

/// Signing capability handed to the ledger core.
///
/// The wallet side of the game client owns key derivation; the ledger only
/// ever needs "sign this hash" and the public key to publish alongside it.
pub trait Signer: Send + Sync {
    /// Sign a message (a hex hash string in practice)
    fn sign(&self, message: &str) -> CryptoResult<Signature>;

    /// The public key matching the signing key
    fn public_key(&self) -> &PublicKey;

    /// The account address derived from the public key
    fn address(&self) -> String {
        self.public_key().to_address().to_hex()
    }
}

/// Ed25519 key pair
pub struct KeyPair {
    public_key: PublicKey,
    secret_key: SecretKey,
}

impl KeyPair {
    /// Generate a new random keypair
    pub fn generate() -> Self {
        use ed25519_dalek::{SigningKey, VerifyingKey};
        use rand::rngs::OsRng;

        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        let verifying_key: VerifyingKey = (&signing_key).into();

        Self {
            public_key: PublicKey::new(verifying_key.to_bytes().to_vec()),
            secret_key: SecretKey::new(signing_key.to_bytes().to_vec()),
        }
    }

    /// Create keypair from existing keys
    pub fn from_keys(public_key: PublicKey, secret_key: SecretKey) -> Self {
        Self {
            public_key,
            secret_key,
        }
    }

    /// Restore a keypair from a hex-encoded secret key
    pub fn from_secret_hex(s: &str) -> CryptoResult<Self> {
        use ed25519_dalek::{SigningKey, VerifyingKey};

        let secret = SecretKey::from_hex(s)?;
        let signing_key = SigningKey::from_bytes(
            secret
                .as_bytes()
                .try_into()
                .map_err(|_| CryptoError::InvalidSecretKey)?,
        );
        let verifying_key: VerifyingKey = (&signing_key).into();

        Ok(Self {
            public_key: PublicKey::new(verifying_key.to_bytes().to_vec()),
            secret_key: secret,
        })
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }
}

impl Signer for KeyPair {
    fn sign(&self, message: &str) -> CryptoResult<Signature> {
        use ed25519_dalek::{Signature as Ed25519Sig, Signer as _, SigningKey};

        let signing_key = SigningKey::from_bytes(
            self.secret_key
                .as_bytes()
                .try_into()
                .map_err(|_| CryptoError::InvalidSecretKey)?,
        );

        let signature: Ed25519Sig = signing_key.sign(message.as_bytes());
        Ok(Signature::new(signature.to_bytes().to_vec()))
    }

    fn public_key(&self) -> &PublicKey {
        &self.public_key
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

/// Account address derived from a public key
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
pub struct Address([u8; 20]);

impl Address {
    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Last 20 bytes of the SHA-256 of the public key
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let digest = crate::hash::hash_bytes(public_key.as_bytes());
        let mut address = [0u8; 20];
        address.copy_from_slice(&digest[12..32]);
        Self(address)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes =
            hex::decode(s).map_err(|e| CryptoError::DeserializationError(e.to_string()))?;
        if bytes.len() != 20 {
            return Err(CryptoError::DeserializationError(
                "Invalid address length".into(),
            ));
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    pub fn zero() -> Self {
        Self([0u8; 20])
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
