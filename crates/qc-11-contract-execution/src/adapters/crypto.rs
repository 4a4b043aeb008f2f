//! # secp256k1 Key Crypto (reference adapter)
//!
//! `KeyCrypto` over `k256` ECDSA.
//!
//! - Public keys: SEC1 (33 or 65 bytes) or raw `x || y` (64 bytes).
//! - Key id: first 8 bytes of `keccak256(x || y)`, big-endian, as `i64`.
//! - Signatures: 64-byte `r || s` over the pre-hashed transaction digest.

use crate::domain::value_objects::Hash;
use crate::errors::CryptoError;
use crate::ports::outbound::KeyCrypto;
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{Signature, VerifyingKey};
use sha3::{Digest, Keccak256};

/// Keccak-256 digest.
#[must_use]
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&hasher.finalize());
    hash
}

/// Parses a public key in any supported encoding.
///
/// # Errors
///
/// `InvalidPublicKey` when the bytes are not a curve point.
pub fn parse_public_key(public_key: &[u8]) -> Result<VerifyingKey, CryptoError> {
    let parsed = if public_key.len() == 64 {
        let mut sec1 = Vec::with_capacity(65);
        sec1.push(0x04);
        sec1.extend_from_slice(public_key);
        VerifyingKey::from_sec1_bytes(&sec1)
    } else {
        VerifyingKey::from_sec1_bytes(public_key)
    };
    parsed.map_err(|_| CryptoError::InvalidPublicKey)
}

/// Key id of a verifying key.
#[must_use]
pub fn key_id(key: &VerifyingKey) -> i64 {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut id = [0u8; 8];
    id.copy_from_slice(&hash[..8]);
    i64::from_be_bytes(id)
}

/// `KeyCrypto` implementation for secp256k1.
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Crypto;

impl KeyCrypto for Secp256k1Crypto {
    fn address(&self, public_key: &[u8]) -> Result<i64, CryptoError> {
        parse_public_key(public_key).map(|key| key_id(&key))
    }

    fn verify(&self, public_key: &[u8], hash: &Hash, signature: &[u8]) -> Result<bool, CryptoError> {
        let key = parse_public_key(public_key)?;
        let signature =
            Signature::from_slice(signature).map_err(|_| CryptoError::InvalidSignature)?;
        let signature = signature.normalize_s().unwrap_or(signature);
        Ok(key.verify_prehash(hash.as_bytes(), &signature).is_ok())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::signature::hazmat::PrehashSigner;
    use k256::ecdsa::SigningKey;

    fn signing_key(seed: u8) -> SigningKey {
        SigningKey::from_slice(&[seed; 32]).unwrap()
    }

    #[test]
    fn test_address_is_encoding_independent() {
        let key = signing_key(7);
        let vk = key.verifying_key();
        let compressed = vk.to_encoded_point(true);
        let uncompressed = vk.to_encoded_point(false);

        let crypto = Secp256k1Crypto;
        let a = crypto.address(compressed.as_bytes()).unwrap();
        let b = crypto.address(uncompressed.as_bytes()).unwrap();
        let c = crypto.address(&uncompressed.as_bytes()[1..]).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_ne!(a, crypto.address(signing_key(8).verifying_key().to_encoded_point(true).as_bytes()).unwrap());
    }

    #[test]
    fn test_verify_signature() {
        let key = signing_key(9);
        let hash = Hash::new(keccak256(b"transaction"));
        let signature: Signature = key.sign_prehash(hash.as_bytes()).unwrap();
        let public_key = key.verifying_key().to_encoded_point(true);

        let crypto = Secp256k1Crypto;
        assert!(crypto
            .verify(public_key.as_bytes(), &hash, &signature.to_bytes())
            .unwrap());

        let other = Hash::new(keccak256(b"other"));
        assert!(!crypto
            .verify(public_key.as_bytes(), &other, &signature.to_bytes())
            .unwrap());
    }

    #[test]
    fn test_malformed_inputs() {
        let crypto = Secp256k1Crypto;
        assert_eq!(crypto.address(&[1, 2, 3]), Err(CryptoError::InvalidPublicKey));

        let public_key = signing_key(3).verifying_key().to_encoded_point(true);
        assert_eq!(
            crypto.verify(public_key.as_bytes(), &Hash::ZERO, &[0u8; 10]),
            Err(CryptoError::InvalidSignature)
        );
    }
}
