//! Key management for SOLPAY
//!
//! Handles keypair generation, reference-key minting, and curve checks.

use ed25519_dalek::{
    SigningKey as Ed25519SigningKey,
    VerifyingKey as Ed25519VerifyingKey,
    SECRET_KEY_LENGTH,
};
use rand::rngs::OsRng;
use solpay_core::{PayError, PayResult, PublicKey};

/// A keypair for signing and verification
#[derive(Clone)]
pub struct KeyPair {
    signing_key: Ed25519SigningKey,
}

impl KeyPair {
    /// Generate a new random keypair
    pub fn generate() -> Self {
        let signing_key = Ed25519SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Create keypair from seed bytes
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = Ed25519SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Create keypair from secret key bytes
    ///
    /// Accepts the 32-byte seed or the 64-byte `seed ‖ public key` form used
    /// by wallet keypair files; the latter must be self-consistent.
    pub fn from_secret_bytes(bytes: &[u8]) -> PayResult<Self> {
        match bytes.len() {
            SECRET_KEY_LENGTH => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(bytes);
                Ok(Self::from_seed(&seed))
            }
            64 => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(&bytes[..32]);
                let keypair = Self::from_seed(&seed);
                if keypair.public_key().as_bytes()[..] != bytes[32..] {
                    return Err(PayError::InvalidPublicKey(
                        "keypair bytes do not match their public key".into(),
                    ));
                }
                Ok(keypair)
            }
            n => Err(PayError::Config(format!("secret key must be 32 or 64 bytes, got {}", n))),
        }
    }

    /// Get the public key
    pub fn public_key(&self) -> PublicKey {
        let verifying_key = self.signing_key.verifying_key();
        PublicKey::from_bytes(verifying_key.to_bytes())
    }

    /// Get the secret key bytes (BE CAREFUL with this!)
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Get the internal signing key for signing operations
    pub(crate) fn signing_key(&self) -> &Ed25519SigningKey {
        &self.signing_key
    }
}

/// Mint a fresh, single-use reference key
///
/// The secret half is discarded immediately: a reference only needs to be
/// unique and a valid key, it never signs.
pub fn new_reference() -> PublicKey {
    KeyPair::generate().public_key()
}

/// Whether the bytes decode to a point on the ed25519 curve
pub fn is_on_curve(key: &PublicKey) -> bool {
    Ed25519VerifyingKey::from_bytes(key.as_bytes()).is_ok()
}

/// Convert our PublicKey type to Ed25519 verifying key
pub fn public_key_to_ed25519(key: &PublicKey) -> PayResult<Ed25519VerifyingKey> {
    Ed25519VerifyingKey::from_bytes(key.as_bytes())
        .map_err(|_| PayError::InvalidPublicKey(key.to_base58()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_from_seed() {
        let seed = [42u8; 32];
        let kp1 = KeyPair::from_seed(&seed);
        let kp2 = KeyPair::from_seed(&seed);

        assert_eq!(kp1.public_key(), kp2.public_key());
    }

    #[test]
    fn test_keypair_file_form() {
        let kp = KeyPair::generate();
        let mut bytes = kp.secret_bytes().to_vec();
        bytes.extend_from_slice(kp.public_key().as_bytes());

        let loaded = KeyPair::from_secret_bytes(&bytes).unwrap();
        assert_eq!(loaded.public_key(), kp.public_key());

        bytes[40] ^= 0xff;
        assert!(KeyPair::from_secret_bytes(&bytes).is_err());
    }

    #[test]
    fn test_references_are_fresh() {
        let a = new_reference();
        let b = new_reference();
        assert_ne!(a, b);
        assert!(is_on_curve(&a));
    }}
