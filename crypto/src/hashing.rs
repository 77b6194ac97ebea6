//! Hashing functions using SHA-256

use sha2::{Digest, Sha256};
use solpay_core::Hash;

/// Compute SHA-256 hash of data
pub fn sha256_hash(data: &[u8]) -> Hash {
    hash_multiple(&[data])
}

/// Hash multiple pieces of data as one concatenated input
pub fn hash_multiple(parts: &[&[u8]]) -> Hash {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&result);
    Hash::from_bytes(bytes)
}
