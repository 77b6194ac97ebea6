//! SOLPAY Cryptography Module
//!
//! Provides the primitives the payment layer needs:
//! - Ed25519 keypairs, signing, and fresh reference keys
//! - SHA-256 hashing
//! - Program-derived and associated-account address derivation

pub mod keys;
pub mod signing;
pub mod hashing;
pub mod derivation;

pub use keys::*;
pub use signing::*;
pub use hashing::*;
pub use derivation::*;
