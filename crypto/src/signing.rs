//! Digital signature operations using Ed25519

use ed25519_dalek::{Signer, Verifier};
use solpay_core::{Message, PayError, PayResult, PublicKey, Signature};

use crate::keys::{public_key_to_ed25519, KeyPair};

/// Sign a message using Ed25519
pub fn sign(keypair: &KeyPair, message: &[u8]) -> Signature {
    let signature = keypair.signing_key().sign(message);
    Signature::from_bytes(signature.to_bytes())
}

/// Verify a signature using Ed25519
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &Signature) -> PayResult<()> {
    let verifying_key = public_key_to_ed25519(public_key)?;
    let sig = ed25519_dalek::Signature::from_bytes(signature.as_bytes());

    verifying_key
        .verify(message, &sig)
        .map_err(|_| PayError::Ledger(format!("signature {} does not verify", signature)))
}

/// Check if a signature is valid (returns bool instead of Result)
pub fn is_valid_signature(public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
    verify(public_key, message, signature).is_ok()
}

/// Sign the wire bytes of a ledger message
pub fn sign_message(keypair: &KeyPair, message: &Message) -> Signature {
    sign(keypair, &message.serialize())
}

/// Verify every required signature on a message, in signer order
pub fn verify_message(message: &Message, signatures: &[Signature]) -> PayResult<()> {
    let required = message.header.num_required_signatures as usize;
    if signatures.len() != required || message.account_keys.len() < required {
        return Err(PayError::Ledger(format!(
            "expected {} signatures, got {}",
            required,
            signatures.len()
        )));
    }

    let bytes = message.serialize();
    for (signer, signature) in message.account_keys.iter().zip(signatures) {
        verify(signer, &bytes, signature)?;
    }
    Ok(())
}
