//! Program-derived address derivation
//!
//! A program-derived address is `sha256(seeds ‖ bump ‖ program ‖ marker)`
//! with the constraint that the result is *not* a valid ed25519 point, so
//! no private key can ever sign for it.

use solpay_core::programs::{ASSOCIATED_TOKEN_PROGRAM_ID, TOKEN_PROGRAM_ID};
use solpay_core::{PayError, PayResult, PublicKey};

use crate::hashing::hash_multiple;
use crate::keys::is_on_curve;

/// Maximum length of a single seed
pub const MAX_SEED_LEN: usize = 32;

/// Maximum number of seeds, including the bump
pub const MAX_SEEDS: usize = 16;

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

fn check_seeds(seeds: &[&[u8]]) -> PayResult<()> {
    if seeds.len() > MAX_SEEDS {
        return Err(PayError::Internal(format!(
            "at most {} seeds are allowed, got {}",
            MAX_SEEDS,
            seeds.len()
        )));
    }
    if seeds.iter().any(|seed| seed.len() > MAX_SEED_LEN) {
        return Err(PayError::Internal(format!(
            "seeds are limited to {} bytes",
            MAX_SEED_LEN
        )));
    }
    Ok(())
}

/// Hash the seeds, `None` when the result lands on the curve
fn derive(seeds: &[&[u8]], program_id: &PublicKey) -> Option<PublicKey> {
    let mut parts: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 2);
    parts.extend_from_slice(seeds);
    parts.push(program_id.as_bytes());
    parts.push(PDA_MARKER);

    let address = PublicKey::from_bytes(*hash_multiple(&parts).as_bytes());
    (!is_on_curve(&address)).then_some(address)
}

/// Derive an address from explicit seeds, failing when it lands on the curve
pub fn create_program_address(seeds: &[&[u8]], program_id: &PublicKey) -> PayResult<PublicKey> {
    check_seeds(seeds)?;
    derive(seeds, program_id)
        .ok_or_else(|| PayError::Internal("derived address lies on the curve".into()))
}

/// Find the first off-curve address, trying bumps from 255 downwards
pub fn find_program_address(seeds: &[&[u8]], program_id: &PublicKey) -> PayResult<(PublicKey, u8)> {
    // One slot is reserved for the bump
    if seeds.len() >= MAX_SEEDS {
        return Err(PayError::Internal(format!(
            "at most {} seeds are allowed besides the bump",
            MAX_SEEDS - 1
        )));
    }
    check_seeds(seeds)?;

    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut with_bump: Vec<&[u8]> = seeds.to_vec();
        with_bump.push(&bump_seed);

        if let Some(address) = derive(&with_bump, program_id) {
            return Ok((address, bump));
        }
    }

    Err(PayError::Internal("no viable bump seed".into()))
}

/// The canonical token account holding `mint` for `owner`
pub fn associated_token_address(owner: &PublicKey, mint: &PublicKey) -> PayResult<PublicKey> {
    Ok(associated_token_address_with_bump(owner, mint)?.0)
}

/// Like [`associated_token_address`], also returning the bump seed
pub fn associated_token_address_with_bump(
    owner: &PublicKey,
    mint: &PublicKey,
) -> PayResult<(PublicKey, u8)> {
    let seeds: [&[u8]; 3] = [owner.as_bytes(), TOKEN_PROGRAM_ID.as_bytes(), mint.as_bytes()];
    find_program_address(&seeds, &ASSOCIATED_TOKEN_PROGRAM_ID)
}
