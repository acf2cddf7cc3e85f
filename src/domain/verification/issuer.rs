use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::domain::credential::PhoneNumber;
use super::events::CodeGenerated;
use super::value_objects::CodePayload;

// ============================================================================
// Verification Code Issuer
// ============================================================================
//
// Codes are six decimal digits derived from sha256(phone || hex(seed)) where
// the seed is 16 random bytes. Codes are not unique on their own; the record
// key is always the (phone, code) pair.
//
// ============================================================================

pub const CODE_DIGITS: usize = 6;
const SEED_LEN: usize = 16;

/// Draws a fresh seed and derives a code for `phone`
pub fn generate_code(phone: &PhoneNumber) -> String {
    let mut seed = [0u8; SEED_LEN];
    rand::thread_rng().fill(&mut seed);
    derive_code(phone, &seed)
}

/// Deterministic part of code generation: first 32 bits of the digest,
/// reduced to the last six decimal digits and zero-padded.
pub fn derive_code(phone: &PhoneNumber, seed: &[u8]) -> String {
    let digest = Sha256::new()
        .chain_update(phone.as_str().as_bytes())
        .chain_update(hex::encode(seed).as_bytes())
        .finalize();

    let number = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    format!("{:0width$}", number % 1_000_000, width = CODE_DIGITS)
}

/// Builds the `Generated` event for a new, unused code record
pub fn issue(
    phone: &PhoneNumber,
    code: String,
    payload: CodePayload,
    ttl: Duration,
    now: DateTime<Utc>,
) -> CodeGenerated {
    CodeGenerated {
        phone: phone.clone(),
        code,
        expire: now + ttl,
        payload,
    }
}
