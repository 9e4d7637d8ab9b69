//! Secret primitives
//!
//! Random generation, salted hashing, and constant-time comparison for the
//! API key system. The digest here is a bearer-token digest, not a password
//! hash: secrets carry 256 bits of entropy, so a single SHA-256 pass over
//! `salt || secret` is sufficient and memory-hardness is not required.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Length of a key id in bytes (hex-encoded to twice this length)
pub const KEY_ID_BYTES: usize = 8;

/// Length of a key secret in bytes (hex-encoded to twice this length)
pub const KEY_SECRET_BYTES: usize = 32;

/// Length of the per-key salt in bytes
pub const SALT_BYTES: usize = 16;

/// Fill a buffer with cryptographically secure random bytes
///
/// OsRng reads from the operating system entropy source; a failure there
/// is unrecoverable and aborts the process rather than degrading to weak
/// randomness.
pub fn random_bytes(n: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; n];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Generate `n` random bytes encoded as lowercase hex
pub fn random_hex(n: usize) -> String {
    hex::encode(random_bytes(n))
}

/// Compute the salted digest binding a secret to its key record
///
/// SHA-256 over `salt || secret`. Deterministic for fixed inputs; the salt
/// ensures identical secrets hash differently across records.
pub fn hash_secret(secret: &str, salt: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

/// Compare two byte slices in constant time
///
/// Execution time is independent of where the first mismatching byte
/// occurs. All digest comparisons must go through this function; an
/// early-exit comparison would leak match length through timing.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
