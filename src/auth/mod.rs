//! API key system for signon-gate
//!
//! This module provides the credential half of the trust-and-access layer:
//! - Secret primitives (random generation, salted hashing, constant-time
//!   comparison)
//! - Key issuance, one-time bootstrap, verification, and revocation

pub mod keys;
pub mod secrets;

pub use keys::{parse_token, KeyService};
pub use secrets::{constant_time_eq, hash_secret, random_bytes, random_hex};
