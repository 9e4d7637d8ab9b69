//! Domain models for signon-gate
//!
//! This module contains the core domain models used throughout the
//! trust-and-access layer.

pub mod key;
pub mod origin;

pub use key::{ApiKeyRecord, IssuedKey, KeyMetadata};
pub use origin::AllowedOrigins;
