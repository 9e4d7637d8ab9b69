//! CORS origin domain models

use serde::{Deserialize, Serialize};

/// The current CORS whitelist, as returned by the admin listing endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedOrigins {
    /// Literal origin strings, e.g. `https://example.com`
    pub origins: Vec<String>,
}

impl AllowedOrigins {
    /// Wrap a list of origins
    pub fn new(origins: Vec<String>) -> Self {
        Self { origins }
    }
}
