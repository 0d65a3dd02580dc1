//! Per-session API credential.
//!
//! A fresh 256-bit token is minted every time the control service starts and
//! lives only in memory; clients learn it through the pairing payload and
//! present it in the `x-api-key` header. At most one credential is active at
//! a time.

use std::fmt;

use rand::RngCore;
use subtle::ConstantTimeEq;

/// Randomly generated session secret, hex-encoded.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Mint a fresh 256-bit credential.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Constant-time comparison against a caller-supplied value.
    pub fn matches(&self, presented: &str) -> bool {
        presented.as_bytes().ct_eq(self.0.as_bytes()).into()
    }

    /// The hex-encoded secret, for the pairing payload.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

// Keep the secret out of logs and error messages.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(redacted)")
    }
}
