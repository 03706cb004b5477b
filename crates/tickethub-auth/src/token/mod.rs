//! Signed credential issuing, verification, and claims management.

pub mod claims;
pub mod service;

pub use claims::{Claims, TokenType};
pub use service::{TokenPair, TokenService};

use sha2::{Digest, Sha256};

/// SHA-256 fingerprint of a token, hex-encoded.
///
/// Only fingerprints are persisted and compared; the raw secret never
/// reaches the store.
pub fn fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable_and_hex() {
        let a = fingerprint("some-token");
        let b = fingerprint("some-token");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(fingerprint("some-token"), fingerprint("other-token"));
    }
}
