/// Refresh token fingerprints
///
/// The account row stores the SHA-256 digest of its live refresh token,
/// never the token itself. Comparing digests is equivalent to comparing the
/// tokens, and a leaked row cannot be replayed as a credential.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of a refresh token
pub fn fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_hashing() {
        let token = "header.payload.signature";
        let hash1 = fingerprint(token);
        let hash2 = fingerprint(token);

        // Same token should produce same hash
        assert_eq!(hash1, hash2);
        // Hash should not equal plaintext
        assert_ne!(token, hash1);
        // Hash should be 64 chars (SHA-256 hex)
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_tokens_different_hashes() {
        assert_ne!(fingerprint("token-one"), fingerprint("token-two"));
    }
}
