//! Invitation tokens and PKCE material.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

/// Length of an invitation token in hex characters (32 bytes).
pub const INVITATION_TOKEN_LEN: usize = 64;

/// Generate a cryptographically random invitation token
/// (32 bytes → 64 lowercase hex characters).
pub fn generate_invitation_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rand::Rng::random(&mut rng);
    hex::encode(bytes)
}

/// True when `token` has the shape of an invitation token.
pub fn is_well_formed(token: &str) -> bool {
    token.len() == INVITATION_TOKEN_LEN && token.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Generate a PKCE code verifier (32 bytes → base64url, no padding).
pub fn generate_code_verifier() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rand::Rng::random(&mut rng);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// S256 code challenge for a verifier.
pub fn code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invitation_tokens_are_64_hex_and_unique() {
        let a = generate_invitation_token();
        let b = generate_invitation_token();
        assert!(is_well_formed(&a));
        assert_eq!(a, a.to_lowercase());
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(!is_well_formed(""));
        assert!(!is_well_formed(&"g".repeat(64)));
        assert!(!is_well_formed(&"a".repeat(63)));
    }

    #[test]
    fn code_challenge_matches_rfc7636_example() {
        // Appendix B of RFC 7636.
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            code_challenge(verifier),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn verifier_is_url_safe() {
        let v = generate_code_verifier();
        assert_eq!(v.len(), 43);
        assert!(
            v.bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        );
    }
}
