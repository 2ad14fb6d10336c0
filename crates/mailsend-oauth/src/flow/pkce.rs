//! PKCE (RFC 7636) and the random `state` value used in authorization requests.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Random bytes behind a verifier; 32 bytes encode to 43 characters.
const VERIFIER_BYTES: usize = 32;

/// Random bytes behind a `state` value.
const STATE_BYTES: usize = 16;

fn random_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Returns a fresh unguessable `state` value for CSRF protection.
#[must_use]
pub fn random_state() -> String {
    random_token(STATE_BYTES)
}

/// PKCE code challenge and verifier pair (S256 only).
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    verifier: String,
    challenge: String,
}

impl PkceChallenge {
    /// Generates a new random verifier and its challenge.
    #[must_use]
    pub fn generate() -> Self {
        Self::from_verifier(random_token(VERIFIER_BYTES))
    }

    fn from_verifier(verifier: String) -> Self {
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self {
            verifier,
            challenge,
        }
    }

    /// Returns the verifier sent with the code exchange.
    #[must_use]
    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    /// Returns the challenge sent with the authorization request.
    #[must_use]
    pub fn challenge(&self) -> &str {
        &self.challenge
    }

    /// Returns the challenge method.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        "S256"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc7636_appendix_b_vector() {
        let pkce = PkceChallenge::from_verifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".into());
        assert_eq!(
            pkce.challenge(),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_verifier_length_within_bounds() {
        let pkce = PkceChallenge::generate();
        assert_eq!(pkce.verifier().len(), 43);
        assert_eq!(pkce.method(), "S256");
    }

    #[test]
    fn test_generations_unique() {
        assert_ne!(
            PkceChallenge::generate().verifier(),
            PkceChallenge::generate().verifier()
        );
        assert_ne!(random_state(), random_state());
        assert_eq!(random_state().len(), 22);
    }
}
