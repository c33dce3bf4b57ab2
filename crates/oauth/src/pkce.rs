use {
    base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD},
    rand::RngCore,
    sha2::{Digest, Sha256},
};

use crate::types::PkceChallenge;

/// Entropy behind the code verifier. 48 bytes encode to a 64-character
/// verifier, inside RFC 7636's 43..=128 bounds.
const VERIFIER_BYTES: usize = 48;

impl PkceChallenge {
    /// Generate a fresh S256 pair.
    ///
    /// The verifier is single-use: it lives for one authorization
    /// attempt and is never persisted.
    pub fn generate() -> Self {
        let mut bytes = [0u8; VERIFIER_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        let verifier = URL_SAFE_NO_PAD.encode(bytes);
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));

        Self {
            verifier,
            challenge,
        }
    }
}

/// Random `state` parameter correlating a callback with its attempt.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
