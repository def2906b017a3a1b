//! PBKDF2-HMAC-SHA256 password credentials.
//!
//! A credential is a self-describing string:
//!
//! ```text
//! pbkdf2_sha256$<iterations>$<salt>$<derived key>
//! ```
//!
//! Salt and key are base64url without padding. Verification reads the
//! iteration count and salt from the stored string, never from config, so
//! credentials created under an older iteration count keep verifying.

use base64::{
    Engine,
    engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD},
};
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::MIN_PBKDF2_ITERATIONS;

pub const ALGORITHM_TAG: &str = "pbkdf2_sha256";

pub const SALT_LEN: usize = 16;

pub const KEY_LEN: usize = 32;

/// Stored counts above this are treated as corrupt rather than run.
const MAX_ITERATIONS: u32 = 10_000_000;

#[derive(Debug, Clone, Copy)]
pub struct CredentialHasher {
    iterations: u32,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self::new(MIN_PBKDF2_ITERATIONS)
    }
}

impl CredentialHasher {
    #[must_use]
    pub const fn new(iterations: u32) -> Self {
        Self { iterations }
    }

    /// Hashes `password` with a fresh random salt.
    ///
    /// CPU-bound; call through `spawn_blocking` from async code.
    #[must_use]
    pub fn hash(&self, password: &str) -> String {
        let salt: [u8; SALT_LEN] = rand::rng().random();
        let key = derive_key(password, &salt, self.iterations);

        format!(
            "{ALGORITHM_TAG}${}${}${}",
            self.iterations,
            URL_SAFE_NO_PAD.encode(salt),
            URL_SAFE_NO_PAD.encode(key)
        )
    }

    /// Checks `plaintext` against a stored credential.
    ///
    /// Returns `false` for a wrong password and for a malformed credential
    /// alike; callers cannot tell the two apart.
    #[must_use]
    pub fn verify(&self, plaintext: &str, stored: &str) -> bool {
        let Some(parsed) = ParsedCredential::parse(stored) else {
            tracing::debug!("Stored credential is malformed");
            return false;
        };

        let computed = derive_key(plaintext, &parsed.salt, parsed.iterations);
        computed[..].ct_eq(&parsed.key[..]).into()
    }
}

fn derive_key(password: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

struct ParsedCredential {
    iterations: u32,
    salt: Vec<u8>,
    key: [u8; KEY_LEN],
}

impl ParsedCredential {
    fn parse(stored: &str) -> Option<Self> {
        let mut parts = stored.split('$');
        let (Some(tag), Some(iterations), Some(salt), Some(key), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return None;
        };

        if tag != ALGORITHM_TAG {
            return None;
        }

        let iterations: u32 = iterations.parse().ok()?;
        if iterations == 0 || iterations > MAX_ITERATIONS {
            return None;
        }

        let salt = decode_b64(salt)?;
        if salt.is_empty() {
            return None;
        }

        let key: [u8; KEY_LEN] = decode_b64(key)?.try_into().ok()?;

        Some(Self {
            iterations,
            salt,
            key,
        })
    }
}

/// Accepts url-safe and standard alphabets, with or without padding.
fn decode_b64(field: &str) -> Option<Vec<u8>> {
    let trimmed = field.trim_end_matches('=');
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .ok()
}
