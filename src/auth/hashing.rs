//! Password hashing
//!
//! Salted, iterated SHA-256 with constant-time digest comparison. Stored
//! form: `sha256-iter$<iterations>$<salt-b64>$<digest-b64>`. The iteration
//! count is part of the encoding so it can be raised without invalidating
//! existing records.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;
use subtle::ConstantTimeEq;

const SCHEME: &str = "sha256-iter";
const ITERATIONS: u32 = 10_000;
const SALT_LEN: usize = 16;

/// A valid hash of no real password. Verified against when a username lookup
/// misses, so the missing-user path costs the same as a wrong password.
pub(crate) static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("not-a-real-password"));

/// Hashes a plaintext password with a fresh random salt.
pub fn hash_password(plaintext: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let digest = derive(plaintext.as_bytes(), &salt, ITERATIONS);
    format!(
        "{}${}${}${}",
        SCHEME,
        ITERATIONS,
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(digest)
    )
}

/// Verifies a plaintext password against a stored hash.
///
/// Malformed stored values verify as false; they never panic and never skip
/// the derivation cost for well-formed inputs.
pub fn verify_password(plaintext: &str, encoded: &str) -> bool {
    let fields: Vec<&str> = encoded.split('$').collect();
    if fields.len() != 4 || fields[0] != SCHEME {
        return false;
    }

    let Ok(iterations) = fields[1].parse::<u32>() else {
        return false;
    };
    let Ok(salt) = STANDARD_NO_PAD.decode(fields[2]) else {
        return false;
    };
    let Ok(expected) = STANDARD_NO_PAD.decode(fields[3]) else {
        return false;
    };

    let computed = derive(plaintext.as_bytes(), &salt, iterations);
    computed.as_slice().ct_eq(expected.as_slice()).into()
}

fn derive(password: &[u8], salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut digest = Sha256::new()
        .chain_update(salt)
        .chain_update(password)
        .finalize();
    for _ in 1..iterations {
        digest = Sha256::new()
            .chain_update(salt)
            .chain_update(&digest)
            .finalize();
    }
    digest.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trips() {
        let encoded = hash_password("correct horse");
        assert!(verify_password("correct horse", &encoded));
    }

    #[test]
    fn wrong_password_fails() {
        let encoded = hash_password("correct horse");
        assert!(!verify_password("battery staple", &encoded));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("secret");
        let b = hash_password("secret");
        assert_ne!(a, b);
        assert!(verify_password("secret", &a));
        assert!(verify_password("secret", &b));
    }

    #[test]
    fn malformed_encodings_verify_false() {
        for bad in [
            "",
            "plaintext",
            "sha256-iter$10$onlythree",
            "sha256-iter$notanumber$AA$AA",
            "sha256-iter$10$!!!$AA",
            "md5$10$AA$AA",
        ] {
            assert!(!verify_password("secret", bad), "accepted {bad:?}");
        }
    }

    #[test]
    fn dummy_hash_is_well_formed() {
        assert!(!verify_password("anything", &DUMMY_HASH));
        assert!(verify_password("not-a-real-password", &DUMMY_HASH));
    }
}
