//! API key hashing and verification.
//!
//! API keys are stored as Argon2id encoded hashes in the form
//! `$argon2id$v=19$m=<memory>,t=<time>,p=<parallelism>$<salt>$<hash>` with
//! unpadded standard base64 for the salt and digest. Verification re-derives
//! the digest with the parameters embedded in the stored hash and compares in
//! constant time, so a mismatch can't be distinguished by timing.

use std::sync::OnceLock;

use argon2::{Algorithm, Argon2, Params, Version};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use rand::RngCore;
use rand::rngs::OsRng;
use regex::Regex;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Derived digest length in bytes.
const KEY_LENGTH: usize = 32;

/// Salt length in bytes for newly generated keys.
const SALT_LENGTH: usize = 16;

/// Raw token length in bytes for newly generated keys.
const TOKEN_LENGTH: usize = 32;

#[derive(Debug, Error)]
pub enum ApiKeyError {
    /// The stored encoded hash is not in the recognized Argon2id form.
    #[error("invalid encoded hash")]
    InvalidHash,

    /// The system's secure random source failed.
    #[error("random source failure: {0}")]
    Rng(#[from] rand::Error),
}

fn encoded_hash_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\$argon2id\$v=\d+\$m=(\d+),t=(\d+),p=(\d+)\$([^$]+)\$([^$]+)$")
            .expect("encoded hash regex is valid")
    })
}

/// Decode an Argon2id encoded hash into its parameters, salt, and digest.
///
/// All five fields are required; there are no defaults. Any deviation from
/// the expected form is an [`ApiKeyError::InvalidHash`].
pub fn decode_argon2_hash(encoded: &str) -> Result<(u32, u32, u32, Vec<u8>, Vec<u8>), ApiKeyError> {
    let captures = encoded_hash_regex()
        .captures(encoded)
        .ok_or(ApiKeyError::InvalidHash)?;

    let memory: u32 = captures[1].parse().map_err(|_| ApiKeyError::InvalidHash)?;
    let time: u32 = captures[2].parse().map_err(|_| ApiKeyError::InvalidHash)?;
    let parallelism: u32 = captures[3].parse().map_err(|_| ApiKeyError::InvalidHash)?;

    let salt = STANDARD_NO_PAD
        .decode(&captures[4])
        .map_err(|_| ApiKeyError::InvalidHash)?;
    let hash = STANDARD_NO_PAD
        .decode(&captures[5])
        .map_err(|_| ApiKeyError::InvalidHash)?;

    Ok((memory, time, parallelism, salt, hash))
}

/// Verify a presented key against a stored Argon2id encoded hash.
///
/// Returns `Ok(false)` on a digest mismatch; errors are reserved for
/// malformed stored hashes.
pub fn compare_argon2_hash(key: &str, encoded_hash: &str) -> Result<bool, ApiKeyError> {
    let (memory, time, parallelism, salt, hash) = decode_argon2_hash(encoded_hash)?;

    let derived = derive_key(key.as_bytes(), &salt, memory, time, parallelism)?;

    // Lengths may differ if the stored digest was produced with another
    // output length; ct_eq treats that as a mismatch without short-circuit.
    Ok(derived.ct_eq(&hash).into())
}

fn derive_key(
    key: &[u8],
    salt: &[u8],
    memory: u32,
    time: u32,
    parallelism: u32,
) -> Result<[u8; KEY_LENGTH], ApiKeyError> {
    let params = Params::new(memory, time, parallelism, Some(KEY_LENGTH))
        .map_err(|_| ApiKeyError::InvalidHash)?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut derived = [0u8; KEY_LENGTH];
    argon2
        .hash_password_into(key, salt, &mut derived)
        .map_err(|_| ApiKeyError::InvalidHash)?;

    Ok(derived)
}

/// API key generator with explicit Argon2id cost parameters.
#[derive(Debug, Clone, Copy)]
pub struct Generator {
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Generator {
    /// Generate a new API key.
    ///
    /// Returns `(encoded_hash, plaintext_key)`. The plaintext is returned
    /// exactly once and is never persisted; only the encoded hash is stored.
    pub fn generate(&self) -> Result<(String, String), ApiKeyError> {
        let mut key_bytes = [0u8; TOKEN_LENGTH];
        OsRng.try_fill_bytes(&mut key_bytes)?;
        let api_key = URL_SAFE_NO_PAD.encode(key_bytes);

        let mut salt = [0u8; SALT_LENGTH];
        OsRng.try_fill_bytes(&mut salt)?;

        let hash = derive_key(
            api_key.as_bytes(),
            &salt,
            self.memory_cost,
            self.time_cost,
            self.parallelism,
        )?;

        let encoded = format!(
            "$argon2id$v={}$m={},t={},p={}${}${}",
            Version::V0x13 as u32,
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            STANDARD_NO_PAD.encode(salt),
            STANDARD_NO_PAD.encode(hash),
        );

        Ok((encoded, api_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Known-good vector: this hash was produced for the second key below
    // with m=65536, t=1, p=2.
    const ENCODED: &str =
        "$argon2id$v=19$m=65536,t=1,p=2$V+VI24cKNaEDrXdz0xI3Lg$epL8hNnvWkNiK1BPnqRrLqoZk/KvAM1HHK1HrtxMwyw";
    const WRONG_KEY: &str =
        "65RIGoN3TM-AhqowJAPIoWvI1IArq4WPgDvyKFHPJZ-3rr5ZhLafxUibfXCK774RRhGVO-1VYYG2cWlPmieyVA";
    const RIGHT_KEY: &str =
        "Cp9MyxL2YQM6EygSOwkDaB8-avi_sL2OpqxrKamvgmhKidPiqESpWVb6FDTXZlpOgii0c9TEMrNk0jqbn0rQyw";

    #[test]
    fn test_decode_argon2_hash() {
        let (memory, time, parallelism, salt, hash) = decode_argon2_hash(ENCODED).unwrap();

        assert_eq!(memory, 65536);
        assert_eq!(time, 1);
        assert_eq!(parallelism, 2);
        assert_eq!(salt, STANDARD_NO_PAD.decode("V+VI24cKNaEDrXdz0xI3Lg").unwrap());
        assert_eq!(
            hash,
            STANDARD_NO_PAD
                .decode("epL8hNnvWkNiK1BPnqRrLqoZk/KvAM1HHK1HrtxMwyw")
                .unwrap()
        );
    }

    #[test]
    fn test_decode_rejects_malformed_hashes() {
        for encoded in [
            "",
            "foo",
            // wrong algorithm prefix
            "$argon2i$v=19$m=65536,t=1,p=2$V+VI24cKNaEDrXdz0xI3Lg$epL8hNnvWkNiK1BPnqRrLqoZk/KvAM1HHK1HrtxMwyw",
            // missing parameter field
            "$argon2id$v=19$m=65536,t=1$V+VI24cKNaEDrXdz0xI3Lg$epL8hNnvWkNiK1BPnqRrLqoZk/KvAM1HHK1HrtxMwyw",
            // missing salt
            "$argon2id$v=19$m=65536,t=1,p=2$epL8hNnvWkNiK1BPnqRrLqoZk/KvAM1HHK1HrtxMwyw",
            // salt is not valid base64
            "$argon2id$v=19$m=65536,t=1,p=2$!!!!$epL8hNnvWkNiK1BPnqRrLqoZk/KvAM1HHK1HrtxMwyw",
        ] {
            assert!(
                decode_argon2_hash(encoded).is_err(),
                "accepted malformed hash: {encoded}"
            );
        }
    }

    #[test]
    fn test_compare_known_vector() {
        assert!(compare_argon2_hash(RIGHT_KEY, ENCODED).unwrap());
    }

    #[test]
    fn test_compare_wrong_key_is_false_not_error() {
        assert!(!compare_argon2_hash(WRONG_KEY, ENCODED).unwrap());
    }

    #[test]
    fn test_compare_malformed_hash_is_error() {
        assert!(compare_argon2_hash(RIGHT_KEY, "foo").is_err());
    }

    #[test]
    fn test_generate_then_verify_roundtrip() {
        // Low cost parameters to keep the test fast.
        let generator = Generator {
            memory_cost: 8192,
            time_cost: 1,
            parallelism: 1,
        };

        let (encoded, api_key) = generator.generate().unwrap();

        assert!(encoded.starts_with("$argon2id$v=19$m=8192,t=1,p=1$"));
        assert!(compare_argon2_hash(&api_key, &encoded).unwrap());

        // Flip one byte of the presented token: must fail verification.
        let mut mutated = api_key.clone().into_bytes();
        mutated[0] ^= 0x01;
        let mutated = String::from_utf8(mutated).unwrap();
        assert!(!compare_argon2_hash(&mutated, &encoded).unwrap());
    }

    #[test]
    fn test_generated_keys_are_unique() {
        let generator = Generator {
            memory_cost: 8192,
            time_cost: 1,
            parallelism: 1,
        };

        let (hash1, key1) = generator.generate().unwrap();
        let (hash2, key2) = generator.generate().unwrap();

        assert_ne!(key1, key2);
        assert_ne!(hash1, hash2);
    }
}
