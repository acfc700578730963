//! Credential handling for the SCIM endpoint.

pub mod apikeys;

pub use apikeys::{ApiKeyError, Generator, compare_argon2_hash, decode_argon2_hash};
