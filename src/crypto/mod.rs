//! Credential hashing and session token primitives.
//!
//! Passwords are stored as `base64(salt):base64(key)` where the key is a
//! 32-byte Argon2id derivation of the password with a random 16-byte salt.
//! Session tokens are 32 random bytes, hex encoded; only their SHA-256 digest
//! is persisted.

use argon2::Argon2;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use lazy_static::lazy_static;
use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Length of the random salt in bytes
const SALT_LENGTH: usize = 16;

/// Length of the derived key in bytes
const KEY_LENGTH: usize = 32;

/// Length of a raw session token in bytes
const TOKEN_LENGTH: usize = 32;

lazy_static! {
    /// Hash checked against when the account does not exist, so unknown
    /// emails pay the same KDF cost as wrong passwords.
    static ref DUMMY_HASH: String =
        hash_password("roombook-dummy-password").unwrap_or_default();
}

fn derive_key(password: &str, salt: &[u8]) -> Result<[u8; KEY_LENGTH], argon2::Error> {
    let mut key = [0u8; KEY_LENGTH];
    Argon2::default().hash_password_into(password.as_bytes(), salt, &mut key)?;
    Ok(key)
}

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, argon2::Error> {
    let salt: [u8; SALT_LENGTH] = rand::rng().random();
    let key = derive_key(password, &salt)?;
    Ok(format!("{}:{}", BASE64.encode(salt), BASE64.encode(key)))
}

/// Verify a password against a stored `salt:key` hash.
///
/// Malformed hashes verify as `false`; callers cannot tell them apart from a
/// wrong password.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_b64, key_b64)) = stored.split_once(':') else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (BASE64.decode(salt_b64), BASE64.decode(key_b64)) else {
        return false;
    };
    if salt.is_empty() || expected.len() != KEY_LENGTH {
        return false;
    }

    match derive_key(password, &salt) {
        Ok(key) => key[..].ct_eq(&expected[..]).into(),
        Err(_) => false,
    }
}

/// Spend the same work as a real verification and always fail
pub fn verify_password_dummy(password: &str) -> bool {
    let _ = verify_password(password, &DUMMY_HASH);
    false
}

/// Generate a random session token
pub fn generate_token() -> String {
    let bytes: [u8; TOKEN_LENGTH] = rand::rng().random();
    hex::encode(bytes)
}

/// Hash a token for storage
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
