// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password hashing, generation and policy.
//!
//! Hashes are Argon2id PHC strings with a random 128-bit salt.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::Rng;

/// Minimum length counted by the policy check.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Number of policy criteria that must hold (out of four).
pub const REQUIRED_CRITERIA: usize = 3;

/// Characters accepted as "special" by the policy check.
pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}|<>";

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    HashingFailed(String),

    #[error("password task failed: {0}")]
    TaskFailed(String),
}

/// Hash a password with Argon2id.
pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
}

/// Verify a password against a stored PHC hash.
///
/// An unparsable hash never verifies.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

/// [`hash_password`] on the blocking thread pool.
pub async fn hash_password_blocking(plain: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password(&plain))
        .await
        .map_err(|e| PasswordError::TaskFailed(e.to_string()))?
}

/// [`verify_password`] on the blocking thread pool.
pub async fn verify_password_blocking(plain: String, hash: String) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || verify_password(&plain, &hash))
        .await
        .map_err(|e| PasswordError::TaskFailed(e.to_string()))
}

/// Random password with at least one lowercase, uppercase, digit and
/// special character. Lengths below 8 are raised to 8.
///
/// Used as the throwaway password of admin-created accounts; the owner
/// replaces it on activation.
pub fn generate_initial_password(len: usize) -> String {
    let len = len.max(MIN_PASSWORD_LENGTH);
    let special = SPECIAL_CHARACTERS.as_bytes();
    let classes: [&[u8]; 4] = [LOWERCASE, UPPERCASE, DIGITS, special];
    let all: Vec<u8> = classes.concat();

    let mut rng = OsRng;
    let mut chars: Vec<u8> = classes
        .iter()
        .map(|class| class[rng.gen_range(0..class.len())])
        .collect();
    while chars.len() < len {
        chars.push(all[rng.gen_range(0..all.len())]);
    }
    chars.shuffle(&mut rng);

    chars.into_iter().map(char::from).collect()
}

/// Check a password against the policy.
///
/// The four criteria are: at least 8 characters, an uppercase letter, a
/// digit and a special character. The password passes when at least three
/// hold; otherwise every failed criterion is returned followed by a summary.
pub fn validate_password(plain: &str) -> Vec<String> {
    let checks = [
        (
            plain.chars().count() >= MIN_PASSWORD_LENGTH,
            "must be at least 8 characters long",
        ),
        (
            plain.chars().any(|c| c.is_ascii_uppercase()),
            "must contain at least one uppercase letter",
        ),
        (
            plain.chars().any(|c| c.is_ascii_digit()),
            "must contain at least one number",
        ),
        (
            plain.chars().any(|c| SPECIAL_CHARACTERS.contains(c)),
            "must contain at least one special character",
        ),
    ];

    let passed = checks.iter().filter(|(ok, _)| *ok).count();
    if passed >= REQUIRED_CRITERIA {
        return Vec::new();
    }

    let mut errors: Vec<String> = checks
        .iter()
        .filter(|(ok, _)| !*ok)
        .map(|(_, msg)| msg.to_string())
        .collect();
    errors.push("must meet at least 3 out of 4 password requirements".to_string());
    errors
}
