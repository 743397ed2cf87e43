// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Short password fingerprints embedded in verification and reset tokens.

use sha2::{Digest, Sha256};

/// Length of a fingerprint in hex characters.
pub const FINGERPRINT_LEN: usize = 8;

/// First 8 lowercase hex characters of `SHA-256(value)`.
///
/// Callers pass the user's current stored password hash, so any password
/// change yields a different fingerprint and invalidates tokens bound to
/// the old one.
pub fn fingerprint(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    let mut hex = alloy::primitives::hex::encode(digest);
    hex.truncate(FINGERPRINT_LEN);
    hex
}
