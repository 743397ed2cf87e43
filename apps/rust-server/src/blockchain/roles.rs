// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Mapping from local role names to on-chain AccessControl role ids.

use alloy::primitives::{keccak256, B256};

use crate::auth::ADMIN_ROLE;

/// On-chain identifier of a local role.
///
/// `admin` maps to `DEFAULT_ADMIN_ROLE` (the zero hash, not hashed); every
/// other role `name` maps to `keccak256(UPPERCASE(name) + "_ROLE")`.
/// Matching is case-insensitive.
pub fn role_identifier(role_name: &str) -> B256 {
    let name = role_name.trim();
    if name.eq_ignore_ascii_case(ADMIN_ROLE) {
        return B256::ZERO;
    }
    keccak256(format!("{}_ROLE", name.to_uppercase()))
}
