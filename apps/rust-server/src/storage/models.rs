// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted user and role records.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use utoipa::ToSchema;

/// Numeric user identifier (auto-incremented by the database).
pub type UserId = u64;

/// User record stored in the `users` table.
///
/// The password hash never leaves the server; API responses use [`UserView`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredUser {
    pub id: UserId,
    /// Normalized email (see [`normalize_email`])
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    /// PHC-formatted argon2 hash
    pub password_hash: String,
    pub is_active: bool,
    /// Assigned role names, unique and unordered
    #[serde(default)]
    pub roles: BTreeSet<String>,
    /// Public EVM address used for on-chain role checks
    #[serde(default)]
    pub wallet_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredUser {
    /// Role names as a vector, in stable (sorted) order.
    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().cloned().collect()
    }
}

/// Fields required to create a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub password_hash: String,
    pub roles: BTreeSet<String>,
}

/// Mutable profile fields (admin update).
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

/// Role record stored in the `roles` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct StoredRole {
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Public representation of a user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub is_active: bool,
    pub roles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_wallet_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<StoredUser> for UserView {
    fn from(user: StoredUser) -> Self {
        let roles = user.role_names();
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone_number: user.phone_number,
            is_active: user.is_active,
            roles,
            public_wallet_address: user.wallet_address,
            created_at: user.created_at,
        }
    }
}

/// Publicly visible subset of a user (contact card).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl From<StoredUser> for UserProfile {
    fn from(user: StoredUser) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            phone_number: user.phone_number,
        }
    }
}

/// Canonical form used for email uniqueness and lookups.
///
/// NFKC-normalized, trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.nfkc().collect::<String>().trim().to_lowercase()
}

/// Canonical form of a role name.
pub fn normalize_role_name(name: &str) -> String {
    name.trim().to_lowercase()
}
