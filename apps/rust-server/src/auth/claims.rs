// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims and authenticated user representation.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::codec::TokenError;
use super::fingerprint::fingerprint;
use super::roles::ADMIN_ROLE;
use crate::storage::UserId;

/// Discriminator carried in the `type` claim of every token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// Session token presented on every authenticated request
    #[serde(rename = "auth")]
    Session,
    /// Account activation token mailed to new users
    #[serde(rename = "verification")]
    Verification,
    /// Password reset token mailed on request
    #[serde(rename = "password-reset")]
    PasswordReset,
}

impl TokenKind {
    /// Wire value of the `type` claim.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Session => "auth",
            TokenKind::Verification => "verification",
            TokenKind::PasswordReset => "password-reset",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims of a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Decimal user id
    pub sub: String,
    pub roles: Vec<String>,
    pub active: bool,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn user_id(&self) -> Result<UserId, TokenError> {
        self.sub.parse().map_err(|_| TokenError::Malformed)
    }
}

/// Claims of a verification or password-reset token.
///
/// Both kinds share this shape and differ only in `type` and lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialClaims {
    pub email: String,
    /// Fingerprint of the password hash current at issuance
    pub fingerprint: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

impl CredentialClaims {
    /// Check the embedded fingerprint against the user's current hash.
    pub fn verify_fingerprint(&self, current_password_hash: &str) -> Result<(), TokenError> {
        if self.fingerprint == fingerprint(current_password_hash) {
            Ok(())
        } else {
            Err(TokenError::FingerprintMismatch)
        }
    }
}

/// Identity attached to a request after successful authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub roles: BTreeSet<String>,
    /// Token expiration (Unix timestamp)
    pub expires_at: i64,
}

impl AuthenticatedUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }
}
