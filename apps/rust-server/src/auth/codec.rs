// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HS256 token codec for session, verification and password-reset tokens.
//!
//! ## Validation Order
//!
//! 1. Signature (HS256 with the process-wide secret)
//! 2. `type` discriminator against the expected [`TokenKind`]
//! 3. Expiry (`now > exp` is rejected)
//! 4. Kind-specific claim shape
//!
//! The discriminator is read from the raw JSON payload before the typed
//! claims are decoded, so a token of another kind is always reported as
//! [`TokenError::WrongTokenKind`] even when its claim shape differs.
//! Library expiry validation is disabled; the explicit check in step 3 is
//! the only one.

use std::collections::{BTreeSet, HashSet};

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::claims::{CredentialClaims, SessionClaims, TokenKind};
use super::fingerprint::fingerprint;
use crate::storage::UserId;

/// Session token lifetime in seconds (24h).
pub const SESSION_TTL_SECS: i64 = 24 * 60 * 60;

/// Verification token lifetime in seconds (24h).
pub const VERIFICATION_TTL_SECS: i64 = 24 * 60 * 60;

/// Password-reset token lifetime in seconds (1h).
pub const PASSWORD_RESET_TTL_SECS: i64 = 60 * 60;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token is malformed")]
    Malformed,

    #[error("expected a {expected} token, found {found}")]
    WrongTokenKind { expected: TokenKind, found: String },

    #[error("token has expired")]
    Expired,

    #[error("token no longer matches the account password")]
    FingerprintMismatch,

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Issues and parses every token kind with one HMAC secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::new();

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign any claim set with the codec's key.
    pub(crate) fn sign<C: Serialize>(&self, claims: &C) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(TokenError::Signing)
    }

    /// Issue a 24h session token.
    pub fn issue_session_token(
        &self,
        user_id: UserId,
        roles: &BTreeSet<String>,
        is_active: bool,
    ) -> Result<String, TokenError> {
        let iat = Utc::now().timestamp();
        self.sign(&SessionClaims {
            sub: user_id.to_string(),
            roles: roles.iter().cloned().collect(),
            active: is_active,
            kind: TokenKind::Session,
            iat,
            exp: iat + SESSION_TTL_SECS,
        })
    }

    /// Issue a 24h verification token bound to the current password hash.
    pub fn issue_verification_token(
        &self,
        email: &str,
        current_password_hash: &str,
    ) -> Result<String, TokenError> {
        self.issue_credential_token(
            TokenKind::Verification,
            email,
            current_password_hash,
            VERIFICATION_TTL_SECS,
        )
    }

    /// Issue a 1h password-reset token bound to the current password hash.
    pub fn issue_password_reset_token(
        &self,
        email: &str,
        current_password_hash: &str,
    ) -> Result<String, TokenError> {
        self.issue_credential_token(
            TokenKind::PasswordReset,
            email,
            current_password_hash,
            PASSWORD_RESET_TTL_SECS,
        )
    }

    fn issue_credential_token(
        &self,
        kind: TokenKind,
        email: &str,
        current_password_hash: &str,
        ttl_secs: i64,
    ) -> Result<String, TokenError> {
        let iat = Utc::now().timestamp();
        self.sign(&CredentialClaims {
            email: email.to_string(),
            fingerprint: fingerprint(current_password_hash),
            kind,
            iat,
            exp: iat + ttl_secs,
        })
    }

    /// Verify a token and decode it as claims of the expected kind.
    pub fn parse_token<C: DeserializeOwned>(
        &self,
        token: &str,
        expected: TokenKind,
    ) -> Result<C, TokenError> {
        let payload = decode::<Value>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            })?
            .claims;

        let found = payload.get("type").and_then(Value::as_str);
        if found != Some(expected.as_str()) {
            return Err(TokenError::WrongTokenKind {
                expected,
                found: found.unwrap_or("none").to_string(),
            });
        }

        let exp = payload
            .get("exp")
            .and_then(Value::as_i64)
            .ok_or(TokenError::Malformed)?;
        if Utc::now().timestamp() > exp {
            return Err(TokenError::Expired);
        }

        serde_json::from_value(payload).map_err(|_| TokenError::Malformed)
    }

    pub fn parse_session_token(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.parse_token(token, TokenKind::Session)
    }

    pub fn parse_verification_token(&self, token: &str) -> Result<CredentialClaims, TokenError> {
        self.parse_token(token, TokenKind::Verification)
    }

    pub fn parse_password_reset_token(&self, token: &str) -> Result<CredentialClaims, TokenError> {
        self.parse_token(token, TokenKind::PasswordReset)
    }
}
