// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Token issuance and request authorization for the Trust API.
//!
//! ## Token Kinds
//!
//! | Kind | `type` claim | Lifetime | Carries |
//! |------|--------------|----------|---------|
//! | Session | `auth` | 24h | user id, roles, active flag |
//! | Verification | `verification` | 24h | email, password fingerprint |
//! | Password reset | `password-reset` | 1h | email, password fingerprint |
//!
//! All tokens are HS256 JWTs signed with `JWT_SECRET`.
//!
//! ## Auth Flow
//!
//! 1. Client logs in and receives a session token
//! 2. Client sends `Authorization: Bearer <token>`
//! 3. Server:
//!    - verifies signature, kind and expiry
//!    - re-checks the stored user (active, exact role set)
//!    - applies the route's role requirement
//!
//! Verification and reset tokens are single use without a revocation
//! store: they embed a fingerprint of the password hash current at
//! issuance, and redeeming one changes that hash.

pub mod claims;
pub mod codec;
pub mod error;
pub mod extractor;
pub mod fingerprint;
pub mod middleware;
pub mod password;
pub mod roles;

pub use claims::{AuthenticatedUser, CredentialClaims, SessionClaims, TokenKind};
pub use codec::{TokenCodec, TokenError};
pub use error::AuthError;
pub use extractor::Auth;
pub use fingerprint::fingerprint;
pub use middleware::{authorize, require_roles, RoleGate};
pub use roles::ADMIN_ROLE;
