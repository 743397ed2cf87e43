// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent storage for users, roles and their associations, kept in a
//! single embedded redb database.
//!
//! ## Storage Layout
//!
//! ```text
//! {DATA_DIR}/
//!   users.redb
//!     users        # user id -> StoredUser (JSON)
//!     user_emails  # normalized email -> user id
//!     roles        # role name -> StoredRole (JSON)
//!     meta         # id counter
//! ```
//!
//! ## Important Notes
//!
//! - Emails are stored NFKC-normalized and lowercased; lookups normalize too
//! - A user's role set is exact: the authorization layer compares it for
//!   equality against the roles claimed in a session token
//! - Removing a role association is idempotent

pub mod models;
pub mod user_database;

pub use models::{
    normalize_email, normalize_role_name, NewUser, ProfileUpdate, StoredRole, StoredUser, UserId,
    UserProfile, UserView,
};
pub use user_database::{StoreError, StoreResult, UserDatabase};
