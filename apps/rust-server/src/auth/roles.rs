// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Role names and matching rules.
//!
//! ## Well-known Roles
//!
//! - `admin` - Full access; satisfies every role requirement
//! - `tender` - Publishes tenders (offers)
//! - `entrepreneur` - Submits proposals
//! - `expert` - Reviews proposals
//!
//! Roles are plain strings so administrators can create new ones at
//! runtime; the constants below are the ones seeded at startup.

use std::collections::BTreeSet;

pub const ADMIN_ROLE: &str = "admin";
pub const TENDER_ROLE: &str = "tender";
pub const ENTREPRENEUR_ROLE: &str = "entrepreneur";
pub const EXPERT_ROLE: &str = "expert";

/// Roles inserted into an empty database.
pub const SEEDED_ROLES: [&str; 4] = [ADMIN_ROLE, TENDER_ROLE, ENTREPRENEUR_ROLE, EXPERT_ROLE];

/// Any-of role check with admin override.
///
/// An empty requirement always passes. Otherwise the holder passes if it
/// holds `admin` or at least one of the required roles.
pub fn has_any_role<S: AsRef<str>>(held: &BTreeSet<String>, required: &[S]) -> bool {
    if required.is_empty() || held.contains(ADMIN_ROLE) {
        return true;
    }
    required.iter().any(|role| held.contains(role.as_ref()))
}

/// Exact set equality between claimed and stored roles.
pub fn roles_match<S: AsRef<str>>(claimed: &[S], stored: &BTreeSet<String>) -> bool {
    let claimed: BTreeSet<&str> = claimed.iter().map(AsRef::as_ref).collect();
    claimed.len() == stored.len() && stored.iter().all(|r| claimed.contains(r.as_str()))
}
