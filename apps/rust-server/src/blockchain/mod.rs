// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain integration for on-chain role grants.
//!
//! This module provides functionality for:
//! - Mapping local role names to AccessControl role ids
//! - Querying `hasRole` on the OfferFactory contract

pub mod access_control;
pub mod client;
pub mod roles;

pub use client::{parse_address, LedgerError, OfferFactoryClient, RoleLedger};
pub use roles::role_identifier;
