// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Trust Server - Tender Management Backend
//!
//! Accounts and role-based authorization for the tender platform, with a
//! background job that reconciles locally stored roles against the
//! OfferFactory AccessControl contract.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token codec, password handling and authorization middleware
//! - `blockchain` - Read-only AccessControl client
//! - `role_sync` - Periodic role reconciliation sweep
//! - `storage` - Embedded user and role database (redb)

pub mod api;
pub mod auth;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod notify;
pub mod role_sync;
pub mod state;
pub mod storage;
