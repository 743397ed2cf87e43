// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::TokenCodec;
use crate::notify::Mailer;
use crate::storage::UserDatabase;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<UserDatabase>,
    pub tokens: Arc<TokenCodec>,
    pub mailer: Arc<dyn Mailer>,
    /// Base URL used in activation and reset links
    pub frontend_url: Arc<str>,
}

impl AppState {
    pub fn new(
        db: Arc<UserDatabase>,
        tokens: TokenCodec,
        mailer: Arc<dyn Mailer>,
        frontend_url: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            db,
            tokens: Arc::new(tokens),
            mailer,
            frontend_url: frontend_url.into(),
        }
    }
}
