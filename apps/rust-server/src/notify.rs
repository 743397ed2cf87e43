// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Outbound account notifications.
//!
//! Only the link matters to the backend: the frontend renders the page the
//! link opens. The default [`TracingMailer`] logs the notification instead
//! of delivering it.

use std::fmt;

/// What a notification asks the recipient to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailKind {
    AccountActivation,
    PasswordReset,
}

impl MailKind {
    pub fn subject(&self) -> &'static str {
        match self {
            MailKind::AccountActivation => "Account Verification",
            MailKind::PasswordReset => "Password Reset Request",
        }
    }
}

/// A notification ready to hand to a [`Mailer`].
#[derive(Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub kind: MailKind,
    /// Frontend URL carrying the token
    pub link: String,
}

impl OutgoingMail {
    /// Activation mail: `{frontend}/account-activation?token=...`.
    pub fn activation(frontend_url: &str, to: &str, token: &str) -> Self {
        Self {
            to: to.to_string(),
            kind: MailKind::AccountActivation,
            link: format!(
                "{}/account-activation?token={token}",
                frontend_url.trim_end_matches('/')
            ),
        }
    }

    /// Reset mail: `{frontend}/reset-password?token=...`.
    pub fn password_reset(frontend_url: &str, to: &str, token: &str) -> Self {
        Self {
            to: to.to_string(),
            kind: MailKind::PasswordReset,
            link: format!(
                "{}/reset-password?token={token}",
                frontend_url.trim_end_matches('/')
            ),
        }
    }
}

// Links carry bearer credentials; keep them out of Debug output.
impl fmt::Debug for OutgoingMail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutgoingMail")
            .field("to", &self.to)
            .field("kind", &self.kind)
            .field("link", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

/// Delivery channel for account notifications.
pub trait Mailer: Send + Sync {
    fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// Mailer that writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMailer;

impl Mailer for TracingMailer {
    fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        tracing::info!(
            to = %mail.to,
            subject = mail.kind.subject(),
            link = %mail.link,
            "Account notification"
        );
        Ok(())
    }
}

/// Mailer that keeps every notification in memory.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: std::sync::Mutex<Vec<OutgoingMail>>,
}

#[cfg(test)]
impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }

    /// Token embedded in the most recent link of the given kind.
    pub fn last_token(&self, kind: MailKind) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|m| m.kind == kind)
            .and_then(|m| m.link.split("token=").nth(1).map(str::to_string))
    }
}

#[cfg(test)]
impl Mailer for RecordingMailer {
    fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}
