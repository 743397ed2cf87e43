// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request field validation.

use crate::auth::password::validate_password;
use crate::error::ApiError;

/// Basic `local@domain.tld` shape check.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// E.164-style phone number: optional `+`, then 2 to 15 digits, no leading 0.
pub fn is_valid_phone_number(phone: &str) -> bool {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    (2..=15).contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit())
        && !digits.starts_with('0')
}

pub fn require_email(email: &str) -> Result<(), ApiError> {
    if email.trim().is_empty() {
        return Err(ApiError::unprocessable("Email is required"));
    }
    if !is_valid_email(email) {
        return Err(ApiError::bad_request("email is not a valid email address"));
    }
    Ok(())
}

pub fn require_phone_number(phone: &str) -> Result<(), ApiError> {
    if !is_valid_phone_number(phone) {
        return Err(ApiError::bad_request("phoneNumber is not a valid phone number"));
    }
    Ok(())
}

/// Apply the password policy; all failures are joined into one message.
pub fn require_strong_password(password: &str) -> Result<(), ApiError> {
    if password.is_empty() {
        return Err(ApiError::unprocessable("New password is required"));
    }
    let errors = validate_password(password);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "password {}",
            errors.join(", ")
        )))
    }
}

pub fn require_non_empty(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        Err(ApiError::unprocessable(format!("{field} is required")))
    } else {
        Ok(())
    }
}
