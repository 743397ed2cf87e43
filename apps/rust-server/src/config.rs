// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, their defaults, and the
//! [`AppConfig`] loaded once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `JWT_SECRET` | HMAC secret for all issued tokens | Required |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `3080` |
//! | `DATA_DIR` | Directory holding `users.redb` | `./data` |
//! | `BLOCKCHAIN_RPC_URL` | JSON-RPC endpoint of the EVM node | `http://localhost:8545` |
//! | `OFFER_FACTORY_ADDRESS` | AccessControl contract holding role grants | Optional (sync disabled) |
//! | `ROLE_SYNC_INTERVAL_SECS` | Seconds between reconciliation sweeps (`0` = startup only) | `3600` |
//! | `LEDGER_TIMEOUT_SECS` | Timeout for a single `hasRole` query (must be > 0) | `10` |
//! | `FRONTEND_URL` | Base URL used in activation/reset links | `http://localhost:3000` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; both set enables HTTPS | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable name for the token signing secret.
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the data directory path.
///
/// The user database lives at `{DATA_DIR}/users.redb`.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const BLOCKCHAIN_RPC_URL_ENV: &str = "BLOCKCHAIN_RPC_URL";

/// Environment variable name for the OfferFactory contract address.
///
/// When unset the reconciliation sweep is not started.
pub const OFFER_FACTORY_ADDRESS_ENV: &str = "OFFER_FACTORY_ADDRESS";

pub const ROLE_SYNC_INTERVAL_ENV: &str = "ROLE_SYNC_INTERVAL_SECS";
pub const LEDGER_TIMEOUT_ENV: &str = "LEDGER_TIMEOUT_SECS";
pub const FRONTEND_URL_ENV: &str = "FRONTEND_URL";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3080;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
pub const DEFAULT_ROLE_SYNC_INTERVAL: Duration = Duration::from_secs(3600);
pub const DEFAULT_LEDGER_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration errors surfaced at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Process-wide configuration, loaded once in `main`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub rpc_url: String,
    pub offer_factory_address: Option<String>,
    pub role_sync_interval: Duration,
    pub ledger_timeout: Duration,
    pub frontend_url: String,
    pub tls: Option<TlsPaths>,
}

/// PEM certificate chain and private key for HTTPS.
#[derive(Debug, Clone)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary lookup (used by tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup(JWT_SECRET_ENV)
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;

        let port = match lookup(PORT_ENV) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: PORT_ENV,
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        let role_sync_interval =
            parse_secs(&lookup, ROLE_SYNC_INTERVAL_ENV)?.unwrap_or(DEFAULT_ROLE_SYNC_INTERVAL);
        let ledger_timeout = match parse_secs(&lookup, LEDGER_TIMEOUT_ENV)? {
            // Zero would time out every lookup
            Some(timeout) if timeout.is_zero() => {
                return Err(ConfigError::Invalid {
                    name: LEDGER_TIMEOUT_ENV,
                    value: "0".to_string(),
                })
            }
            Some(timeout) => timeout,
            None => DEFAULT_LEDGER_TIMEOUT,
        };

        let tls = match (lookup(TLS_CERT_PATH_ENV), lookup(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
        };

        Ok(Self {
            jwt_secret,
            host: lookup(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            data_dir: lookup(DATA_DIR_ENV)
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
                .into(),
            rpc_url: lookup(BLOCKCHAIN_RPC_URL_ENV).unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            offer_factory_address: lookup(OFFER_FACTORY_ADDRESS_ENV)
                .filter(|s| !s.trim().is_empty()),
            role_sync_interval,
            ledger_timeout,
            frontend_url: lookup(FRONTEND_URL_ENV)
                .unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string()),
            tls,
        })
    }

    /// Path of the embedded user database.
    pub fn user_db_path(&self) -> PathBuf {
        self.data_dir.join("users.redb")
    }
}

fn parse_secs<F>(lookup: &F, name: &'static str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        None => Ok(None),
    }
}
