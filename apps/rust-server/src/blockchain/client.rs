// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Read-only ledger client for on-chain role grants.

use std::future::Future;
use std::str::FromStr;

use alloy::{
    network::Ethereum,
    primitives::{Address, B256},
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
};

use super::access_control::AccessControlContract;

/// HTTP provider type (with the default fillers).
type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

/// Source of truth for role grants.
///
/// Implemented by [`OfferFactoryClient`] in production and by in-memory
/// fakes in tests.
pub trait RoleLedger: Send + Sync {
    /// Whether `wallet_address` holds `role_id` on the ledger.
    fn has_role(
        &self,
        wallet_address: &str,
        role_id: B256,
    ) -> impl Future<Output = Result<bool, LedgerError>> + Send;
}

/// Client for the OfferFactory contract's AccessControl roles.
pub struct OfferFactoryClient {
    provider: HttpProvider,
    contract: AccessControlContract<HttpProvider>,
}

impl OfferFactoryClient {
    /// Create a client for the contract at `contract_address`.
    ///
    /// No request is made here; connection problems surface on the first
    /// query.
    pub fn new(rpc_url: &str, contract_address: &str) -> Result<Self, LedgerError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| LedgerError::InvalidRpcUrl(e.to_string()))?;
        let address = parse_address(contract_address)?;

        let provider = ProviderBuilder::new().connect_http(url);
        let contract = AccessControlContract::new(&provider, address);

        Ok(Self { provider, contract })
    }

    /// Address of the OfferFactory contract.
    pub fn contract_address(&self) -> Address {
        self.contract.address()
    }

    /// Current block number, used to log connectivity at startup.
    pub async fn get_block_number(&self) -> Result<u64, LedgerError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| LedgerError::RpcError(e.to_string()))
    }
}

impl RoleLedger for OfferFactoryClient {
    async fn has_role(&self, wallet_address: &str, role_id: B256) -> Result<bool, LedgerError> {
        let account = parse_address(wallet_address)?;
        self.contract.has_role(role_id, account).await
    }
}

/// Parse a hex EVM address (with or without `0x`).
pub fn parse_address(address: &str) -> Result<Address, LedgerError> {
    Address::from_str(address.trim()).map_err(|e| LedgerError::InvalidAddress(e.to_string()))
}

/// Errors that can occur during ledger queries.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Contract error: {0}")]
    ContractError(String),

    #[error("Ledger query timed out")]
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_address_accepts_hex_forms() {
        let lower = parse_address("0x52908400098527886e0f7030069857d2e4169ee7").unwrap();
        let checksummed = parse_address("0x52908400098527886E0F7030069857D2E4169EE7").unwrap();
        assert_eq!(lower, checksummed);
    }

    #[test]
    fn parse_address_rejects_garbage() {
        assert!(matches!(
            parse_address("0x1234"),
            Err(LedgerError::InvalidAddress(_))
        ));
        assert!(matches!(
            parse_address("not-an-address"),
            Err(LedgerError::InvalidAddress(_))
        ));
    }

    #[test]
    fn client_rejects_bad_configuration() {
        assert!(matches!(
            OfferFactoryClient::new("not a url", "0x52908400098527886e0f7030069857d2e4169ee7"),
            Err(LedgerError::InvalidRpcUrl(_))
        ));
        assert!(matches!(
            OfferFactoryClient::new("http://localhost:8545", "0xnope"),
            Err(LedgerError::InvalidAddress(_))
        ));
    }

    #[test]
    fn client_builds_without_network_access() {
        let client = OfferFactoryClient::new(
            "http://localhost:8545",
            "0x52908400098527886e0f7030069857d2e4169ee7",
        )
        .unwrap();
        assert_eq!(
            client.contract_address(),
            parse_address("0x52908400098527886e0f7030069857d2e4169ee7").unwrap()
        );
    }
}
