// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OpenZeppelin AccessControl contract interactions.

use alloy::{
    primitives::{Address, B256},
    providers::Provider,
    sol,
};

use super::client::LedgerError;

// Only the read side of AccessControl is needed; grants are managed on-chain.
sol! {
    #[sol(rpc)]
    interface IAccessControl {
        function hasRole(bytes32 role, address account) external view returns (bool);
    }
}

/// AccessControl contract wrapper.
pub struct AccessControlContract<P> {
    contract: IAccessControl::IAccessControlInstance<P>,
}

impl<P: Provider + Clone> AccessControlContract<P> {
    pub fn new(provider: &P, address: Address) -> Self {
        Self {
            contract: IAccessControl::new(address, provider.clone()),
        }
    }

    /// Whether `account` currently holds `role`.
    pub async fn has_role(&self, role: B256, account: Address) -> Result<bool, LedgerError> {
        self.contract
            .hasRole(role, account)
            .call()
            .await
            .map_err(|e| LedgerError::ContractError(e.to_string()))
    }

    /// Address of the contract this wrapper calls.
    pub fn address(&self) -> Address {
        *self.contract.address()
    }
}
