// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Role Reconciliation
//!
//! Background task that cross-checks every locally assigned role against the
//! OfferFactory AccessControl contract and revokes roles the ledger no
//! longer grants.
//!
//! ## Strategy
//!
//! Each sweep:
//! 1. Loads all users. A load failure aborts the sweep.
//! 2. Skips users without a wallet address (never queried, never mutated).
//! 3. For every `(user, role)` pair asks the ledger `hasRole`, bounded by a
//!    per-query timeout.
//!    - `true`: the role stays.
//!    - `false`: the association is removed.
//!    - error or timeout: logged, the role stays (fail-open).
//!
//! The ledger only ever revokes: roles granted on-chain but missing locally
//! are not added.
//!
//! Sessions issued before a revocation stop working on their next request,
//! because the authorization middleware compares claimed roles with the
//! stored set.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown. A sweep
//! in progress finishes the pair it is on before the token is observed.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::blockchain::{role_identifier, LedgerError, RoleLedger};
use crate::config::{DEFAULT_LEDGER_TIMEOUT, DEFAULT_ROLE_SYNC_INTERVAL};
use crate::storage::{StoreError, UserDatabase};

/// Outcome counters of a single sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Users loaded from the store
    pub users_scanned: usize,
    /// Users without a wallet address
    pub users_skipped: usize,
    pub roles_confirmed: usize,
    pub roles_revoked: usize,
    /// Ledger errors and timeouts (role kept)
    pub lookup_failures: usize,
    /// Store errors while removing a denied role
    pub removal_failures: usize,
}

/// Reconciles stored roles against a [`RoleLedger`].
pub struct RoleReconciler<L> {
    db: Arc<UserDatabase>,
    ledger: Arc<L>,
    query_timeout: Duration,
    interval: Duration,
}

impl<L: RoleLedger> RoleReconciler<L> {
    pub fn new(db: Arc<UserDatabase>, ledger: Arc<L>) -> Self {
        Self {
            db,
            ledger,
            query_timeout: DEFAULT_LEDGER_TIMEOUT,
            interval: DEFAULT_ROLE_SYNC_INTERVAL,
        }
    }

    /// Timeout applied to each `hasRole` query.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Delay between sweeps; zero runs a single sweep at startup.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run the reconciliation loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(reconciler.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            query_timeout_secs = self.query_timeout.as_secs(),
            "Role reconciliation starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Role reconciliation shutting down");
                return;
            }

            match self.sweep().await {
                Ok(report) => info!(
                    users_scanned = report.users_scanned,
                    users_skipped = report.users_skipped,
                    roles_confirmed = report.roles_confirmed,
                    roles_revoked = report.roles_revoked,
                    lookup_failures = report.lookup_failures,
                    removal_failures = report.removal_failures,
                    "Role reconciliation sweep complete"
                ),
                Err(e) => error!(error = %e, "Role reconciliation sweep aborted"),
            }

            if self.interval.is_zero() {
                info!("Role reconciliation configured for startup only");
                return;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Role reconciliation shutting down");
                    return;
                }
            }
        }
    }

    /// Execute one sweep over all users.
    pub async fn sweep(&self) -> Result<SweepReport, StoreError> {
        let users = self.db.list_users()?;
        let mut report = SweepReport {
            users_scanned: users.len(),
            ..SweepReport::default()
        };

        for user in users {
            let Some(wallet) = user.wallet_address.as_deref() else {
                report.users_skipped += 1;
                continue;
            };

            for role in &user.roles {
                let role_id = role_identifier(role);

                match self.query(wallet, role_id).await {
                    Ok(true) => {
                        report.roles_confirmed += 1;
                        debug!(user_id = user.id, role = %role, "Role confirmed on-chain");
                    }
                    Ok(false) => match self.db.remove_user_role(user.id, role) {
                        Ok(_) => {
                            report.roles_revoked += 1;
                            info!(
                                user_id = user.id,
                                wallet = %wallet,
                                role = %role,
                                "Revoked role not granted on-chain"
                            );
                        }
                        Err(e) => {
                            report.removal_failures += 1;
                            warn!(
                                user_id = user.id,
                                role = %role,
                                error = %e,
                                "Failed to remove role not granted on-chain"
                            );
                        }
                    },
                    Err(e) => {
                        report.lookup_failures += 1;
                        warn!(
                            user_id = user.id,
                            wallet = %wallet,
                            role = %role,
                            error = %e,
                            "Ledger lookup failed, keeping role"
                        );
                    }
                }
            }
        }

        Ok(report)
    }

    async fn query(
        &self,
        wallet: &str,
        role_id: alloy::primitives::B256,
    ) -> Result<bool, LedgerError> {
        let lookup = self.ledger.has_role(wallet, role_id);
        match tokio::time::timeout(self.query_timeout, lookup).await {
            Ok(result) => result,
            Err(_) => Err(LedgerError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::roles::SEEDED_ROLES;
    use crate::storage::NewUser;
    use alloy::primitives::B256;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use tempfile::TempDir;

    const WALLET_A: &str = "0x1111111111111111111111111111111111111111";
    const WALLET_B: &str = "0x2222222222222222222222222222222222222222";

    #[derive(Default)]
    struct FakeLedger {
        grants: HashMap<(String, B256), bool>,
        failing: HashSet<(String, B256)>,
        hanging: HashSet<(String, B256)>,
        calls: Mutex<Vec<(String, B256)>>,
    }

    impl FakeLedger {
        fn grant(mut self, wallet: &str, role: &str, granted: bool) -> Self {
            self.grants
                .insert((wallet.to_string(), role_identifier(role)), granted);
            self
        }

        fn failing(mut self, wallet: &str, role: &str) -> Self {
            self.failing.insert((wallet.to_string(), role_identifier(role)));
            self
        }

        fn hanging(mut self, wallet: &str, role: &str) -> Self {
            self.hanging.insert((wallet.to_string(), role_identifier(role)));
            self
        }

        fn calls(&self) -> Vec<(String, B256)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl RoleLedger for FakeLedger {
        async fn has_role(&self, wallet_address: &str, role_id: B256) -> Result<bool, LedgerError> {
            let key = (wallet_address.to_string(), role_id);
            self.calls.lock().unwrap().push(key.clone());

            if self.hanging.contains(&key) {
                std::future::pending::<()>().await;
            }
            if self.failing.contains(&key) {
                return Err(LedgerError::RpcError("connection refused".to_string()));
            }
            Ok(self.grants.get(&key).copied().unwrap_or(false))
        }
    }

    fn temp_db() -> (Arc<UserDatabase>, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = UserDatabase::open(&dir.path().join("users.redb")).unwrap();
        db.seed_roles(&SEEDED_ROLES).unwrap();
        (Arc::new(db), dir)
    }

    fn add_user(db: &UserDatabase, email: &str, roles: &[&str], wallet: Option<&str>) -> u64 {
        let user = db
            .create_user(NewUser {
                email: email.to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                phone_number: None,
                password_hash: "hash".to_string(),
                roles: roles.iter().map(|r| r.to_string()).collect(),
            })
            .unwrap();
        if let Some(wallet) = wallet {
            db.set_wallet_address(user.id, wallet).unwrap();
        }
        user.id
    }

    fn stored_roles(db: &UserDatabase, id: u64) -> Vec<String> {
        db.get_user(id).unwrap().unwrap().role_names()
    }

    #[tokio::test]
    async fn denied_role_is_revoked_confirmed_role_kept() {
        let (db, _dir) = temp_db();
        let id = add_user(&db, "a@example.com", &["tender", "expert"], Some(WALLET_A));

        let ledger = FakeLedger::default()
            .grant(WALLET_A, "tender", true)
            .grant(WALLET_A, "expert", false);
        let reconciler = RoleReconciler::new(db.clone(), Arc::new(ledger));

        let report = reconciler.sweep().await.unwrap();
        assert_eq!(stored_roles(&db, id), vec!["tender".to_string()]);
        assert_eq!(report.roles_confirmed, 1);
        assert_eq!(report.roles_revoked, 1);
        assert_eq!(report.lookup_failures, 0);
    }

    #[tokio::test]
    async fn ledger_error_keeps_role_and_continues() {
        let (db, _dir) = temp_db();
        let a = add_user(&db, "a@example.com", &["expert", "tender"], Some(WALLET_A));
        let b = add_user(&db, "b@example.com", &["expert"], Some(WALLET_B));

        let ledger = FakeLedger::default()
            .failing(WALLET_A, "expert")
            .grant(WALLET_A, "tender", false)
            .grant(WALLET_B, "expert", false);
        let reconciler = RoleReconciler::new(db.clone(), Arc::new(ledger));

        let report = reconciler.sweep().await.unwrap();
        assert_eq!(stored_roles(&db, a), vec!["expert".to_string()]);
        assert!(stored_roles(&db, b).is_empty());
        assert_eq!(report.lookup_failures, 1);
        assert_eq!(report.roles_revoked, 2);
    }

    #[tokio::test]
    async fn timeout_is_treated_as_lookup_failure() {
        let (db, _dir) = temp_db();
        let a = add_user(&db, "a@example.com", &["tender"], Some(WALLET_A));
        let b = add_user(&db, "b@example.com", &["tender"], Some(WALLET_B));

        let ledger = FakeLedger::default()
            .hanging(WALLET_A, "tender")
            .grant(WALLET_B, "tender", false);
        let reconciler = RoleReconciler::new(db.clone(), Arc::new(ledger))
            .with_query_timeout(Duration::from_millis(50));

        let report = reconciler.sweep().await.unwrap();
        assert_eq!(stored_roles(&db, a), vec!["tender".to_string()]);
        assert!(stored_roles(&db, b).is_empty());
        assert_eq!(report.lookup_failures, 1);
    }

    #[tokio::test]
    async fn users_without_wallet_are_never_queried() {
        let (db, _dir) = temp_db();
        let id = add_user(&db, "nowallet@example.com", &["tender", "expert"], None);

        let ledger = Arc::new(FakeLedger::default());
        let reconciler = RoleReconciler::new(db.clone(), ledger.clone());

        let report = reconciler.sweep().await.unwrap();
        assert!(ledger.calls().is_empty());
        assert_eq!(stored_roles(&db, id), vec!["expert".to_string(), "tender".to_string()]);
        assert_eq!(report.users_scanned, 1);
        assert_eq!(report.users_skipped, 1);
    }

    #[tokio::test]
    async fn admin_is_checked_against_default_admin_role() {
        let (db, _dir) = temp_db();
        let id = add_user(&db, "root@example.com", &["admin"], Some(WALLET_A));

        let ledger = Arc::new(FakeLedger::default().grant(WALLET_A, "admin", true));
        let reconciler = RoleReconciler::new(db.clone(), ledger.clone());

        reconciler.sweep().await.unwrap();
        assert_eq!(ledger.calls(), vec![(WALLET_A.to_string(), B256::ZERO)]);
        assert_eq!(stored_roles(&db, id), vec!["admin".to_string()]);
    }

    #[tokio::test]
    async fn second_sweep_is_a_no_op() {
        let (db, _dir) = temp_db();
        add_user(&db, "a@example.com", &["expert"], Some(WALLET_A));

        let reconciler = RoleReconciler::new(db.clone(), Arc::new(FakeLedger::default()));
        assert_eq!(reconciler.sweep().await.unwrap().roles_revoked, 1);

        let second = reconciler.sweep().await.unwrap();
        assert_eq!(second.roles_revoked, 0);
        assert_eq!(second.removal_failures, 0);
    }

    #[tokio::test]
    async fn run_with_zero_interval_sweeps_once_and_returns() {
        let (db, _dir) = temp_db();
        let id = add_user(&db, "a@example.com", &["expert"], Some(WALLET_A));

        let reconciler = RoleReconciler::new(db.clone(), Arc::new(FakeLedger::default()))
            .with_interval(Duration::ZERO);
        reconciler.run(CancellationToken::new()).await;

        assert!(stored_roles(&db, id).is_empty());
    }

    #[tokio::test]
    async fn run_exits_when_cancelled() {
        let (db, _dir) = temp_db();
        let shutdown = CancellationToken::new();
        let reconciler = RoleReconciler::new(db, Arc::new(FakeLedger::default()))
            .with_interval(Duration::from_secs(3600));

        let handle = tokio::spawn(reconciler.run(shutdown.clone()));
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("reconciler did not stop")
            .unwrap();
    }
}
