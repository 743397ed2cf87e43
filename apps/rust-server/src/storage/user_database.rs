// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded user database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user id → serialized StoredUser
//! - `user_emails`: normalized email → user id
//! - `roles`: role name → serialized StoredRole
//! - `meta`: key → u64 (id counter)
//!
//! Every mutating operation runs in exactly one write transaction, so a
//! role removal from the reconciliation sweep and a request handler never
//! observe a half-applied change.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::auth::fingerprint;

use super::models::{
    normalize_email, normalize_role_name, NewUser, ProfileUpdate, StoredRole, StoredUser, UserId,
};

// =============================================================================
// Table Definitions
// =============================================================================

const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");

const USER_EMAILS: TableDefinition<&str, u64> = TableDefinition::new("user_emails");

const ROLES: TableDefinition<&str, &[u8]> = TableDefinition::new("roles");

const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const NEXT_USER_ID_KEY: &str = "next_user_id";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// The stored password changed since the credential was issued.
    #[error("credential no longer matches user {0}")]
    StaleCredential(UserId),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// UserDatabase
// =============================================================================

/// Users, roles and their associations.
pub struct UserDatabase {
    db: Database,
}

impl UserDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USER_EMAILS)?;
            let _ = write_txn.open_table(ROLES)?;
            let _ = write_txn.open_table(META)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Insert the given roles if they do not exist yet.
    pub fn seed_roles(&self, names: &[&str]) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut roles = write_txn.open_table(ROLES)?;
            for name in names {
                let name = normalize_role_name(name);
                if roles.get(name.as_str())?.is_none() {
                    let role = StoredRole {
                        name: name.clone(),
                        created_at: Utc::now(),
                    };
                    let json = serde_json::to_vec(&role)?;
                    roles.insert(name.as_str(), json.as_slice())?;
                }
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Cheap read used by readiness probes.
    pub fn health_check(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(USERS)?;
        Ok(())
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Create a user; fails with `Conflict` if the email is taken and
    /// `NotFound` if any requested role does not exist.
    pub fn create_user(&self, new_user: NewUser) -> StoreResult<StoredUser> {
        let email = normalize_email(&new_user.email);
        let write_txn = self.db.begin_write()?;
        let user = {
            let mut emails = write_txn.open_table(USER_EMAILS)?;
            if emails.get(email.as_str())?.is_some() {
                return Err(StoreError::Conflict(format!(
                    "An account with email {email} already exists"
                )));
            }

            let roles_table = write_txn.open_table(ROLES)?;
            let mut roles = BTreeSet::new();
            for role in &new_user.roles {
                let role = normalize_role_name(role);
                if roles_table.get(role.as_str())?.is_none() {
                    return Err(StoreError::NotFound(format!("Role {role}")));
                }
                roles.insert(role);
            }

            let mut meta = write_txn.open_table(META)?;
            let id = meta
                .get(NEXT_USER_ID_KEY)?
                .map(|v| v.value())
                .unwrap_or(1);
            meta.insert(NEXT_USER_ID_KEY, id + 1)?;

            let now = Utc::now();
            let user = StoredUser {
                id,
                email: email.clone(),
                first_name: new_user.first_name,
                last_name: new_user.last_name,
                phone_number: new_user.phone_number,
                password_hash: new_user.password_hash,
                is_active: false,
                roles,
                wallet_address: None,
                created_at: now,
                updated_at: now,
            };

            let json = serde_json::to_vec(&user)?;
            let mut users = write_txn.open_table(USERS)?;
            users.insert(id, json.as_slice())?;
            emails.insert(email.as_str(), id)?;
            user
        };
        write_txn.commit()?;
        Ok(user)
    }

    /// Look up a user by id.
    pub fn get_user(&self, id: UserId) -> StoreResult<Option<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Look up a user by email (normalized before lookup).
    pub fn find_user_by_email(&self, email: &str) -> StoreResult<Option<StoredUser>> {
        let email = normalize_email(email);
        let read_txn = self.db.begin_read()?;
        let emails = read_txn.open_table(USER_EMAILS)?;
        let Some(id) = emails.get(email.as_str())?.map(|v| v.value()) else {
            return Ok(None);
        };
        let users = read_txn.open_table(USERS)?;
        match users.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All users, ordered by id.
    pub fn list_users(&self) -> StoreResult<Vec<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        let mut users = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            users.push(serde_json::from_slice(value.value())?);
        }
        Ok(users)
    }

    /// Case-insensitive substring search over email, names and phone number.
    ///
    /// `page` is 1-based. Returns the requested page and the total number of
    /// matches.
    pub fn search_users(
        &self,
        search: Option<&str>,
        page: usize,
        limit: usize,
    ) -> StoreResult<(Vec<StoredUser>, usize)> {
        let needle = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let matches: Vec<StoredUser> = self
            .list_users()?
            .into_iter()
            .filter(|user| match &needle {
                Some(needle) => {
                    user.email.contains(needle.as_str())
                        || user.first_name.to_lowercase().contains(needle.as_str())
                        || user.last_name.to_lowercase().contains(needle.as_str())
                        || user
                            .phone_number
                            .as_deref()
                            .is_some_and(|p| p.contains(needle.as_str()))
                }
                None => true,
            })
            .collect();

        let total = matches.len();
        let offset = page.saturating_sub(1).saturating_mul(limit);
        let page_items = matches.into_iter().skip(offset).take(limit).collect();
        Ok((page_items, total))
    }

    /// Read-modify-write a user record inside one write transaction.
    fn modify_user<F>(&self, id: UserId, apply: F) -> StoreResult<StoredUser>
    where
        F: FnOnce(&mut StoredUser) -> StoreResult<()>,
    {
        let write_txn = self.db.begin_write()?;
        let user = {
            let mut users = write_txn.open_table(USERS)?;
            let bytes = users
                .get(id)?
                .map(|v| v.value().to_vec())
                .ok_or_else(|| StoreError::NotFound(format!("User {id}")))?;
            let mut user: StoredUser = serde_json::from_slice(&bytes)?;
            apply(&mut user)?;
            user.updated_at = Utc::now();
            let json = serde_json::to_vec(&user)?;
            users.insert(id, json.as_slice())?;
            user
        };
        write_txn.commit()?;
        Ok(user)
    }

    pub fn update_profile(&self, id: UserId, update: ProfileUpdate) -> StoreResult<StoredUser> {
        self.modify_user(id, |user| {
            if let Some(first_name) = update.first_name {
                user.first_name = first_name;
            }
            if let Some(last_name) = update.last_name {
                user.last_name = last_name;
            }
            if let Some(phone_number) = update.phone_number {
                user.phone_number = Some(phone_number).filter(|p| !p.is_empty());
            }
            Ok(())
        })
    }

    /// Change a user's email, keeping the email index consistent.
    pub fn update_email(&self, id: UserId, new_email: &str) -> StoreResult<StoredUser> {
        let new_email = normalize_email(new_email);
        let write_txn = self.db.begin_write()?;
        let user = {
            let mut emails = write_txn.open_table(USER_EMAILS)?;
            if let Some(owner) = emails.get(new_email.as_str())?.map(|v| v.value()) {
                if owner != id {
                    return Err(StoreError::Conflict(format!(
                        "An account with email {new_email} already exists"
                    )));
                }
            }

            let mut users = write_txn.open_table(USERS)?;
            let bytes = users
                .get(id)?
                .map(|v| v.value().to_vec())
                .ok_or_else(|| StoreError::NotFound(format!("User {id}")))?;
            let mut user: StoredUser = serde_json::from_slice(&bytes)?;

            emails.remove(user.email.as_str())?;
            emails.insert(new_email.as_str(), id)?;

            user.email = new_email;
            user.updated_at = Utc::now();
            let json = serde_json::to_vec(&user)?;
            users.insert(id, json.as_slice())?;
            user
        };
        write_txn.commit()?;
        Ok(user)
    }

    /// Set the first real password and mark the account active.
    pub fn activate_user(&self, id: UserId, password_hash: String) -> StoreResult<StoredUser> {
        self.modify_user(id, |user| {
            user.password_hash = password_hash;
            user.is_active = true;
            Ok(())
        })
    }

    /// Replace the password hash only while the stored hash still has
    /// `expected_fingerprint`.
    ///
    /// Any outstanding verification or reset token stops matching the
    /// user's password fingerprint once this commits.
    ///
    /// The compare and the write share one write transaction, so a
    /// verification or reset credential is consumed at most once.
    pub fn set_password_hash_if(
        &self,
        id: UserId,
        expected_fingerprint: &str,
        password_hash: String,
    ) -> StoreResult<StoredUser> {
        self.replace_password_if(id, expected_fingerprint, password_hash, false)
    }

    /// [`Self::activate_user`] guarded like [`Self::set_password_hash_if`].
    pub fn activate_user_if(
        &self,
        id: UserId,
        expected_fingerprint: &str,
        password_hash: String,
    ) -> StoreResult<StoredUser> {
        self.replace_password_if(id, expected_fingerprint, password_hash, true)
    }

    fn replace_password_if(
        &self,
        id: UserId,
        expected_fingerprint: &str,
        password_hash: String,
        activate: bool,
    ) -> StoreResult<StoredUser> {
        self.modify_user(id, |user| {
            if fingerprint(&user.password_hash) != expected_fingerprint {
                return Err(StoreError::StaleCredential(id));
            }
            user.password_hash = password_hash;
            if activate {
                user.is_active = true;
            }
            Ok(())
        })
    }

    /// Attach a wallet address; a wallet can only be set once.
    pub fn set_wallet_address(&self, id: UserId, address: &str) -> StoreResult<StoredUser> {
        self.modify_user(id, |user| {
            if user.wallet_address.is_some() {
                return Err(StoreError::Conflict(
                    "This user already has a wallet associated with the account".to_string(),
                ));
            }
            user.wallet_address = Some(address.to_string());
            Ok(())
        })
    }

    pub fn delete_user(&self, id: UserId) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut users = write_txn.open_table(USERS)?;
            let bytes = users
                .remove(id)?
                .map(|v| v.value().to_vec())
                .ok_or_else(|| StoreError::NotFound(format!("User {id}")))?;
            let user: StoredUser = serde_json::from_slice(&bytes)?;

            let mut emails = write_txn.open_table(USER_EMAILS)?;
            emails.remove(user.email.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    // =========================================================================
    // User ↔ Role associations
    // =========================================================================

    /// Assign an existing role to a user.
    pub fn add_user_role(&self, id: UserId, role_name: &str) -> StoreResult<StoredUser> {
        let role_name = normalize_role_name(role_name);
        let write_txn = self.db.begin_write()?;
        let user = {
            let roles = write_txn.open_table(ROLES)?;
            if roles.get(role_name.as_str())?.is_none() {
                return Err(StoreError::NotFound(format!("Role {role_name}")));
            }

            let mut users = write_txn.open_table(USERS)?;
            let bytes = users
                .get(id)?
                .map(|v| v.value().to_vec())
                .ok_or_else(|| StoreError::NotFound(format!("User {id}")))?;
            let mut user: StoredUser = serde_json::from_slice(&bytes)?;
            if !user.roles.insert(role_name.clone()) {
                return Err(StoreError::Conflict(format!(
                    "User {id} already has role {role_name}"
                )));
            }
            user.updated_at = Utc::now();
            let json = serde_json::to_vec(&user)?;
            users.insert(id, json.as_slice())?;
            user
        };
        write_txn.commit()?;
        Ok(user)
    }

    /// Remove a role from a user.
    ///
    /// Idempotent: returns `Ok(false)` when the user did not hold the role.
    pub fn remove_user_role(&self, id: UserId, role_name: &str) -> StoreResult<bool> {
        let role_name = normalize_role_name(role_name);
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut users = write_txn.open_table(USERS)?;
            let bytes = users
                .get(id)?
                .map(|v| v.value().to_vec())
                .ok_or_else(|| StoreError::NotFound(format!("User {id}")))?;
            let mut user: StoredUser = serde_json::from_slice(&bytes)?;
            let removed = user.roles.remove(&role_name);
            if removed {
                user.updated_at = Utc::now();
                let json = serde_json::to_vec(&user)?;
                users.insert(id, json.as_slice())?;
            }
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    // =========================================================================
    // Roles
    // =========================================================================

    pub fn list_roles(&self) -> StoreResult<Vec<StoredRole>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ROLES)?;
        let mut roles = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            roles.push(serde_json::from_slice(value.value())?);
        }
        Ok(roles)
    }

    pub fn create_role(&self, name: &str) -> StoreResult<StoredRole> {
        let name = normalize_role_name(name);
        let write_txn = self.db.begin_write()?;
        let role = {
            let mut roles = write_txn.open_table(ROLES)?;
            if roles.get(name.as_str())?.is_some() {
                return Err(StoreError::Conflict(format!("Role {name} already exists")));
            }
            let role = StoredRole {
                name: name.clone(),
                created_at: Utc::now(),
            };
            let json = serde_json::to_vec(&role)?;
            roles.insert(name.as_str(), json.as_slice())?;
            role
        };
        write_txn.commit()?;
        Ok(role)
    }

    /// Rename a role and rewrite every user holding it.
    pub fn rename_role(&self, old_name: &str, new_name: &str) -> StoreResult<StoredRole> {
        let old_name = normalize_role_name(old_name);
        let new_name = normalize_role_name(new_name);
        let write_txn = self.db.begin_write()?;
        let role = {
            let mut roles = write_txn.open_table(ROLES)?;
            let bytes = roles
                .get(old_name.as_str())?
                .map(|v| v.value().to_vec())
                .ok_or_else(|| StoreError::NotFound(format!("Role {old_name}")))?;
            if old_name != new_name && roles.get(new_name.as_str())?.is_some() {
                return Err(StoreError::Conflict(format!(
                    "Role {new_name} already exists"
                )));
            }

            let mut role: StoredRole = serde_json::from_slice(&bytes)?;
            role.name = new_name.clone();
            let json = serde_json::to_vec(&role)?;
            roles.remove(old_name.as_str())?;
            roles.insert(new_name.as_str(), json.as_slice())?;

            let mut users = write_txn.open_table(USERS)?;
            let mut rewritten = Vec::new();
            for entry in users.iter()? {
                let (key, value) = entry?;
                let mut user: StoredUser = serde_json::from_slice(value.value())?;
                if user.roles.remove(&old_name) {
                    user.roles.insert(new_name.clone());
                    user.updated_at = Utc::now();
                    rewritten.push((key.value(), serde_json::to_vec(&user)?));
                }
            }
            for (id, json) in rewritten {
                users.insert(id, json.as_slice())?;
            }
            role
        };
        write_txn.commit()?;
        Ok(role)
    }

    /// Delete a role that no user holds.
    pub fn delete_role(&self, name: &str) -> StoreResult<()> {
        let name = normalize_role_name(name);
        let write_txn = self.db.begin_write()?;
        {
            let users = write_txn.open_table(USERS)?;
            let mut assigned = 0usize;
            for entry in users.iter()? {
                let (_, value) = entry?;
                let user: StoredUser = serde_json::from_slice(value.value())?;
                if user.roles.contains(&name) {
                    assigned += 1;
                }
            }
            if assigned > 0 {
                return Err(StoreError::Conflict(format!(
                    "Cannot delete role '{name}' because it is assigned to {assigned} user(s)"
                )));
            }

            let mut roles = write_txn.open_table(ROLES)?;
            if roles.remove(name.as_str())?.is_none() {
                return Err(StoreError::NotFound(format!("Role {name}")));
            }
        }
        write_txn.commit()?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_db() -> (UserDatabase, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = UserDatabase::open(&dir.path().join("users.redb")).unwrap();
        db.seed_roles(&["admin", "tender", "entrepreneur", "expert"])
            .unwrap();
        (db, dir)
    }

    fn new_user(email: &str, roles: &[&str]) -> NewUser {
        NewUser {
            email: email.to_string(),
            first_name: "Amina".to_string(),
            last_name: "Kaddour".to_string(),
            phone_number: None,
            password_hash: "hash-v1".to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn create_and_lookup_user() {
        let (db, _dir) = temp_db();
        let user = db
            .create_user(new_user("Amina@Example.com", &["tender"]))
            .unwrap();
        assert_eq!(user.id, 1);
        assert!(!user.is_active);

        let by_id = db.get_user(user.id).unwrap().unwrap();
        assert_eq!(by_id.email, "amina@example.com");

        let by_email = db.find_user_by_email("AMINA@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, user.id);

        let second = db.create_user(new_user("other@example.com", &[])).unwrap();
        assert_eq!(second.id, 2);
    }

    #[test]
    fn duplicate_email_conflicts() {
        let (db, _dir) = temp_db();
        db.create_user(new_user("dup@example.com", &[])).unwrap();
        let result = db.create_user(new_user("DUP@example.com", &[]));
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[test]
    fn unknown_role_on_create_is_not_found() {
        let (db, _dir) = temp_db();
        let result = db.create_user(new_user("x@example.com", &["auditor"]));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert!(db.find_user_by_email("x@example.com").unwrap().is_none());
    }

    #[test]
    fn remove_user_role_is_idempotent() {
        let (db, _dir) = temp_db();
        let user = db
            .create_user(new_user("r@example.com", &["tender", "expert"]))
            .unwrap();

        assert!(db.remove_user_role(user.id, "expert").unwrap());
        assert!(!db.remove_user_role(user.id, "expert").unwrap());

        let reloaded = db.get_user(user.id).unwrap().unwrap();
        assert_eq!(reloaded.role_names(), vec!["tender".to_string()]);
    }

    #[test]
    fn add_user_role_rejects_duplicates_and_unknown_roles() {
        let (db, _dir) = temp_db();
        let user = db.create_user(new_user("a@example.com", &["tender"])).unwrap();

        assert!(matches!(
            db.add_user_role(user.id, "tender"),
            Err(StoreError::Conflict(_))
        ));
        assert!(matches!(
            db.add_user_role(user.id, "ghost"),
            Err(StoreError::NotFound(_))
        ));

        let updated = db.add_user_role(user.id, "Expert").unwrap();
        assert!(updated.roles.contains("expert"));
    }

    #[test]
    fn update_email_keeps_index_consistent() {
        let (db, _dir) = temp_db();
        let a = db.create_user(new_user("a@example.com", &[])).unwrap();
        db.create_user(new_user("b@example.com", &[])).unwrap();

        assert!(matches!(
            db.update_email(a.id, "b@example.com"),
            Err(StoreError::Conflict(_))
        ));

        db.update_email(a.id, "new@example.com").unwrap();
        assert!(db.find_user_by_email("a@example.com").unwrap().is_none());
        assert_eq!(
            db.find_user_by_email("new@example.com").unwrap().unwrap().id,
            a.id
        );
    }

    #[test]
    fn wallet_can_only_be_set_once() {
        let (db, _dir) = temp_db();
        let user = db.create_user(new_user("w@example.com", &[])).unwrap();
        let address = "0x1111111111111111111111111111111111111111";

        db.set_wallet_address(user.id, address).unwrap();
        assert!(matches!(
            db.set_wallet_address(user.id, address),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn delete_role_in_use_conflicts() {
        let (db, _dir) = temp_db();
        let user = db.create_user(new_user("d@example.com", &["expert"])).unwrap();

        assert!(matches!(
            db.delete_role("expert"),
            Err(StoreError::Conflict(_))
        ));

        db.remove_user_role(user.id, "expert").unwrap();
        db.delete_role("expert").unwrap();
        assert!(!db.list_roles().unwrap().iter().any(|r| r.name == "expert"));
        assert!(matches!(
            db.delete_role("expert"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn rename_role_rewrites_user_records() {
        let (db, _dir) = temp_db();
        let user = db.create_user(new_user("n@example.com", &["expert"])).unwrap();

        db.rename_role("expert", "reviewer").unwrap();

        let reloaded = db.get_user(user.id).unwrap().unwrap();
        assert!(reloaded.roles.contains("reviewer"));
        assert!(!reloaded.roles.contains("expert"));
        assert!(matches!(
            db.rename_role("reviewer", "tender"),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn search_users_paginates() {
        let (db, _dir) = temp_db();
        for i in 0..5 {
            db.create_user(new_user(&format!("user{i}@example.com"), &[]))
                .unwrap();
        }
        db.create_user(new_user("someone@else.org", &[])).unwrap();

        let (page1, total) = db.search_users(Some("example"), 1, 2).unwrap();
        assert_eq!(total, 5);
        assert_eq!(page1.len(), 2);

        let (page3, _) = db.search_users(Some("example"), 3, 2).unwrap();
        assert_eq!(page3.len(), 1);

        let (all, total_all) = db.search_users(None, 1, 100).unwrap();
        assert_eq!(total_all, 6);
        assert_eq!(all.len(), 6);
    }

    #[test]
    fn delete_user_frees_email() {
        let (db, _dir) = temp_db();
        let user = db.create_user(new_user("gone@example.com", &[])).unwrap();
        db.delete_user(user.id).unwrap();

        assert!(db.get_user(user.id).unwrap().is_none());
        assert!(db.create_user(new_user("gone@example.com", &[])).is_ok());
        assert!(matches!(
            db.delete_user(user.id),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn conditional_password_write_consumes_fingerprint_once() {
        let (db, _dir) = temp_db();
        let user = db.create_user(new_user("c@example.com", &[])).unwrap();
        let issued = fingerprint(&user.password_hash);

        let activated = db
            .activate_user_if(user.id, &issued, "hash-v2".to_string())
            .unwrap();
        assert!(activated.is_active);
        assert_eq!(activated.password_hash, "hash-v2");

        let again = db.set_password_hash_if(user.id, &issued, "hash-v3".to_string());
        assert!(matches!(again, Err(StoreError::StaleCredential(id)) if id == user.id));
        assert_eq!(
            db.get_user(user.id).unwrap().unwrap().password_hash,
            "hash-v2"
        );
    }
}
