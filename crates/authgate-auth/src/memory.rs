//! In-memory account and revocation store
//!
//! Used by tests and by deployments that need no persistence. Uniqueness of
//! emails and revoked tokens is enforced under a single write lock, the same
//! way a unique index does for the database store.

use async_trait::async_trait;
use authgate_db::{Account, AccountPatch, NewAccount, RevokedToken};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::store::{AccountStore, RevocationStore, StoreError};

#[derive(Default)]
struct Tables {
    accounts: HashMap<i64, Account>,
    next_account_id: i64,
    revocations: HashMap<String, RevokedToken>,
    next_revocation_id: i64,
}

/// In-memory implementation of both store seams
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with `StoreError::Unavailable` while set
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn account_count(&self) -> usize {
        self.tables.read().accounts.len()
    }

    pub fn revocation_count(&self) -> usize {
        self.tables.read().revocations.len()
    }

    /// Drop revocation entries whose token has expired
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut tables = self.tables.write();
        let before = tables.revocations.len();
        tables.revocations.retain(|_, entry| entry.expires_at > now);
        before - tables.revocations.len()
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        self.check_online()?;
        Ok(self
            .tables
            .read()
            .accounts
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn load_account_by_id(&self, id: i64) -> Result<Option<Account>, StoreError> {
        self.check_online()?;
        Ok(self.tables.read().accounts.get(&id).cloned())
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        self.check_online()?;
        let mut tables = self.tables.write();

        if tables.accounts.values().any(|a| a.email == account.email) {
            return Err(StoreError::Duplicate(format!(
                "Account '{}' already exists",
                account.email
            )));
        }

        tables.next_account_id += 1;
        let created = Account {
            id: tables.next_account_id,
            email: account.email,
            password_hash: account.password_hash,
            is_active: account.is_active,
            is_admin: account.is_admin,
            created_at: Utc::now(),
            last_login: None,
        };
        tables.accounts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_account_fields(
        &self,
        id: i64,
        patch: AccountPatch,
    ) -> Result<bool, StoreError> {
        self.check_online()?;
        let mut tables = self.tables.write();

        if let Some(email) = &patch.email
            && tables.accounts.values().any(|a| a.id != id && &a.email == email)
        {
            return Err(StoreError::Duplicate(format!(
                "Account email already in use (id {})",
                id
            )));
        }

        match tables.accounts.get_mut(&id) {
            Some(account) => {
                patch.apply(account);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl RevocationStore for MemoryStore {
    async fn add(
        &self,
        token: &str,
        account_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.check_online()?;
        let mut tables = self.tables.write();

        if tables.revocations.contains_key(token) {
            return Err(StoreError::Duplicate("Token already revoked".to_string()));
        }

        tables.next_revocation_id += 1;
        let entry = RevokedToken {
            id: tables.next_revocation_id,
            token: token.to_string(),
            account_id,
            expires_at,
            revoked_at: Utc::now(),
        };
        tables.revocations.insert(entry.token.clone(), entry);
        Ok(())
    }

    async fn contains(&self, token: &str) -> Result<bool, StoreError> {
        self.check_online()?;
        Ok(self.tables.read().revocations.contains_key(token))
    }
}
