//! Persistence seams used by the session authority

use async_trait::async_trait;
use authgate_db::{Account, AccountPatch, Database, DbError, NewAccount, NewRevokedToken};
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Duplicate(msg) => StoreError::Duplicate(msg),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// Account persistence
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Find an account by exact email
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Load an account by ID
    async fn load_account_by_id(&self, id: i64) -> Result<Option<Account>, StoreError>;

    /// Insert an account; a taken email fails with `StoreError::Duplicate`
    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// Apply a partial update, returning whether the account exists
    async fn update_account_fields(&self, id: i64, patch: AccountPatch)
    -> Result<bool, StoreError>;
}

/// Revoked token persistence
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Record a revoked token; a repeat fails with `StoreError::Duplicate`
    async fn add(
        &self,
        token: &str,
        account_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Whether the token has been revoked
    async fn contains(&self, token: &str) -> Result<bool, StoreError>;
}

#[async_trait]
impl AccountStore for Database {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(Database::find_account_by_email(self, email).await?)
    }

    async fn load_account_by_id(&self, id: i64) -> Result<Option<Account>, StoreError> {
        Ok(Database::load_account_by_id(self, id).await?)
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        Ok(Database::insert_account(self, account).await?)
    }

    async fn update_account_fields(
        &self,
        id: i64,
        patch: AccountPatch,
    ) -> Result<bool, StoreError> {
        Ok(Database::update_account_fields(self, id, patch).await?)
    }
}

#[async_trait]
impl RevocationStore for Database {
    async fn add(
        &self,
        token: &str,
        account_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.insert_revocation_entry(NewRevokedToken {
            token: token.to_string(),
            account_id,
            expires_at,
        })
        .await?;
        Ok(())
    }

    async fn contains(&self, token: &str) -> Result<bool, StoreError> {
        Ok(self.lookup_revocation_entry(token).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_database_revocation_store() {
        let db = Database::in_memory().await.unwrap();
        let account = AccountStore::insert_account(
            &db,
            NewAccount {
                email: "store@example.com".to_string(),
                password_hash: "hash".to_string(),
                is_active: true,
                is_admin: false,
            },
        )
        .await
        .unwrap();

        let store: &dyn RevocationStore = &db;
        let expires_at = Utc::now() + Duration::minutes(30);

        assert!(!store.contains("tok").await.unwrap());
        store.add("tok", account.id, expires_at).await.unwrap();
        assert!(store.contains("tok").await.unwrap());

        let err = store.add("tok", account.id, expires_at).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_database_account_store_duplicate() {
        let db = Database::in_memory().await.unwrap();
        let store: &dyn AccountStore = &db;
        let new = || NewAccount {
            email: "dup@example.com".to_string(),
            password_hash: "hash".to_string(),
            is_active: true,
            is_admin: false,
        };

        store.insert_account(new()).await.unwrap();
        let err = store.insert_account(new()).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[test]
    fn test_db_error_conversion() {
        assert!(matches!(
            StoreError::from(DbError::Duplicate("x".into())),
            StoreError::Duplicate(_)
        ));
        assert!(matches!(
            StoreError::from(DbError::Migration("x".into())),
            StoreError::Unavailable(_)
        ));
    }
}
