//! Account operations

use chrono::Utc;
use sqlx::Row;

use crate::error::DbError;
use crate::models::{Account, AccountPatch, NewAccount};
use crate::repository::Database;
use crate::utils::format_datetime;

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, is_active, is_admin, created_at, last_login";

impl Database {
    // ==================== Account Operations ====================

    /// Insert a new account
    ///
    /// The unique index on `email` decides concurrent inserts; the loser
    /// gets `DbError::Duplicate`.
    pub async fn insert_account(&self, account: NewAccount) -> Result<Account, DbError> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO accounts (email, password_hash, is_active, is_admin, created_at, last_login)
            VALUES (?, ?, ?, ?, ?, NULL)
            RETURNING id
            "#,
        )
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.is_active)
        .bind(account.is_admin)
        .bind(format_datetime(&now))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::on_insert(e, format!("Account '{}' already exists", account.email)))?;

        let id: i64 = result.get("id");

        Ok(Account {
            id,
            email: account.email,
            password_hash: account.password_hash,
            is_active: account.is_active,
            is_admin: account.is_admin,
            created_at: now,
            last_login: None,
        })
    }

    /// Find an account by email (exact, case-sensitive match)
    pub async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, DbError> {
        let sql = format!("SELECT {} FROM accounts WHERE email = ?", ACCOUNT_COLUMNS);
        let result = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        result.map(|row| Account::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// Get an account by ID
    pub async fn load_account_by_id(&self, id: i64) -> Result<Option<Account>, DbError> {
        let sql = format!("SELECT {} FROM accounts WHERE id = ?", ACCOUNT_COLUMNS);
        let result = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        result.map(|row| Account::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// Apply a partial update to an account
    ///
    /// Returns `false` when no account has the given ID.
    pub async fn update_account_fields(
        &self,
        id: i64,
        patch: AccountPatch,
    ) -> Result<bool, DbError> {
        if patch.is_empty() {
            return Ok(self.load_account_by_id(id).await?.is_some());
        }

        // Build dynamic update query
        let mut updates = Vec::new();
        if patch.email.is_some() {
            updates.push("email = ?");
        }
        if patch.password_hash.is_some() {
            updates.push("password_hash = ?");
        }
        if patch.is_active.is_some() {
            updates.push("is_active = ?");
        }
        if patch.is_admin.is_some() {
            updates.push("is_admin = ?");
        }
        if patch.last_login.is_some() {
            updates.push("last_login = ?");
        }

        let sql = format!("UPDATE accounts SET {} WHERE id = ?", updates.join(", "));
        let mut query = sqlx::query(&sql);

        // Bind in the same order as updates
        if let Some(email) = &patch.email {
            query = query.bind(email);
        }
        if let Some(hash) = &patch.password_hash {
            query = query.bind(hash);
        }
        if let Some(active) = patch.is_active {
            query = query.bind(active);
        }
        if let Some(admin) = patch.is_admin {
            query = query.bind(admin);
        }
        if let Some(at) = &patch.last_login {
            query = query.bind(format_datetime(at));
        }

        let result = query
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::on_insert(e, format!("Account email already in use (id {})", id)))?;
        Ok(result.rows_affected() > 0)
    }
}
